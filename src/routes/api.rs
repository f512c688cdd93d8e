// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API routes for authenticated users.

use crate::db::Store;
use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{
    Activity, ActivityRange, Classification, GoalPair, GoalStatus, NewActivity,
    QuestionnaireAnswers,
};
use crate::routes::validated;
use crate::time_utils::{format_utc_rfc3339, parse_timestamp};
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    routing::get,
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use uuid::Uuid;
use validator::Validate;

const DEFAULT_LIMIT: u32 = 50;
const MAX_LIMIT: u32 = 100;

/// API routes (require authentication via JWT).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/activities", get(get_activities).post(create_activity))
        .route("/api/questionnaire", axum::routing::post(submit_questionnaire))
        .route("/api/goal", get(get_goal))
        .route("/api/goal/type", get(get_goal_type))
        .route("/api/goal/pair", get(get_goal_pair))
}

// ─── Response Types ──────────────────────────────────────────

/// Current goal. Both fields are `-1` before the questionnaire.
#[derive(Serialize, Clone, Copy, Debug)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct GoalResponse {
    pub goal_dist: f64,
    pub goal_pace: i64,
}

impl From<GoalStatus> for GoalResponse {
    fn from(status: GoalStatus) -> Self {
        Self {
            goal_dist: status.goal_dist,
            goal_pace: status.goal_pace,
        }
    }
}

#[derive(Serialize, Clone, Debug)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ClassificationResponse {
    pub user_type: String,
    pub weight: Option<f64>,
    pub freq: Option<f64>,
}

impl From<Classification> for ClassificationResponse {
    fn from(c: Classification) -> Self {
        Self {
            user_type: c.user_type.to_string(),
            weight: c.weight,
            freq: c.freq,
        }
    }
}

#[derive(Serialize, Clone, Debug)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ActivitySummary {
    pub id: Uuid,
    pub start_time: String,
    pub duration_seconds: u32,
    pub distance_km: f64,
    pub average_pace_seconds_per_km: u32,
    pub split_paces: Vec<u32>,
    /// Goal the run was attempting, if the user was onboarded
    pub goal: Option<GoalResponse>,
}

impl From<Activity> for ActivitySummary {
    fn from(a: Activity) -> Self {
        Self {
            id: a.id,
            start_time: format_utc_rfc3339(a.start_time),
            duration_seconds: a.duration_seconds,
            distance_km: a.distance_km,
            average_pace_seconds_per_km: a.average_pace_seconds_per_km,
            split_paces: a.split_paces,
            goal: a.goal_snapshot.map(|s| GoalResponse {
                goal_dist: s.distance_km,
                goal_pace: s.pace_sec_per_km.into(),
            }),
        }
    }
}

// ─── Activities ──────────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
pub struct CreateActivityRequest {
    /// RFC3339, or naive ISO-8601 taken as UTC
    #[serde(default)]
    #[validate(length(min = 1, message = "start_time is required"))]
    pub start_time: String,
    #[validate(range(min = 0, max = 604800))]
    pub duration_seconds: i64,
    #[validate(range(min = 0.0, max = 1000.0))]
    pub distance_km: f64,
    #[validate(range(min = 0, max = 86400))]
    pub average_pace_seconds_per_km: i64,
    #[serde(default)]
    pub split_paces: Vec<u32>,
    #[validate(range(min = -90.0, max = 90.0))]
    pub start_latitude: Option<f64>,
    #[validate(range(min = -180.0, max = 180.0))]
    pub start_longitude: Option<f64>,
    #[validate(range(min = -90.0, max = 90.0))]
    pub end_latitude: Option<f64>,
    #[validate(range(min = -180.0, max = 180.0))]
    pub end_longitude: Option<f64>,
}

impl TryFrom<CreateActivityRequest> for NewActivity {
    type Error = AppError;

    fn try_from(req: CreateActivityRequest) -> Result<Self> {
        let start_time = parse_timestamp(&req.start_time).ok_or_else(|| {
            AppError::BadRequest(format!("Invalid start_time: {:?}", req.start_time))
        })?;
        // Ranges were checked by validation, so these conversions hold.
        let duration_seconds = u32::try_from(req.duration_seconds)
            .map_err(|_| AppError::BadRequest("Invalid duration_seconds".to_string()))?;
        let average_pace_seconds_per_km = u32::try_from(req.average_pace_seconds_per_km)
            .map_err(|_| AppError::BadRequest("Invalid average_pace_seconds_per_km".to_string()))?;

        Ok(NewActivity {
            start_time,
            duration_seconds,
            distance_km: req.distance_km,
            average_pace_seconds_per_km,
            split_paces: req.split_paces,
            start_latitude: req.start_latitude,
            start_longitude: req.start_longitude,
            end_latitude: req.end_latitude,
            end_longitude: req.end_longitude,
        })
    }
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct CreateActivityResponse {
    pub activity: ActivitySummary,
    /// Current goal after this run
    pub goal: GoalResponse,
    pub goal_updated: bool,
}

/// Log a run.
async fn create_activity(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    payload: std::result::Result<Json<CreateActivityRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CreateActivityResponse>)> {
    let new_activity = NewActivity::try_from(validated(payload)?)?;

    tracing::debug!(
        user_id = %user.user_id,
        distance_km = new_activity.distance_km,
        pace = new_activity.average_pace_seconds_per_km,
        "Logging activity"
    );

    let logged = state.goals.on_activity_logged(user.user_id, new_activity).await?;
    let goal = logged
        .goal_pair
        .as_ref()
        .map_or(GoalStatus::NOT_ONBOARDED, GoalPair::status);

    Ok((
        StatusCode::CREATED,
        Json(CreateActivityResponse {
            activity: logged.activity.into(),
            goal: goal.into(),
            goal_updated: logged.goal_updated,
        }),
    ))
}

#[derive(Debug, Deserialize)]
pub struct ActivitiesQuery {
    /// Inclusive lower bound on start time
    pub after: Option<String>,
    /// Exclusive upper bound on start time
    pub before: Option<String>,
    pub limit: Option<u32>,
}

fn parse_bound(name: &str, raw: Option<&str>) -> Result<Option<DateTime<Utc>>> {
    raw.map(|value| {
        parse_timestamp(value)
            .ok_or_else(|| AppError::BadRequest(format!("Invalid '{}' timestamp", name)))
    })
    .transpose()
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ActivitiesResponse {
    pub activities: Vec<ActivitySummary>,
    pub limit: u32,
}

/// List the user's activities, newest first.
async fn get_activities(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<ActivitiesQuery>,
) -> Result<Json<ActivitiesResponse>> {
    tracing::debug!(
        user_id = %user.user_id,
        after = ?params.after,
        before = ?params.before,
        limit = ?params.limit,
        "Fetching activities"
    );

    let limit = params.limit.unwrap_or(DEFAULT_LIMIT);
    if limit == 0 {
        return Err(AppError::BadRequest(
            "limit must be greater than 0".to_string(),
        ));
    }
    let limit = limit.min(MAX_LIMIT);

    let range = ActivityRange {
        after: parse_bound("after", params.after.as_deref())?,
        before: parse_bound("before", params.before.as_deref())?,
    };

    let activities = state
        .db
        .get_activities_for_user(user.user_id, range, limit)
        .await?;

    Ok(Json(ActivitiesResponse {
        activities: activities.into_iter().map(ActivitySummary::from).collect(),
        limit,
    }))
}

// ─── Questionnaire & Goals ───────────────────────────────────

/// Complete (or redo) the onboarding questionnaire.
async fn submit_questionnaire(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    payload: std::result::Result<Json<QuestionnaireAnswers>, JsonRejection>,
) -> Result<(StatusCode, Json<GoalPair>)> {
    let Json(answers) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let goal_pair = state
        .goals
        .on_questionnaire_complete(user.user_id, &answers)
        .await?;
    Ok((StatusCode::CREATED, Json(goal_pair)))
}

async fn get_goal(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<GoalResponse>> {
    let status = state.goals.get_current_goal(user.user_id).await?;
    Ok(Json(status.into()))
}

async fn get_goal_type(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<ClassificationResponse>> {
    let classification = state.goals.get_classification(user.user_id).await?;
    Ok(Json(classification.into()))
}

async fn get_goal_pair(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<GoalPair>> {
    Ok(Json(state.goals.get_goal_pair(user.user_id).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(start_time: &str) -> CreateActivityRequest {
        CreateActivityRequest {
            start_time: start_time.to_string(),
            duration_seconds: 1800,
            distance_km: 5.0,
            average_pace_seconds_per_km: 360,
            split_paces: vec![],
            start_latitude: Some(37.4),
            start_longitude: Some(-122.1),
            end_latitude: None,
            end_longitude: None,
        }
    }

    #[test]
    fn test_naive_start_time_is_utc() {
        let activity = NewActivity::try_from(request("2026-03-01T07:30:00")).unwrap();
        assert_eq!(format_utc_rfc3339(activity.start_time), "2026-03-01T07:30:00Z");
    }

    #[test]
    fn test_unparseable_start_time_rejected() {
        assert!(matches!(
            NewActivity::try_from(request("yesterday")),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn test_negative_fields_fail_validation() {
        let mut req = request("2026-03-01T07:30:00Z");
        req.distance_km = -1.0;
        assert!(req.validate().is_err());

        let mut req = request("2026-03-01T07:30:00Z");
        req.average_pace_seconds_per_km = -5;
        assert!(req.validate().is_err());

        let mut req = request("2026-03-01T07:30:00Z");
        req.start_latitude = Some(123.0);
        assert!(req.validate().is_err());
    }
}
