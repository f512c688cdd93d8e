// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Running activity model for storage and API.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::goal::GoalSnapshot;

/// Stored activity record. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    /// Activity ID (also used as document ID)
    pub id: Uuid,
    /// Owner
    pub user_id: Uuid,
    /// When the run started
    #[serde(with = "crate::time_utils::rfc3339_utc")]
    pub start_time: DateTime<Utc>,
    /// Elapsed time in seconds
    pub duration_seconds: u32,
    /// Distance in kilometers
    pub distance_km: f64,
    /// Average pace in seconds per kilometer
    pub average_pace_seconds_per_km: u32,
    /// Per-kilometer split paces (s/km)
    #[serde(default)]
    pub split_paces: Vec<u32>,
    pub start_latitude: Option<f64>,
    pub start_longitude: Option<f64>,
    pub end_latitude: Option<f64>,
    pub end_longitude: Option<f64>,
    /// Goal the run was attempting when it was logged
    pub goal_snapshot: Option<GoalSnapshot>,
    /// When this activity was stored
    #[serde(with = "crate::time_utils::rfc3339_utc")]
    pub created_at: DateTime<Utc>,
}

impl Activity {
    /// Whether this activity carries a real run.
    ///
    /// Manually logged rest days have zero distance or pace and must not
    /// move the goal.
    pub fn qualifies_for_ratchet(&self) -> bool {
        self.distance_km > 0.0 && self.average_pace_seconds_per_km > 0
    }
}

/// A validated run submitted by a user, before it gets an ID.
#[derive(Debug, Clone, PartialEq)]
pub struct NewActivity {
    pub start_time: DateTime<Utc>,
    pub duration_seconds: u32,
    pub distance_km: f64,
    pub average_pace_seconds_per_km: u32,
    pub split_paces: Vec<u32>,
    pub start_latitude: Option<f64>,
    pub start_longitude: Option<f64>,
    pub end_latitude: Option<f64>,
    pub end_longitude: Option<f64>,
}

impl NewActivity {
    /// Assign an ID and owner. Start time is truncated to whole seconds,
    /// which is the precision activities are stored with.
    pub fn into_activity(
        self,
        user_id: Uuid,
        goal_snapshot: Option<GoalSnapshot>,
        now: DateTime<Utc>,
    ) -> Activity {
        Activity {
            id: Uuid::new_v4(),
            user_id,
            start_time: self.start_time.trunc_subsecs(0),
            duration_seconds: self.duration_seconds,
            distance_km: self.distance_km,
            average_pace_seconds_per_km: self.average_pace_seconds_per_km,
            split_paces: self.split_paces,
            start_latitude: self.start_latitude,
            start_longitude: self.start_longitude,
            end_latitude: self.end_latitude,
            end_longitude: self.end_longitude,
            goal_snapshot,
            created_at: now.trunc_subsecs(0),
        }
    }
}

/// Date range for activity listing. `after` is inclusive, `before` exclusive.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ActivityRange {
    pub after: Option<DateTime<Utc>>,
    pub before: Option<DateTime<Utc>>,
}

impl ActivityRange {
    pub fn contains(&self, time: DateTime<Utc>) -> bool {
        self.after.is_none_or(|after| time >= after) && self.before.is_none_or(|before| time < before)
    }
}
