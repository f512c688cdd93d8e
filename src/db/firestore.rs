// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users (accounts and password hashes)
//! - Activities (logged runs)
//! - Goals (one goal pair per user)

use async_trait::async_trait;
use firestore::FirestoreQueryDirection;
use uuid::Uuid;

use crate::db::{collections, Store};
use crate::error::AppError;
use crate::models::{Activity, ActivityRange, GoalPair, User};
use crate::time_utils::format_utc_rfc3339;

/// Activities read per page when collecting recent runs.
const RUN_PAGE_SIZE: u32 = 25;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: firestore::FirestoreDb,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // The emulator takes no credentials; skip the ADC lookup entirely.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self { client })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self { client })
    }

    /// One page of a user's activities, newest first.
    async fn activity_page(
        &self,
        user_id: Uuid,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Activity>, AppError> {
        let user_key = user_id.to_string();
        self.client
            .fluent()
            .select()
            .from(collections::ACTIVITIES)
            .filter(move |q| q.field("user_id").eq(user_key.clone()))
            .order_by([("start_time", FirestoreQueryDirection::Descending)])
            .limit(limit)
            .offset(offset)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find the first user whose `field` equals `value`.
    async fn find_user_by(&self, field: &'static str, value: &str) -> Result<Option<User>, AppError> {
        let value = value.to_string();
        let users: Vec<User> = self
            .client
            .fluent()
            .select()
            .from(collections::USERS)
            .filter(move |q| q.field(field).eq(value.clone()))
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(users.into_iter().next())
    }
}

#[async_trait]
impl Store for FirestoreDb {
    // ─── User Operations ─────────────────────────────────────────

    async fn get_user(&self, user_id: Uuid) -> Result<Option<User>, AppError> {
        self.client
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(&user_id.to_string())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        self.find_user_by("username", username).await
    }

    async fn get_user_by_third_party_id(
        &self,
        third_party_id: &str,
    ) -> Result<Option<User>, AppError> {
        self.find_user_by("third_party_id", third_party_id).await
    }

    async fn create_user(&self, user: &User) -> Result<(), AppError> {
        // Uniqueness is checked before the write. Two registrations racing
        // on the same name across instances can both pass.
        if self.get_user_by_username(&user.username).await?.is_some() {
            return Err(AppError::Conflict("Username already taken".to_string()));
        }
        if let Some(third_party_id) = &user.third_party_id {
            if self.get_user_by_third_party_id(third_party_id).await?.is_some() {
                return Err(AppError::Conflict(
                    "Third-party account already linked".to_string(),
                ));
            }
        }

        let _: User = self
            .client
            .fluent()
            .insert()
            .into(collections::USERS)
            .document_id(user.user_id.to_string())
            .object(user)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    // ─── Activity Operations ─────────────────────────────────────

    async fn get_activities_for_user(
        &self,
        user_id: Uuid,
        range: ActivityRange,
        limit: u32,
    ) -> Result<Vec<Activity>, AppError> {
        let user_key = user_id.to_string();
        // Stored timestamps are fixed-width UTC strings, so string
        // comparison matches time order.
        let after = range.after.map(format_utc_rfc3339);
        let before = range.before.map(format_utc_rfc3339);

        self.client
            .fluent()
            .select()
            .from(collections::ACTIVITIES)
            .filter(move |q| {
                q.for_all([
                    q.field("user_id").eq(user_key.clone()),
                    after
                        .clone()
                        .and_then(|a| q.field("start_time").greater_than_or_equal(a)),
                    before.clone().and_then(|b| q.field("start_time").less_than(b)),
                ])
            })
            .order_by([("start_time", FirestoreQueryDirection::Descending)])
            .limit(limit)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn fetch_recent_runs(&self, user_id: Uuid, limit: u32) -> Result<Vec<Activity>, AppError> {
        // Rest days can't be excluded in the query without a second
        // inequality filter, so page through history newest first.
        let page_size = limit.max(RUN_PAGE_SIZE);
        let mut runs = Vec::with_capacity(limit as usize);
        let mut offset = 0;

        while runs.len() < limit as usize {
            let page = self.activity_page(user_id, page_size, offset).await?;
            let exhausted = (page.len() as u32) < page_size;
            runs.extend(page.into_iter().filter(Activity::qualifies_for_ratchet));
            if exhausted {
                break;
            }
            offset += page_size;
        }

        runs.truncate(limit as usize);
        Ok(runs)
    }

    // ─── Goal Operations ─────────────────────────────────────────

    async fn fetch_goal_pair(&self, user_id: Uuid) -> Result<Option<GoalPair>, AppError> {
        self.client
            .fluent()
            .select()
            .by_id_in(collections::GOALS)
            .obj()
            .one(&user_id.to_string())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn replace_goal_pair(&self, goal_pair: &GoalPair) -> Result<(), AppError> {
        // update() without a field mask writes the whole document.
        let _: () = self
            .client
            .fluent()
            .update()
            .in_col(collections::GOALS)
            .document_id(goal_pair.user_id.to_string())
            .object(goal_pair)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    // ─── Atomic Activity Recording ───────────────────────────────

    async fn record_activity(
        &self,
        activity: &Activity,
        goal_pair: Option<&GoalPair>,
    ) -> Result<(), AppError> {
        let mut transaction = self
            .client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        self.client
            .fluent()
            .update()
            .in_col(collections::ACTIVITIES)
            .document_id(activity.id.to_string())
            .object(activity)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add activity to transaction: {}", e))
            })?;

        if let Some(goal_pair) = goal_pair {
            self.client
                .fluent()
                .update()
                .in_col(collections::GOALS)
                .document_id(goal_pair.user_id.to_string())
                .object(goal_pair)
                .add_to_transaction(&mut transaction)
                .map_err(|e| {
                    AppError::Database(format!("Failed to add goal to transaction: {}", e))
                })?;
        }

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Transaction commit failed: {}", e)))?;

        tracing::info!(
            user_id = %activity.user_id,
            activity_id = %activity.id,
            goal_updated = goal_pair.is_some(),
            "Activity recorded atomically"
        );

        Ok(())
    }
}
