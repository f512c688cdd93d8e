// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer.
//!
//! [`Store`] is the boundary the services talk to. [`Database`] picks a
//! backend at startup: Firestore in production, process-local maps for
//! tests and quick local runs.

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryDb;

use async_trait::async_trait;
use uuid::Uuid;

use crate::config::{Config, StorageBackend};
use crate::error::AppError;
use crate::models::{Activity, ActivityRange, GoalPair, User};

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    pub const ACTIVITIES: &str = "activities";
    /// Goal pairs (keyed by user_id)
    pub const GOALS: &str = "goals";
}

/// Storage operations used by the services.
#[async_trait]
pub trait Store: Send + Sync {
    async fn get_user(&self, user_id: Uuid) -> Result<Option<User>, AppError>;

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, AppError>;

    async fn get_user_by_third_party_id(
        &self,
        third_party_id: &str,
    ) -> Result<Option<User>, AppError>;

    /// Create a user. Fails with `Conflict` if the username or third-party
    /// ID is already taken.
    async fn create_user(&self, user: &User) -> Result<(), AppError>;

    /// Activities for a user in `range`, newest first by start time.
    async fn get_activities_for_user(
        &self,
        user_id: Uuid,
        range: ActivityRange,
        limit: u32,
    ) -> Result<Vec<Activity>, AppError>;

    /// The `limit` most recent activities, newest first.
    async fn fetch_recent_activities(
        &self,
        user_id: Uuid,
        limit: u32,
    ) -> Result<Vec<Activity>, AppError> {
        self.get_activities_for_user(user_id, ActivityRange::default(), limit)
            .await
    }

    /// The `limit` most recent runs that count toward the ratchet window,
    /// newest first. Rest days are skipped, so older runs fill their place.
    async fn fetch_recent_runs(&self, user_id: Uuid, limit: u32) -> Result<Vec<Activity>, AppError>;

    async fn fetch_goal_pair(&self, user_id: Uuid) -> Result<Option<GoalPair>, AppError>;

    /// Store a goal pair, discarding whatever record the user had before.
    async fn replace_goal_pair(&self, goal_pair: &GoalPair) -> Result<(), AppError>;

    /// Atomically store a new activity together with the user's updated
    /// goal pair, if any. Either both writes land or neither does.
    async fn record_activity(
        &self,
        activity: &Activity,
        goal_pair: Option<&GoalPair>,
    ) -> Result<(), AppError>;
}

/// Backend selected at startup.
#[derive(Clone)]
pub enum Database {
    Firestore(FirestoreDb),
    Memory(MemoryDb),
}

impl Database {
    /// Connect to the backend named in the config.
    pub async fn connect(config: &Config) -> Result<Self, AppError> {
        match config.storage {
            StorageBackend::Firestore => Ok(Database::Firestore(
                FirestoreDb::new(&config.gcp_project_id).await?,
            )),
            StorageBackend::Memory => {
                tracing::warn!("Using in-memory storage; data is lost on restart");
                Ok(Database::Memory(MemoryDb::new()))
            }
        }
    }

    pub fn backend_info(&self) -> &'static str {
        match self {
            Database::Firestore(_) => "firestore",
            Database::Memory(_) => "memory",
        }
    }
}

#[async_trait]
impl Store for Database {
    async fn get_user(&self, user_id: Uuid) -> Result<Option<User>, AppError> {
        match self {
            Database::Firestore(db) => db.get_user(user_id).await,
            Database::Memory(db) => db.get_user(user_id).await,
        }
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        match self {
            Database::Firestore(db) => db.get_user_by_username(username).await,
            Database::Memory(db) => db.get_user_by_username(username).await,
        }
    }

    async fn get_user_by_third_party_id(
        &self,
        third_party_id: &str,
    ) -> Result<Option<User>, AppError> {
        match self {
            Database::Firestore(db) => db.get_user_by_third_party_id(third_party_id).await,
            Database::Memory(db) => db.get_user_by_third_party_id(third_party_id).await,
        }
    }

    async fn create_user(&self, user: &User) -> Result<(), AppError> {
        match self {
            Database::Firestore(db) => db.create_user(user).await,
            Database::Memory(db) => db.create_user(user).await,
        }
    }

    async fn get_activities_for_user(
        &self,
        user_id: Uuid,
        range: ActivityRange,
        limit: u32,
    ) -> Result<Vec<Activity>, AppError> {
        match self {
            Database::Firestore(db) => db.get_activities_for_user(user_id, range, limit).await,
            Database::Memory(db) => db.get_activities_for_user(user_id, range, limit).await,
        }
    }

    async fn fetch_recent_runs(&self, user_id: Uuid, limit: u32) -> Result<Vec<Activity>, AppError> {
        match self {
            Database::Firestore(db) => db.fetch_recent_runs(user_id, limit).await,
            Database::Memory(db) => db.fetch_recent_runs(user_id, limit).await,
        }
    }

    async fn fetch_goal_pair(&self, user_id: Uuid) -> Result<Option<GoalPair>, AppError> {
        match self {
            Database::Firestore(db) => db.fetch_goal_pair(user_id).await,
            Database::Memory(db) => db.fetch_goal_pair(user_id).await,
        }
    }

    async fn replace_goal_pair(&self, goal_pair: &GoalPair) -> Result<(), AppError> {
        match self {
            Database::Firestore(db) => db.replace_goal_pair(goal_pair).await,
            Database::Memory(db) => db.replace_goal_pair(goal_pair).await,
        }
    }

    async fn record_activity(
        &self,
        activity: &Activity,
        goal_pair: Option<&GoalPair>,
    ) -> Result<(), AppError> {
        match self {
            Database::Firestore(db) => db.record_activity(activity, goal_pair).await,
            Database::Memory(db) => db.record_activity(activity, goal_pair).await,
        }
    }
}
