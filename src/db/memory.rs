// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Process-local storage backend.
//!
//! Each user's activities and goal pair live in one map entry, so
//! [`Store::record_activity`] updates both under a single shard lock.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use dashmap::DashMap;
use uuid::Uuid;

use crate::db::Store;
use crate::error::AppError;
use crate::models::{Activity, ActivityRange, GoalPair, User};

#[derive(Default)]
struct Accounts {
    by_id: HashMap<Uuid, User>,
    by_username: HashMap<String, Uuid>,
    by_third_party_id: HashMap<String, Uuid>,
}

#[derive(Default)]
struct UserData {
    activities: Vec<Activity>,
    goal_pair: Option<GoalPair>,
}

#[derive(Default)]
struct Inner {
    accounts: Mutex<Accounts>,
    data: DashMap<Uuid, UserData>,
}

/// In-memory database. Clones share the same data.
#[derive(Clone, Default)]
pub struct MemoryDb {
    inner: Arc<Inner>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    fn accounts(&self) -> Result<std::sync::MutexGuard<'_, Accounts>, AppError> {
        self.inner
            .accounts
            .lock()
            .map_err(|_| AppError::Database("account table lock poisoned".to_string()))
    }
}

#[async_trait]
impl Store for MemoryDb {
    async fn get_user(&self, user_id: Uuid) -> Result<Option<User>, AppError> {
        Ok(self.accounts()?.by_id.get(&user_id).cloned())
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let accounts = self.accounts()?;
        Ok(accounts
            .by_username
            .get(username)
            .and_then(|id| accounts.by_id.get(id))
            .cloned())
    }

    async fn get_user_by_third_party_id(
        &self,
        third_party_id: &str,
    ) -> Result<Option<User>, AppError> {
        let accounts = self.accounts()?;
        Ok(accounts
            .by_third_party_id
            .get(third_party_id)
            .and_then(|id| accounts.by_id.get(id))
            .cloned())
    }

    async fn create_user(&self, user: &User) -> Result<(), AppError> {
        let mut accounts = self.accounts()?;
        if accounts.by_username.contains_key(&user.username) {
            return Err(AppError::Conflict("Username already taken".to_string()));
        }
        if let Some(third_party_id) = &user.third_party_id {
            if accounts.by_third_party_id.contains_key(third_party_id) {
                return Err(AppError::Conflict(
                    "Third-party account already linked".to_string(),
                ));
            }
            accounts
                .by_third_party_id
                .insert(third_party_id.clone(), user.user_id);
        }
        accounts
            .by_username
            .insert(user.username.clone(), user.user_id);
        accounts.by_id.insert(user.user_id, user.clone());
        Ok(())
    }

    async fn get_activities_for_user(
        &self,
        user_id: Uuid,
        range: ActivityRange,
        limit: u32,
    ) -> Result<Vec<Activity>, AppError> {
        let Some(data) = self.inner.data.get(&user_id) else {
            return Ok(Vec::new());
        };

        let mut activities: Vec<Activity> = data
            .activities
            .iter()
            .filter(|a| range.contains(a.start_time))
            .cloned()
            .collect();
        drop(data);

        activities.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        activities.truncate(limit as usize);
        Ok(activities)
    }

    async fn fetch_recent_runs(&self, user_id: Uuid, limit: u32) -> Result<Vec<Activity>, AppError> {
        let Some(data) = self.inner.data.get(&user_id) else {
            return Ok(Vec::new());
        };

        let mut runs: Vec<Activity> = data
            .activities
            .iter()
            .filter(|a| a.qualifies_for_ratchet())
            .cloned()
            .collect();
        drop(data);

        runs.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        runs.truncate(limit as usize);
        Ok(runs)
    }

    async fn fetch_goal_pair(&self, user_id: Uuid) -> Result<Option<GoalPair>, AppError> {
        Ok(self
            .inner
            .data
            .get(&user_id)
            .and_then(|data| data.goal_pair.clone()))
    }

    async fn replace_goal_pair(&self, goal_pair: &GoalPair) -> Result<(), AppError> {
        self.inner.data.entry(goal_pair.user_id).or_default().goal_pair = Some(goal_pair.clone());
        Ok(())
    }

    async fn record_activity(
        &self,
        activity: &Activity,
        goal_pair: Option<&GoalPair>,
    ) -> Result<(), AppError> {
        if let Some(goal_pair) = goal_pair {
            if goal_pair.user_id != activity.user_id {
                return Err(AppError::Database(
                    "activity and goal pair belong to different users".to_string(),
                ));
            }
        }

        let mut data = self.inner.data.entry(activity.user_id).or_default();
        data.activities.push(activity.clone());
        if let Some(goal_pair) = goal_pair {
            data.goal_pair = Some(goal_pair.clone());
        }
        Ok(())
    }
}
