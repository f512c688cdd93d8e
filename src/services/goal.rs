// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Goal service: questionnaire onboarding, activity logging with the
//! ratchet, and goal queries.
//!
//! Writes for one user are serialized by a per-user async mutex. The ratchet
//! result is computed before anything is written, and the new activity is
//! committed together with the updated goal pair through
//! [`Store::record_activity`].

use std::sync::Arc;

use chrono::{SubsecRound, Utc};
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::config::GoalEngineConfig;
use crate::db::Store;
use crate::error::{AppError, Result};
use crate::models::{
    Activity, Classification, GoalPair, GoalStatus, NewActivity, QuestionnaireAnswers,
};
use crate::services::ratchet::{ratchet, PerformanceWindow};
use crate::services::resolver;

/// Shared per-user locks.
pub type UserLocks = Arc<DashMap<Uuid, Arc<Mutex<()>>>>;

/// Result of logging one activity.
#[derive(Debug, Clone)]
pub struct LoggedActivity {
    pub activity: Activity,
    /// The goal pair after this activity, `None` before onboarding
    pub goal_pair: Option<GoalPair>,
    /// Whether the ratchet changed the current goal
    pub goal_updated: bool,
}

#[derive(Clone)]
pub struct GoalService<S> {
    store: S,
    config: GoalEngineConfig,
    allow_redo: bool,
    locks: UserLocks,
}

impl<S: Store> GoalService<S> {
    pub fn new(store: S, config: GoalEngineConfig, allow_redo: bool) -> Self {
        Self {
            store,
            config,
            allow_redo,
            locks: UserLocks::default(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &GoalEngineConfig {
        &self.config
    }

    async fn lock_user(&self, user_id: Uuid) -> OwnedMutexGuard<()> {
        // Clone the Arc out so the map shard is not held across the await.
        let lock = self
            .locks
            .entry(user_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock.lock_owned().await
    }

    async fn require_user(&self, user_id: Uuid) -> Result<()> {
        match self.store.get_user(user_id).await? {
            Some(_) => Ok(()),
            None => Err(AppError::NotFound(format!("User {}", user_id))),
        }
    }

    /// Resolve questionnaire answers into a goal pair and store it,
    /// replacing any earlier record for the user.
    pub async fn on_questionnaire_complete(
        &self,
        user_id: Uuid,
        answers: &QuestionnaireAnswers,
    ) -> Result<GoalPair> {
        let resolved = resolver::resolve(answers, &self.config).inspect_err(|e| {
            tracing::info!(%user_id, error = %e, "Questionnaire rejected");
        })?;

        self.require_user(user_id).await?;
        let _guard = self.lock_user(user_id).await;

        if !self.allow_redo && self.store.fetch_goal_pair(user_id).await?.is_some() {
            return Err(AppError::Conflict(
                "Questionnaire already completed".to_string(),
            ));
        }

        let goal_pair = resolved.into_goal_pair(user_id, Utc::now().trunc_subsecs(0));
        self.store.replace_goal_pair(&goal_pair).await?;

        tracing::info!(
            %user_id,
            user_type = %goal_pair.user_type,
            curr_distance_km = goal_pair.curr_goal.distance_km,
            curr_pace = %goal_pair.curr_goal.pace_sec_per_km,
            long_distance_km = goal_pair.long_goal.distance_km,
            long_pace = %goal_pair.long_goal.pace_sec_per_km,
            "Goal pair created from questionnaire"
        );

        Ok(goal_pair)
    }

    /// Store a new activity and, when it is a real run and the user has a
    /// goal, move the current goal according to recent performance.
    pub async fn on_activity_logged(
        &self,
        user_id: Uuid,
        new_activity: NewActivity,
    ) -> Result<LoggedActivity> {
        self.require_user(user_id).await?;
        let _guard = self.lock_user(user_id).await;

        let goal_pair = self.store.fetch_goal_pair(user_id).await?;
        let now = Utc::now();
        let activity = new_activity.into_activity(
            user_id,
            goal_pair.as_ref().map(|pair| pair.curr_goal.snapshot()),
            now,
        );

        let updated = match &goal_pair {
            Some(pair) if activity.qualifies_for_ratchet() => {
                let history = self
                    .store
                    .fetch_recent_runs(user_id, self.config.window_size as u32)
                    .await?;
                let window = PerformanceWindow::with_pending(&activity, history, self.config.window_size);
                let outcome = ratchet(pair, &window, &self.config);

                if outcome.changed() {
                    tracing::info!(
                        %user_id,
                        activity_id = %activity.id,
                        window = window.len(),
                        adjustments = ?outcome.adjustments,
                        "Current goal adjusted"
                    );
                    let mut next = outcome.goal_pair;
                    next.updated_at = now.trunc_subsecs(0);
                    Some(next)
                } else {
                    tracing::debug!(%user_id, activity_id = %activity.id, "Current goal unchanged");
                    None
                }
            }
            Some(_) => {
                tracing::debug!(%user_id, activity_id = %activity.id, "Rest day, ratchet skipped");
                None
            }
            None => {
                tracing::debug!(%user_id, activity_id = %activity.id, "No goal pair yet, ratchet skipped");
                None
            }
        };

        self.store.record_activity(&activity, updated.as_ref()).await?;

        let goal_updated = updated.is_some();
        Ok(LoggedActivity {
            activity,
            goal_pair: updated.or(goal_pair),
            goal_updated,
        })
    }

    /// Current distance/pace goal, or the `-1/-1` sentinel before onboarding.
    pub async fn get_current_goal(&self, user_id: Uuid) -> Result<GoalStatus> {
        Ok(self
            .store
            .fetch_goal_pair(user_id)
            .await?
            .map_or(GoalStatus::NOT_ONBOARDED, |pair| pair.status()))
    }

    pub async fn get_classification(&self, user_id: Uuid) -> Result<Classification> {
        Ok(self.get_goal_pair(user_id).await?.classification())
    }

    pub async fn get_goal_pair(&self, user_id: Uuid) -> Result<GoalPair> {
        self.store
            .fetch_goal_pair(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Questionnaire not completed".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryDb;
    use crate::models::{ActivityRange, User};
    use async_trait::async_trait;
    use chrono::{DateTime, Duration, TimeZone};
    use std::sync::atomic::{AtomicBool, Ordering};

    fn answers() -> QuestionnaireAnswers {
        QuestionnaireAnswers {
            g1: Some("Speed".to_string()),
            g2: Some("Yes (Additional: distance=10, speed=5)".to_string()),
            h1: Some("Within a week".to_string()),
            h2: Some("3~10km".to_string()),
            h3: Some("5~7".to_string()),
            h4: Some("Yes (Additional: weight=70)".to_string()),
            m1: Some("Yes".to_string()),
            m2: Some("No".to_string()),
        }
    }

    fn run_at(start: DateTime<Utc>, distance_km: f64, pace: u32) -> NewActivity {
        NewActivity {
            start_time: start,
            duration_seconds: (distance_km * pace as f64) as u32,
            distance_km,
            average_pace_seconds_per_km: pace,
            split_paces: vec![],
            start_latitude: None,
            start_longitude: None,
            end_latitude: None,
            end_longitude: None,
        }
    }

    fn day(n: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 7, 0, 0).unwrap() + Duration::days(n)
    }

    async fn service_with_user<S: Store>(store: S) -> (GoalService<S>, Uuid) {
        let user_id = Uuid::new_v4();
        store
            .create_user(&User {
                user_id,
                username: format!("runner-{user_id}"),
                password_hash: "hash".to_string(),
                third_party_id: None,
                created_at: Utc::now(),
            })
            .await
            .unwrap();
        let service = GoalService::new(store, GoalEngineConfig::default(), true);
        (service, user_id)
    }

    #[tokio::test]
    async fn test_current_goal_sentinel_before_onboarding() {
        let (service, user_id) = service_with_user(MemoryDb::new()).await;
        let status = service.get_current_goal(user_id).await.unwrap();
        assert_eq!(status, GoalStatus::NOT_ONBOARDED);
        assert!(matches!(
            service.get_classification(user_id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_activity_before_onboarding_is_stored_without_snapshot() {
        let (service, user_id) = service_with_user(MemoryDb::new()).await;
        let logged = service
            .on_activity_logged(user_id, run_at(day(0), 5.0, 360))
            .await
            .unwrap();

        assert!(logged.goal_pair.is_none());
        assert!(!logged.goal_updated);
        assert!(logged.activity.goal_snapshot.is_none());
        let stored = service.store().fetch_recent_activities(user_id, 10).await.unwrap();
        assert_eq!(stored.len(), 1);
    }

    #[tokio::test]
    async fn test_questionnaire_then_goal_query() {
        let (service, user_id) = service_with_user(MemoryDb::new()).await;
        let pair = service
            .on_questionnaire_complete(user_id, &answers())
            .await
            .unwrap();
        assert!(pair.invariants_hold());

        let status = service.get_current_goal(user_id).await.unwrap();
        assert_eq!(status, pair.status());
        assert!(status.is_onboarded());
    }

    #[tokio::test]
    async fn test_questionnaire_replay_replaces_record() {
        let (service, user_id) = service_with_user(MemoryDb::new()).await;
        let first = service
            .on_questionnaire_complete(user_id, &answers())
            .await
            .unwrap();

        let mut distance_focused = answers();
        distance_focused.g1 = Some("Distance".to_string());
        distance_focused.g2 = Some("No".to_string());
        let second = service
            .on_questionnaire_complete(user_id, &distance_focused)
            .await
            .unwrap();

        assert_ne!(first.long_goal, second.long_goal);
        assert_eq!(service.get_goal_pair(user_id).await.unwrap(), second);
    }

    #[tokio::test]
    async fn test_questionnaire_replay_rejected_when_redo_disabled() {
        let (service, user_id) = service_with_user(MemoryDb::new()).await;
        let service = GoalService::new(service.store().clone(), GoalEngineConfig::default(), false);

        service
            .on_questionnaire_complete(user_id, &answers())
            .await
            .unwrap();
        let err = service
            .on_questionnaire_complete(user_id, &answers())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_invalid_questionnaire_writes_nothing() {
        let (service, user_id) = service_with_user(MemoryDb::new()).await;
        let mut bad = answers();
        bad.h1 = None;

        let err = service.on_questionnaire_complete(user_id, &bad).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidAnswer(_)));
        assert!(service.store().fetch_goal_pair(user_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unknown_user_is_not_found() {
        let service = GoalService::new(MemoryDb::new(), GoalEngineConfig::default(), true);
        let err = service
            .on_activity_logged(Uuid::new_v4(), run_at(day(0), 5.0, 360))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_rest_day_leaves_goal_untouched() {
        let (service, user_id) = service_with_user(MemoryDb::new()).await;
        let before = service
            .on_questionnaire_complete(user_id, &answers())
            .await
            .unwrap();

        for n in 0..5 {
            let logged = service
                .on_activity_logged(user_id, run_at(day(n), 0.0, 0))
                .await
                .unwrap();
            assert!(!logged.goal_updated);
        }
        assert_eq!(service.get_goal_pair(user_id).await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_slow_streak_downgrades_pace() {
        let (service, user_id) = service_with_user(MemoryDb::new()).await;
        let pair = service
            .on_questionnaire_complete(user_id, &answers())
            .await
            .unwrap();
        let pace = pair.curr_goal.pace_sec_per_km.secs() as u32;
        let distance = pair.curr_goal.distance_km;

        // Two slow, short runs in a row: the second one triggers the first
        // penalty on both pace (+10 s/km) and distance.
        let first = service
            .on_activity_logged(user_id, run_at(day(0), distance - 1.0, pace + 30))
            .await
            .unwrap();
        assert!(!first.goal_updated);

        let second = service
            .on_activity_logged(user_id, run_at(day(1), distance - 1.0, pace + 30))
            .await
            .unwrap();
        assert!(second.goal_updated);
        let updated = second.goal_pair.unwrap();
        assert_eq!(updated.curr_goal.pace_sec_per_km.secs() as u32, pace + 10);
        assert_eq!(updated.curr_goal.distance_km, distance - 0.5);
        assert!(updated.invariants_hold());

        // The stored activity carries the goal it was attempting.
        let snapshot = second.activity.goal_snapshot.unwrap();
        assert_eq!(snapshot.pace_sec_per_km.secs() as u32, pace);
    }

    /// Store wrapper whose history read fails on demand.
    #[derive(Clone)]
    struct FlakyStore {
        inner: MemoryDb,
        fail_history: Arc<AtomicBool>,
    }

    #[async_trait]
    impl Store for FlakyStore {
        async fn get_user(&self, user_id: Uuid) -> Result<Option<User>> {
            self.inner.get_user(user_id).await
        }
        async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
            self.inner.get_user_by_username(username).await
        }
        async fn get_user_by_third_party_id(&self, id: &str) -> Result<Option<User>> {
            self.inner.get_user_by_third_party_id(id).await
        }
        async fn create_user(&self, user: &User) -> Result<()> {
            self.inner.create_user(user).await
        }
        async fn get_activities_for_user(
            &self,
            user_id: Uuid,
            range: ActivityRange,
            limit: u32,
        ) -> Result<Vec<Activity>> {
            if self.fail_history.load(Ordering::SeqCst) {
                return Err(AppError::Database("unavailable".to_string()));
            }
            self.inner.get_activities_for_user(user_id, range, limit).await
        }
        async fn fetch_recent_runs(&self, user_id: Uuid, limit: u32) -> Result<Vec<Activity>> {
            if self.fail_history.load(Ordering::SeqCst) {
                return Err(AppError::Database("unavailable".to_string()));
            }
            self.inner.fetch_recent_runs(user_id, limit).await
        }
        async fn fetch_goal_pair(&self, user_id: Uuid) -> Result<Option<GoalPair>> {
            self.inner.fetch_goal_pair(user_id).await
        }
        async fn replace_goal_pair(&self, goal_pair: &GoalPair) -> Result<()> {
            self.inner.replace_goal_pair(goal_pair).await
        }
        async fn record_activity(
            &self,
            activity: &Activity,
            goal_pair: Option<&GoalPair>,
        ) -> Result<()> {
            self.inner.record_activity(activity, goal_pair).await
        }
    }

    #[tokio::test]
    async fn test_failed_history_read_stores_nothing() {
        let store = FlakyStore {
            inner: MemoryDb::new(),
            fail_history: Arc::new(AtomicBool::new(false)),
        };
        let (service, user_id) = service_with_user(store.clone()).await;
        let pair = service
            .on_questionnaire_complete(user_id, &answers())
            .await
            .unwrap();

        store.fail_history.store(true, Ordering::SeqCst);
        let err = service
            .on_activity_logged(user_id, run_at(day(0), 5.0, 360))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Database(_)));

        store.fail_history.store(false, Ordering::SeqCst);
        assert!(store.inner.fetch_recent_activities(user_id, 10).await.unwrap().is_empty());
        assert_eq!(store.inner.fetch_goal_pair(user_id).await.unwrap(), Some(pair));
    }

    #[tokio::test]
    async fn test_rest_days_do_not_shrink_window() {
        let (service, user_id) = service_with_user(MemoryDb::new()).await;
        service
            .on_questionnaire_complete(user_id, &answers())
            .await
            .unwrap();

        for n in 0..9 {
            service
                .on_activity_logged(user_id, run_at(day(n), 5.0, 599))
                .await
                .unwrap();
        }
        for n in 9..18 {
            service
                .on_activity_logged(user_id, run_at(day(n), 0.0, 0))
                .await
                .unwrap();
        }
        let before = service.get_goal_pair(user_id).await.unwrap();
        assert_eq!(before.curr_goal.pace_sec_per_km.secs(), 599);

        // One fast run against nine slow ones is a 1/10 faster ratio.
        service
            .on_activity_logged(user_id, run_at(day(18), 5.0, 500))
            .await
            .unwrap();
        let after = service.get_goal_pair(user_id).await.unwrap();
        assert_eq!(after.curr_goal.pace_sec_per_km, before.curr_goal.pace_sec_per_km);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_slow_runs_apply_every_penalty() {
        let (service, user_id) = service_with_user(MemoryDb::new()).await;
        let pair = service
            .on_questionnaire_complete(user_id, &answers())
            .await
            .unwrap();
        let pace = pair.curr_goal.pace_sec_per_km.secs() as u32;
        let distance = pair.curr_goal.distance_km;

        // Seed one slow run so every following slow run is at least the
        // second in a streak.
        service
            .on_activity_logged(user_id, run_at(day(0), distance, 599))
            .await
            .unwrap();

        let mut handles = Vec::new();
        for n in 1..=4 {
            let service = service.clone();
            handles.push(tokio::spawn(async move {
                service
                    .on_activity_logged(user_id, run_at(day(n), distance, 599))
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let stored = service.store().fetch_recent_activities(user_id, 10).await.unwrap();
        assert_eq!(stored.len(), 5);

        // Each logged run sees every earlier one, whatever order the tasks
        // ran in, so the streak penalties always sum to the same total:
        // 10 + 20 + 30 + 40 s/km on top of the starting pace.
        let final_pace = service.get_goal_pair(user_id).await.unwrap().curr_goal.pace_sec_per_km;
        assert_eq!(final_pace.secs() as u32, (pace + 100).min(599));
    }
}
