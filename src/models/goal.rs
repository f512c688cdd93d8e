// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Goal record: the long-term target and the live, ratcheted current goal.
//!
//! Bounds are enforced when a record is deserialized, so a goal read back
//! from storage or received from a client is always in range. The
//! cross-field invariants (current never ahead of long-term) are restored
//! by [`CurrGoal::reconcile_with`] after every resolver or ratchet pass.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Invalid goal field.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GoalValidationError {
    #[error("pace must be between {min} and {max} s/km, got {0}", min = Pace::FASTEST.0, max = Pace::SLOWEST.0)]
    PaceOutOfRange(i64),

    #[error("{field} must be a positive number, got {value}")]
    NotPositive { field: &'static str, value: f64 },
}

/// Pace in seconds per kilometer. Lower is faster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Pace(u16);

impl Pace {
    /// Fastest representable pace.
    pub const FASTEST: Pace = Pace(1);
    /// Slowest representable pace (just under 10 min/km).
    pub const SLOWEST: Pace = Pace(599);

    /// Build a pace, rejecting values outside `[1, 599]`.
    pub fn new(secs: i64) -> Result<Self, GoalValidationError> {
        if (Self::FASTEST.0 as i64..=Self::SLOWEST.0 as i64).contains(&secs) {
            Ok(Self(secs as u16))
        } else {
            Err(GoalValidationError::PaceOutOfRange(secs))
        }
    }

    /// Build a pace, clamping into `[1, 599]`.
    pub fn saturating(secs: i64) -> Self {
        Self(secs.clamp(Self::FASTEST.0 as i64, Self::SLOWEST.0 as i64) as u16)
    }

    pub fn secs(self) -> u16 {
        self.0
    }

    /// Faster by `step` seconds, never faster than `floor`.
    pub fn faster_by(self, step: u16, floor: Pace) -> Pace {
        Pace::saturating(self.0 as i64 - step as i64).max(floor)
    }

    /// Slower by `step` seconds, never slower than `cap`.
    pub fn slower_by(self, step: u32, cap: Pace) -> Pace {
        Pace::saturating(self.0 as i64 + step as i64).min(cap)
    }
}

impl TryFrom<i64> for Pace {
    type Error = GoalValidationError;

    fn try_from(secs: i64) -> Result<Self, Self::Error> {
        Pace::new(secs)
    }
}

impl From<Pace> for i64 {
    fn from(pace: Pace) -> Self {
        pace.0 as i64
    }
}

impl fmt::Display for Pace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:02}/km", self.0 / 60, self.0 % 60)
    }
}

fn require_positive(field: &'static str, value: f64) -> Result<f64, GoalValidationError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(GoalValidationError::NotPositive { field, value })
    }
}

/// Round a distance to one decimal place.
pub fn round_km(km: f64) -> f64 {
    (km * 10.0).round() / 10.0
}

/// Aspirational target, fixed at questionnaire time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "LongGoalRecord")]
pub struct LongGoal {
    pub distance_km: f64,
    pub pace_sec_per_km: Pace,
    pub weight_kg: f64,
}

#[derive(Deserialize)]
struct LongGoalRecord {
    distance_km: f64,
    pace_sec_per_km: Pace,
    weight_kg: f64,
}

impl TryFrom<LongGoalRecord> for LongGoal {
    type Error = GoalValidationError;

    fn try_from(raw: LongGoalRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            distance_km: require_positive("distance_km", raw.distance_km)?,
            pace_sec_per_km: raw.pace_sec_per_km,
            weight_kg: require_positive("weight_kg", raw.weight_kg)?,
        })
    }
}

/// The live target the ratchet moves after each run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "CurrGoalRecord")]
pub struct CurrGoal {
    pub distance_km: f64,
    pub pace_sec_per_km: Pace,
    pub weight_kg: f64,
    pub frequency_per_week: f64,
}

#[derive(Deserialize)]
struct CurrGoalRecord {
    distance_km: f64,
    pace_sec_per_km: Pace,
    weight_kg: f64,
    frequency_per_week: f64,
}

impl TryFrom<CurrGoalRecord> for CurrGoal {
    type Error = GoalValidationError;

    fn try_from(raw: CurrGoalRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            distance_km: require_positive("distance_km", raw.distance_km)?,
            pace_sec_per_km: raw.pace_sec_per_km,
            weight_kg: require_positive("weight_kg", raw.weight_kg)?,
            frequency_per_week: require_positive("frequency_per_week", raw.frequency_per_week)?,
        })
    }
}

impl CurrGoal {
    /// Pull the current goal back behind the long-term goal.
    ///
    /// Current distance never exceeds the long-term distance, current pace
    /// is never faster than the long-term pace, and current weight never
    /// drops below the long-term weight.
    pub fn reconcile_with(&mut self, long: &LongGoal) {
        self.distance_km = self.distance_km.min(long.distance_km);
        self.pace_sec_per_km = self.pace_sec_per_km.max(long.pace_sec_per_km);
        self.weight_kg = self.weight_kg.max(long.weight_kg);
    }

    pub fn snapshot(&self) -> GoalSnapshot {
        GoalSnapshot {
            distance_km: self.distance_km,
            pace_sec_per_km: self.pace_sec_per_km,
        }
    }
}

/// Runner classification, computed once from the questionnaire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserType {
    Beginner,
    Intermediate,
    Advanced,
    Returning,
    WeightLossFocus,
}

impl UserType {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserType::Beginner => "Beginner",
            UserType::Intermediate => "Intermediate",
            UserType::Advanced => "Advanced",
            UserType::Returning => "Returning",
            UserType::WeightLossFocus => "WeightLossFocus",
        }
    }
}

impl fmt::Display for UserType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-user goal record (one document per user).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalPair {
    pub user_id: Uuid,
    pub long_goal: LongGoal,
    pub curr_goal: CurrGoal,
    pub user_type: UserType,
    pub usually_quit: bool,
    pub believe_ai: bool,
    /// When the questionnaire produced this record
    #[serde(with = "crate::time_utils::rfc3339_utc")]
    pub created_at: DateTime<Utc>,
    /// Last ratchet update
    #[serde(with = "crate::time_utils::rfc3339_utc")]
    pub updated_at: DateTime<Utc>,
}

impl GoalPair {
    /// Check the cross-field invariants every persisted record must hold.
    pub fn invariants_hold(&self) -> bool {
        let (curr, long) = (&self.curr_goal, &self.long_goal);
        curr.distance_km <= long.distance_km
            && curr.pace_sec_per_km >= long.pace_sec_per_km
            && curr.weight_kg >= long.weight_kg
    }

    /// `{goal_dist, goal_pace}` view of the current goal.
    pub fn status(&self) -> GoalStatus {
        GoalStatus {
            goal_dist: self.curr_goal.distance_km,
            goal_pace: self.curr_goal.pace_sec_per_km.into(),
        }
    }

    pub fn classification(&self) -> Classification {
        Classification {
            user_type: self.user_type,
            weight: Some(self.curr_goal.weight_kg),
            freq: Some(self.curr_goal.frequency_per_week),
        }
    }
}

/// Distance/pace goal a run was attempting, stored with the activity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GoalSnapshot {
    pub distance_km: f64,
    pub pace_sec_per_km: Pace,
}

/// Current-goal query result. Both fields are `-1` before onboarding.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GoalStatus {
    pub goal_dist: f64,
    pub goal_pace: i64,
}

impl GoalStatus {
    pub const NOT_ONBOARDED: GoalStatus = GoalStatus {
        goal_dist: -1.0,
        goal_pace: -1,
    };

    pub fn is_onboarded(&self) -> bool {
        *self != Self::NOT_ONBOARDED
    }
}

/// Classification query result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub user_type: UserType,
    pub weight: Option<f64>,
    pub freq: Option<f64>,
}
