// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Ratchet engine: moves the current goal after each qualifying run.
//!
//! Each run in the window is classified against the current goal as
//! *faster* (pace strictly below the goal pace) and *longer* (distance at
//! least the goal distance). Four independent rules then apply:
//!
//! | rule | condition | effect |
//! |---|---|---|
//! | upgrade pace | latest run faster, faster ratio >= `ratio_upgrade_speed` | pace -= step, floored at long-term pace |
//! | upgrade distance | latest run longer, longer ratio >= `ratio_upgrade_length` | distance += step, capped at long-term distance |
//! | downgrade pace | leading run of `n > 1` slower runs | pace += penalty * (n - 1), capped at 599 |
//! | downgrade distance | leading run of `n > 1` shorter runs | distance -= penalty * (n - 1), floored at the minimum |
//!
//! Every rule reads the goal as it was before this invocation. An upgrade
//! needs the latest run to succeed and a downgrade needs it to fail, so at
//! most one rule fires per field.

use crate::config::GoalEngineConfig;
use crate::models::goal::{round_km, GoalPair, Pace};
use crate::models::Activity;

/// The most recent qualifying activities, newest first.
#[derive(Debug, Clone, Default)]
pub struct PerformanceWindow {
    activities: Vec<Activity>,
}

impl PerformanceWindow {
    /// Build a window of at most `size` activities.
    ///
    /// Activities are ordered newest-first by start time (ties keep their
    /// input order). Rest-day entries with zero distance or pace carry no
    /// performance signal and are left out.
    pub fn new(mut activities: Vec<Activity>, size: usize) -> Self {
        activities.retain(Activity::qualifies_for_ratchet);
        activities.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        activities.truncate(size);
        Self { activities }
    }

    /// Window over stored history plus an activity that has not been
    /// committed yet.
    pub fn with_pending(pending: &Activity, history: Vec<Activity>, size: usize) -> Self {
        let mut activities = Vec::with_capacity(history.len() + 1);
        activities.push(pending.clone());
        activities.extend(history.into_iter().filter(|a| a.id != pending.id));
        Self::new(activities, size)
    }

    pub fn activities(&self) -> &[Activity] {
        &self.activities
    }

    pub fn len(&self) -> usize {
        self.activities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.activities.is_empty()
    }
}

/// A single rule that fired.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Adjustment {
    PaceUpgraded { from: Pace, to: Pace },
    DistanceUpgraded { from: f64, to: f64 },
    PaceDowngraded { from: Pace, to: Pace, slow_streak: usize },
    DistanceDowngraded { from: f64, to: f64, short_streak: usize },
}

/// Result of one ratchet pass.
#[derive(Debug, Clone, PartialEq)]
pub struct RatchetOutcome {
    pub goal_pair: GoalPair,
    pub adjustments: Vec<Adjustment>,
}

impl RatchetOutcome {
    /// Whether the current goal moved.
    pub fn changed(&self) -> bool {
        !self.adjustments.is_empty()
    }
}

fn ratio(flags: &[bool]) -> f64 {
    flags.iter().filter(|f| **f).count() as f64 / flags.len() as f64
}

/// Consecutive failures counting back from the most recent run.
fn leading_failures(flags: &[bool]) -> usize {
    flags.iter().take_while(|f| !**f).count()
}

/// Apply the ratchet rules. An empty window returns the goal unchanged.
pub fn ratchet(
    goal_pair: &GoalPair,
    window: &PerformanceWindow,
    config: &GoalEngineConfig,
) -> RatchetOutcome {
    let mut outcome = RatchetOutcome {
        goal_pair: goal_pair.clone(),
        adjustments: Vec::new(),
    };
    if window.is_empty() {
        return outcome;
    }

    let long = goal_pair.long_goal;
    let snapshot = goal_pair.curr_goal;
    let goal_pace = snapshot.pace_sec_per_km.secs() as u32;

    let faster: Vec<bool> = window
        .activities()
        .iter()
        .map(|a| a.average_pace_seconds_per_km < goal_pace)
        .collect();
    let longer: Vec<bool> = window
        .activities()
        .iter()
        .map(|a| a.distance_km >= snapshot.distance_km)
        .collect();

    let mut next = snapshot;

    if faster[0] && ratio(&faster) >= config.ratio_upgrade_speed {
        next.pace_sec_per_km = snapshot
            .pace_sec_per_km
            .faster_by(config.pace_upgrade_step, long.pace_sec_per_km);
    }

    if longer[0] && ratio(&longer) >= config.ratio_upgrade_length {
        next.distance_km =
            round_km(snapshot.distance_km + config.distance_upgrade_step).min(long.distance_km);
    }

    let slow_streak = leading_failures(&faster);
    if slow_streak > 1 {
        let penalty = config.pace_penalty * (slow_streak as u32 - 1);
        next.pace_sec_per_km = snapshot.pace_sec_per_km.slower_by(penalty, Pace::SLOWEST);
    }

    let short_streak = leading_failures(&longer);
    if short_streak > 1 {
        let penalty = config.distance_penalty * (short_streak - 1) as f64;
        next.distance_km = round_km((snapshot.distance_km - penalty).max(config.min_distance_km));
    }

    next.reconcile_with(&long);

    if next.pace_sec_per_km != snapshot.pace_sec_per_km {
        let (from, to) = (snapshot.pace_sec_per_km, next.pace_sec_per_km);
        outcome.adjustments.push(if to < from {
            Adjustment::PaceUpgraded { from, to }
        } else {
            Adjustment::PaceDowngraded {
                from,
                to,
                slow_streak,
            }
        });
    }
    if next.distance_km != snapshot.distance_km {
        let (from, to) = (snapshot.distance_km, next.distance_km);
        outcome.adjustments.push(if to > from {
            Adjustment::DistanceUpgraded { from, to }
        } else {
            Adjustment::DistanceDowngraded {
                from,
                to,
                short_streak,
            }
        });
    }

    outcome.goal_pair.curr_goal = next;
    outcome
}
