// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Questionnaire resolver: onboarding answers to an initial goal pair.
//!
//! Pure and deterministic. The steps run in a fixed order:
//! 1. Seed the long-term goal from the motivation and explicit target.
//! 2. Seed the current goal, then adjust it by recency, last-run distance,
//!    last-run pace and current weight.
//! 3. Reconcile the current goal against the long-term goal.
//! 4. Classify the runner.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::config::GoalEngineConfig;
use crate::models::goal::{CurrGoal, GoalPair, LongGoal, Pace, UserType};
use crate::models::questionnaire::{QuestionKey, QuestionnaireAnswers, QuestionnaireError};
use crate::services::answers::{parse_answer, ParsedAnswer};

const DEFAULT_LONG_DISTANCE_KM: f64 = 21.0;
const DEFAULT_LONG_PACE: i64 = 300;
const DEFAULT_LONG_WEIGHT_KG: f64 = 60.0;

const DEFAULT_CURR_DISTANCE_KM: f64 = 5.0;
const DEFAULT_CURR_PACE: i64 = 420;
const DEFAULT_CURR_WEIGHT_KG: f64 = 70.0;
const DEFAULT_CURR_FREQUENCY: f64 = 3.0;

/// Above this weight the first goal is kept short and easy.
const HEAVY_RUNNER_KG: f64 = 90.0;
const HEAVY_RUNNER_MAX_DISTANCE_KM: f64 = 3.0;
const HEAVY_RUNNER_MIN_PACE: i64 = 540;

/// Health-motivated runners above this weight are weight-loss focused.
const WEIGHT_LOSS_FOCUS_KG: f64 = 80.0;
/// Weight-loss target below current weight when no explicit target is given.
const HEALTH_FALLBACK_WEIGHT_LOSS_KG: f64 = 5.0;

/// Long-term pace below which a recent runner counts as advanced.
const ADVANCED_LONG_PACE: u16 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Motivation {
    Speed,
    Distance,
    Health,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Recency {
    WithinWeek,
    WithinTwoWeeks,
    WithinMonth,
    OverMonth,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LastDistance {
    Under3,
    From3To10,
    From10To21,
    Over21,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LastPace {
    Under5,
    From5To7,
    From7To9,
    Over9,
    Unknown,
}

impl Motivation {
    fn parse(head: &str) -> Option<Self> {
        if head.contains("speed") || head.contains("fast") {
            Some(Motivation::Speed)
        } else if head.contains("distance") || head.contains("long") || head.contains("far") {
            Some(Motivation::Distance)
        } else if head.contains("health") || head.contains("weight") || head.contains("diet") {
            Some(Motivation::Health)
        } else {
            None
        }
    }
}

impl Recency {
    fn parse(head: &str) -> Option<Self> {
        if head.contains("more than a month") || head.contains("over a month") || head.contains("never") {
            Some(Recency::OverMonth)
        } else if head.contains("two weeks") || head.contains("2 weeks") {
            Some(Recency::WithinTwoWeeks)
        } else if head.contains("month") || head.contains("2~4 weeks") || head.contains("2-4 weeks") {
            Some(Recency::WithinMonth)
        } else if head.contains("week") {
            Some(Recency::WithinWeek)
        } else {
            None
        }
    }

    /// Distance, pace and frequency forced by the gap since the last run.
    fn overrides(self) -> Option<(f64, i64, f64)> {
        match self {
            Recency::WithinWeek => None,
            Recency::WithinTwoWeeks => Some((4.0, 450, 2.5)),
            Recency::WithinMonth => Some((3.0, 510, 2.0)),
            Recency::OverMonth => Some((2.0, 570, 1.0)),
        }
    }
}

fn is_unknown(compact: &str) -> bool {
    compact.contains("know") || compact.contains("notsure")
}

impl LastDistance {
    fn parse(head: &str) -> Option<Self> {
        let compact: String = head.chars().filter(|c| !c.is_whitespace()).collect();
        if is_unknown(&compact) {
            Some(LastDistance::Unknown)
        } else if ["under3", "<3", "lessthan3"].iter().any(|p| compact.starts_with(p)) {
            Some(LastDistance::Under3)
        } else if compact.contains("3~10") || compact.contains("3-10") {
            Some(LastDistance::From3To10)
        } else if compact.contains("10~21") || compact.contains("10-21") {
            Some(LastDistance::From10To21)
        } else if ["over21", ">21", "morethan21"].iter().any(|p| compact.starts_with(p)) {
            Some(LastDistance::Over21)
        } else {
            None
        }
    }

    fn distance_floor(self) -> Option<f64> {
        match self {
            LastDistance::Under3 | LastDistance::Unknown => None,
            LastDistance::From3To10 => Some(3.0),
            LastDistance::From10To21 => Some(7.0),
            LastDistance::Over21 => Some(10.0),
        }
    }
}

impl LastPace {
    fn parse(head: &str) -> Option<Self> {
        let compact: String = head.chars().filter(|c| !c.is_whitespace()).collect();
        if is_unknown(&compact) {
            Some(LastPace::Unknown)
        } else if ["under5", "<5", "lessthan5"].iter().any(|p| compact.starts_with(p)) {
            Some(LastPace::Under5)
        } else if compact.contains("5~7") || compact.contains("5-7") {
            Some(LastPace::From5To7)
        } else if compact.contains("7~9") || compact.contains("7-9") {
            Some(LastPace::From7To9)
        } else if ["over9", ">9", "morethan9"].iter().any(|p| compact.starts_with(p)) {
            Some(LastPace::Over9)
        } else {
            None
        }
    }

    /// Pace range (s/km) the current goal is clamped into.
    fn pace_range(self) -> Option<(u16, u16)> {
        match self {
            LastPace::Under5 => Some((240, 360)),
            LastPace::From5To7 => Some((300, 420)),
            LastPace::From7To9 => Some((420, 540)),
            LastPace::Over9 => Some((540, Pace::SLOWEST.secs())),
            LastPace::Unknown => None,
        }
    }

    fn is_known(self) -> bool {
        self != LastPace::Unknown
    }
}

fn parse_yes_no(key: QuestionKey, head: &str) -> Result<bool, QuestionnaireError> {
    if head.starts_with("yes") {
        Ok(true)
    } else if head.starts_with("no") {
        Ok(false)
    } else {
        Err(unrecognized(key, head))
    }
}

fn unrecognized(key: QuestionKey, value: &str) -> QuestionnaireError {
    QuestionnaireError::Unrecognized {
        key,
        value: value.to_string(),
    }
}

/// Parse a categorical answer with `parse`, mapping `None` to an error.
fn categorical<T>(
    answers: &QuestionnaireAnswers,
    key: QuestionKey,
    parse: impl Fn(&str) -> Option<T>,
) -> Result<T, QuestionnaireError> {
    let parsed = parse_answer(key, answers.require(key)?)?;
    parse(&parsed.head).ok_or_else(|| unrecognized(key, &parsed.head))
}

fn yes_no(answers: &QuestionnaireAnswers, key: QuestionKey) -> Result<bool, QuestionnaireError> {
    let parsed = parse_answer(key, answers.require(key)?)?;
    parse_yes_no(key, &parsed.head)
}

/// Output of the resolver, before it is bound to a user.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedGoals {
    pub long_goal: LongGoal,
    pub curr_goal: CurrGoal,
    pub user_type: UserType,
    pub usually_quit: bool,
    pub believe_ai: bool,
}

impl ResolvedGoals {
    pub fn into_goal_pair(self, user_id: Uuid, now: DateTime<Utc>) -> GoalPair {
        GoalPair {
            user_id,
            long_goal: self.long_goal,
            curr_goal: self.curr_goal,
            user_type: self.user_type,
            usually_quit: self.usually_quit,
            believe_ai: self.believe_ai,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Derive the initial goal pair from questionnaire answers.
///
/// Every key is required; an absent or unrecognized categorical answer
/// fails with [`QuestionnaireError`].
pub fn resolve(
    answers: &QuestionnaireAnswers,
    config: &GoalEngineConfig,
) -> Result<ResolvedGoals, QuestionnaireError> {
    let motivation = categorical(answers, QuestionKey::G1, Motivation::parse)?;
    let target = parse_answer(QuestionKey::G2, answers.require(QuestionKey::G2)?)?;
    let explicit_target = parse_yes_no(QuestionKey::G2, &target.head)?;
    let recency = categorical(answers, QuestionKey::H1, Recency::parse)?;
    let last_distance = categorical(answers, QuestionKey::H2, LastDistance::parse)?;
    let last_pace = categorical(answers, QuestionKey::H3, LastPace::parse)?;
    let current_weight =
        parse_answer(QuestionKey::H4, answers.require(QuestionKey::H4)?)?.positive("weight");
    let usually_quit = yes_no(answers, QuestionKey::M1)?;
    let believe_ai = yes_no(answers, QuestionKey::M2)?;

    let long_goal = seed_long_goal(
        motivation,
        explicit_target.then_some(&target),
        current_weight,
        config,
    );

    let mut curr_goal = CurrGoal {
        distance_km: DEFAULT_CURR_DISTANCE_KM,
        pace_sec_per_km: Pace::saturating(DEFAULT_CURR_PACE),
        weight_kg: DEFAULT_CURR_WEIGHT_KG,
        frequency_per_week: DEFAULT_CURR_FREQUENCY,
    };

    if let Some((distance, pace, frequency)) = recency.overrides() {
        curr_goal.distance_km = distance;
        curr_goal.pace_sec_per_km = Pace::saturating(pace);
        curr_goal.frequency_per_week = frequency;
    }

    if let Some(floor) = last_distance.distance_floor() {
        curr_goal.distance_km = curr_goal.distance_km.max(floor);
    }

    if let Some((fastest, slowest)) = last_pace.pace_range() {
        let secs = curr_goal.pace_sec_per_km.secs().clamp(fastest, slowest);
        curr_goal.pace_sec_per_km = Pace::saturating(secs as i64);
    }

    if let Some(weight) = current_weight {
        curr_goal.weight_kg = weight;
        if weight > HEAVY_RUNNER_KG {
            curr_goal.distance_km = curr_goal.distance_km.min(HEAVY_RUNNER_MAX_DISTANCE_KM);
            curr_goal.pace_sec_per_km = curr_goal
                .pace_sec_per_km
                .max(Pace::saturating(HEAVY_RUNNER_MIN_PACE));
        }
    }

    curr_goal.reconcile_with(&long_goal);

    let user_type = classify(
        motivation,
        recency,
        last_pace,
        current_weight,
        usually_quit,
        &long_goal,
    );

    tracing::debug!(
        ?motivation,
        ?recency,
        user_type = %user_type,
        long_distance_km = long_goal.distance_km,
        long_pace = long_goal.pace_sec_per_km.secs(),
        curr_distance_km = curr_goal.distance_km,
        curr_pace = curr_goal.pace_sec_per_km.secs(),
        "Questionnaire resolved"
    );

    Ok(ResolvedGoals {
        long_goal,
        curr_goal,
        user_type,
        usually_quit,
        believe_ai,
    })
}

fn seed_long_goal(
    motivation: Motivation,
    target: Option<&ParsedAnswer>,
    current_weight: Option<f64>,
    config: &GoalEngineConfig,
) -> LongGoal {
    let mut distance = DEFAULT_LONG_DISTANCE_KM;
    let mut pace = DEFAULT_LONG_PACE;
    let mut weight = DEFAULT_LONG_WEIGHT_KG;

    let target_distance = |t: &ParsedAnswer| t.positive("distance").or_else(|| t.positive("goal"));

    match (motivation, target) {
        (Motivation::Speed, Some(t)) => {
            if let Some(d) = target_distance(t) {
                distance = d;
            }
            // Stated in minutes per km.
            if let Some(minutes) = t.int("speed").filter(|m| *m > 0) {
                pace = minutes.saturating_mul(60);
            }
        }
        (Motivation::Distance, Some(t)) => {
            if let Some(d) = target_distance(t) {
                distance = d;
            }
            pace = 360;
        }
        (Motivation::Health, Some(t)) => {
            distance = 10.0;
            pace = 420;
            if let Some(w) = t.positive("weight").or_else(|| t.positive("goal")) {
                weight = w;
            }
        }
        (Motivation::Speed, None) => {
            distance = 10.0;
            pace = 300;
        }
        (Motivation::Distance, None) => {
            distance = 21.0;
            pace = 360;
        }
        (Motivation::Health, None) => {
            distance = 5.0;
            pace = 420;
            if let Some(current) = current_weight {
                weight = (current - HEALTH_FALLBACK_WEIGHT_LOSS_KG).max(1.0);
            }
        }
    }

    LongGoal {
        distance_km: distance.max(config.min_distance_km),
        pace_sec_per_km: Pace::saturating(pace),
        weight_kg: weight,
    }
}

fn classify(
    motivation: Motivation,
    recency: Recency,
    last_pace: LastPace,
    current_weight: Option<f64>,
    usually_quit: bool,
    long_goal: &LongGoal,
) -> UserType {
    let recent_with_known_pace = recency == Recency::WithinWeek && last_pace.is_known();

    if recent_with_known_pace
        && (last_pace == LastPace::Under5 || long_goal.pace_sec_per_km.secs() < ADVANCED_LONG_PACE)
    {
        UserType::Advanced
    } else if recent_with_known_pace {
        UserType::Intermediate
    } else if recency == Recency::OverMonth && usually_quit {
        UserType::Returning
    } else if motivation == Motivation::Health
        && current_weight.is_some_and(|w| w > WEIGHT_LOSS_FOCUS_KG)
    {
        UserType::WeightLossFocus
    } else {
        UserType::Beginner
    }
}
