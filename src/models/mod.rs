// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod activity;
pub mod goal;
pub mod questionnaire;
pub mod user;

pub use activity::{Activity, ActivityRange, NewActivity};
pub use goal::{
    Classification, CurrGoal, GoalPair, GoalSnapshot, GoalStatus, LongGoal, Pace, UserType,
};
pub use questionnaire::QuestionnaireAnswers;
pub use user::User;
