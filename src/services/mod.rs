// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod answers;
pub mod goal;
pub mod password;
pub mod ratchet;
pub mod resolver;

pub use goal::{GoalService, LoggedActivity};
pub use ratchet::{ratchet, Adjustment, PerformanceWindow, RatchetOutcome};
pub use resolver::{resolve, ResolvedGoals};
