// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Pacekeeper: adaptive running goals
//!
//! This crate provides the backend API that turns an onboarding
//! questionnaire into a long-term and a current running goal, then moves
//! the current goal after every logged run.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::Database;
use services::GoalService;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: Database,
    pub goals: GoalService<Database>,
}

impl AppState {
    pub fn new(config: Config, db: Database) -> Self {
        let goals = GoalService::new(
            db.clone(),
            config.goal_engine.clone(),
            config.allow_questionnaire_redo,
        );
        Self { config, db, goals }
    }
}
