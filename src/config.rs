// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Loaded once at startup and carried in `AppState`. The goal engine
//! constants are a separate immutable [`GoalEngineConfig`] handed to the
//! resolver and the ratchet engine.

use std::env;
use std::str::FromStr;

/// Which storage backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    /// Google Cloud Firestore (production, or the local emulator)
    Firestore,
    /// Process-local maps (tests and quick local runs)
    Memory,
}

impl FromStr for StorageBackend {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "firestore" => Ok(StorageBackend::Firestore),
            "memory" => Ok(StorageBackend::Memory),
            _ => Err(()),
        }
    }
}

/// Tuning constants for the goal-adaptation engine.
#[derive(Debug, Clone, PartialEq)]
pub struct GoalEngineConfig {
    /// Number of recent activities the ratchet looks at
    pub window_size: usize,
    /// Fraction of faster runs needed to upgrade pace
    pub ratio_upgrade_speed: f64,
    /// Fraction of long-enough runs needed to upgrade distance
    pub ratio_upgrade_length: f64,
    /// Seconds/km removed on a pace upgrade
    pub pace_upgrade_step: u16,
    /// Kilometers added on a distance upgrade
    pub distance_upgrade_step: f64,
    /// Seconds/km added per extra consecutive slow run
    pub pace_penalty: u32,
    /// Kilometers removed per extra consecutive short run
    pub distance_penalty: f64,
    /// Distance downgrades never go below this
    pub min_distance_km: f64,
}

impl Default for GoalEngineConfig {
    fn default() -> Self {
        Self {
            window_size: 10,
            ratio_upgrade_speed: 0.5,
            ratio_upgrade_length: 0.7,
            pace_upgrade_step: 15,
            distance_upgrade_step: 1.0,
            pace_penalty: 10,
            distance_penalty: 0.5,
            min_distance_km: 1.0,
        }
    }
}

impl GoalEngineConfig {
    /// Load engine constants from `GOAL_*` variables, defaulting each one.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let config = Self {
            window_size: parse_var("GOAL_WINDOW_SIZE", defaults.window_size)?,
            ratio_upgrade_speed: parse_var("GOAL_RATIO_UPGRADE_SPEED", defaults.ratio_upgrade_speed)?,
            ratio_upgrade_length: parse_var(
                "GOAL_RATIO_UPGRADE_LENGTH",
                defaults.ratio_upgrade_length,
            )?,
            pace_upgrade_step: parse_var("GOAL_PACE_UPGRADE_STEP", defaults.pace_upgrade_step)?,
            distance_upgrade_step: parse_var(
                "GOAL_DISTANCE_UPGRADE_STEP",
                defaults.distance_upgrade_step,
            )?,
            pace_penalty: parse_var("GOAL_PACE_PENALTY", defaults.pace_penalty)?,
            distance_penalty: parse_var("GOAL_DISTANCE_PENALTY", defaults.distance_penalty)?,
            min_distance_km: parse_var("GOAL_MIN_DISTANCE", defaults.min_distance_km)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject constants that would let the ratchet produce an invalid goal.
    ///
    /// Ratios must lie in `(0, 1]`; the window, steps, penalties and the
    /// distance floor must be positive.
    pub fn validate(&self) -> Result<(), ConfigError> {
        fn check(ok: bool, var: &'static str, value: impl ToString) -> Result<(), ConfigError> {
            if ok {
                Ok(())
            } else {
                Err(ConfigError::Invalid {
                    var,
                    value: value.to_string(),
                })
            }
        }
        let ratio = |r: f64| r > 0.0 && r <= 1.0;

        check(self.window_size >= 1, "GOAL_WINDOW_SIZE", self.window_size)?;
        check(
            ratio(self.ratio_upgrade_speed),
            "GOAL_RATIO_UPGRADE_SPEED",
            self.ratio_upgrade_speed,
        )?;
        check(
            ratio(self.ratio_upgrade_length),
            "GOAL_RATIO_UPGRADE_LENGTH",
            self.ratio_upgrade_length,
        )?;
        check(self.pace_upgrade_step > 0, "GOAL_PACE_UPGRADE_STEP", self.pace_upgrade_step)?;
        check(
            self.distance_upgrade_step > 0.0,
            "GOAL_DISTANCE_UPGRADE_STEP",
            self.distance_upgrade_step,
        )?;
        check(self.pace_penalty > 0, "GOAL_PACE_PENALTY", self.pace_penalty)?;
        check(self.distance_penalty > 0.0, "GOAL_DISTANCE_PENALTY", self.distance_penalty)?;
        check(self.min_distance_km > 0.0, "GOAL_MIN_DISTANCE", self.min_distance_km)
    }
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Frontend URL allowed by CORS
    pub frontend_url: String,
    /// GCP project ID (Firestore)
    pub gcp_project_id: String,
    /// Server port
    pub port: u16,
    /// Storage backend
    pub storage: StorageBackend,
    /// Whether a second questionnaire submission replaces the first
    /// (`false` rejects it with a conflict)
    pub allow_questionnaire_redo: bool,
    /// JWT signing key for session tokens (raw bytes)
    pub jwt_signing_key: Vec<u8>,
    /// bcrypt work factor for password hashes
    pub bcrypt_cost: u32,
    /// Goal engine constants
    pub goal_engine: GoalEngineConfig,
}

impl Config {
    /// Config for tests: in-memory storage, default engine constants.
    pub fn test_default() -> Self {
        Self {
            frontend_url: "http://localhost:5173".to_string(),
            gcp_project_id: "test-project".to_string(),
            port: 8080,
            storage: StorageBackend::Memory,
            allow_questionnaire_redo: true,
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
            bcrypt_cost: 4,
            goal_engine: GoalEngineConfig::default(),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// A `.env` file is read first if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let storage = match env::var("STORAGE_BACKEND") {
            Ok(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                var: "STORAGE_BACKEND",
                value: raw,
            })?,
            Err(_) => StorageBackend::Firestore,
        };

        Ok(Self {
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            port: parse_var("PORT", 8080)?,
            storage,
            allow_questionnaire_redo: parse_var("ALLOW_QUESTIONNAIRE_REDO", true)?,
            jwt_signing_key: env::var("JWT_SIGNING_KEY")
                .map_err(|_| ConfigError::Missing("JWT_SIGNING_KEY"))?
                .trim()
                .as_bytes()
                .to_vec(),
            bcrypt_cost: parse_var("BCRYPT_COST", bcrypt::DEFAULT_COST)?,
            goal_engine: GoalEngineConfig::from_env()?,
        })
    }
}

/// Parse an optional variable, falling back to `default` when unset.
fn parse_var<T: FromStr>(var: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(var) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid { var, value: raw }),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
}
