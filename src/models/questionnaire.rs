// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Onboarding questionnaire answers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Fixed question keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuestionKey {
    /// Primary motivation (speed / distance / health)
    G1,
    /// Explicit long-term target, with optional embedded numbers
    G2,
    /// Time since last run
    H1,
    /// Distance of last run
    H2,
    /// Pace of last run (min/km)
    H3,
    /// Current weight, embedded as `weight=<kg>`
    H4,
    /// Usually quits
    M1,
    /// Trusts automated guidance
    M2,
}

impl QuestionKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionKey::G1 => "g1",
            QuestionKey::G2 => "g2",
            QuestionKey::H1 => "h1",
            QuestionKey::H2 => "h2",
            QuestionKey::H3 => "h3",
            QuestionKey::H4 => "h4",
            QuestionKey::M1 => "m1",
            QuestionKey::M2 => "m2",
        }
    }
}

impl fmt::Display for QuestionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a questionnaire submission was rejected.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum QuestionnaireError {
    #[error("missing answer for {0}")]
    Missing(QuestionKey),

    #[error("unrecognized answer for {key}: {value:?}")]
    Unrecognized { key: QuestionKey, value: String },

    #[error("malformed number for {field} in {key}: {value:?}")]
    MalformedNumber {
        key: QuestionKey,
        field: String,
        value: String,
    },
}

/// Raw answers as submitted by the client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuestionnaireAnswers {
    pub g1: Option<String>,
    pub g2: Option<String>,
    pub h1: Option<String>,
    pub h2: Option<String>,
    pub h3: Option<String>,
    pub h4: Option<String>,
    pub m1: Option<String>,
    pub m2: Option<String>,
}

impl QuestionnaireAnswers {
    pub fn get(&self, key: QuestionKey) -> Option<&str> {
        let answer = match key {
            QuestionKey::G1 => &self.g1,
            QuestionKey::G2 => &self.g2,
            QuestionKey::H1 => &self.h1,
            QuestionKey::H2 => &self.h2,
            QuestionKey::H3 => &self.h3,
            QuestionKey::H4 => &self.h4,
            QuestionKey::M1 => &self.m1,
            QuestionKey::M2 => &self.m2,
        };
        answer.as_deref().map(str::trim).filter(|a| !a.is_empty())
    }

    /// Non-empty answer for `key`, or [`QuestionnaireError::Missing`].
    pub fn require(&self, key: QuestionKey) -> Result<&str, QuestionnaireError> {
        self.get(key).ok_or(QuestionnaireError::Missing(key))
    }
}
