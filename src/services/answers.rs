// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Parser for free-text answers with an embedded `(Additional: ...)` suffix.
//!
//! Grammar:
//!
//! ```text
//! answer     := text [ "(Additional:" fields [ ")" ] ]
//! fields     := field { "," field }
//! field      := key "=" value
//! ```
//!
//! The marker is matched case-insensitively. Keys are trimmed and
//! lower-cased. `distance`, `goal` and `weight` must parse as floats,
//! `speed` as an integer (minutes per km); any other key is kept as a
//! string. Empty segments and segments without `=` are skipped.

use std::collections::HashMap;

use crate::models::questionnaire::{QuestionKey, QuestionnaireError};

const ADDITIONAL_MARKER: &str = "(additional:";

/// Value of one embedded field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Float(f64),
    Int(i64),
    Text(String),
}

/// An answer split into its categorical head and embedded fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedAnswer {
    /// The answer with the suffix removed, trimmed and lower-cased.
    pub head: String,
    pub fields: HashMap<String, FieldValue>,
}

impl ParsedAnswer {
    /// Numeric field as `f64` (integers are widened).
    pub fn number(&self, key: &str) -> Option<f64> {
        match self.fields.get(key)? {
            FieldValue::Float(v) => Some(*v),
            FieldValue::Int(v) => Some(*v as f64),
            FieldValue::Text(_) => None,
        }
    }

    /// Numeric field that is finite and strictly positive.
    pub fn positive(&self, key: &str) -> Option<f64> {
        self.number(key).filter(|v| v.is_finite() && *v > 0.0)
    }

    pub fn int(&self, key: &str) -> Option<i64> {
        match self.fields.get(key)? {
            FieldValue::Int(v) => Some(*v),
            _ => None,
        }
    }
}

/// Parse one answer. `key` is only used for error reporting.
pub fn parse_answer(key: QuestionKey, raw: &str) -> Result<ParsedAnswer, QuestionnaireError> {
    let lowered = raw.to_lowercase();
    let Some(start) = lowered.find(ADDITIONAL_MARKER) else {
        return Ok(ParsedAnswer {
            head: lowered.trim().to_string(),
            fields: HashMap::new(),
        });
    };

    let head = lowered[..start].trim().to_string();
    // Offsets into `lowered` are only valid for `raw` when it is ASCII.
    let body_source = if raw.is_ascii() { raw } else { &lowered };
    let body = &body_source[start + ADDITIONAL_MARKER.len()..];
    let body = body.rfind(')').map_or(body, |end| &body[..end]);

    let mut fields = HashMap::new();
    for segment in body.split(',') {
        let Some((name, value)) = segment.split_once('=') else {
            if !segment.trim().is_empty() {
                tracing::debug!(%key, segment = segment.trim(), "Ignoring field without '='");
            }
            continue;
        };
        let name = name.trim().to_lowercase();
        let value = value.trim();
        if name.is_empty() {
            continue;
        }
        let parsed = coerce(key, &name, value)?;
        fields.insert(name, parsed);
    }

    Ok(ParsedAnswer { head, fields })
}

fn coerce(key: QuestionKey, name: &str, value: &str) -> Result<FieldValue, QuestionnaireError> {
    let malformed = || QuestionnaireError::MalformedNumber {
        key,
        field: name.to_string(),
        value: value.to_string(),
    };

    match name {
        "distance" | "goal" | "weight" => value
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(FieldValue::Float)
            .ok_or_else(malformed),
        "speed" => value.parse::<i64>().map(FieldValue::Int).map_err(|_| malformed()),
        _ => Ok(FieldValue::Text(value.to_string())),
    }
}
