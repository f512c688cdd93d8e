// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use chrono::{SubsecRound, Utc};
use pacekeeper::config::Config;
use pacekeeper::db::{Database, FirestoreDb, MemoryDb, Store};
use pacekeeper::middleware::auth::create_jwt;
use pacekeeper::models::User;
use pacekeeper::routes::create_router;
use pacekeeper::AppState;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Create a test app backed by in-memory storage.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (Router, Arc<AppState>) {
    create_test_app_with_config(Config::test_default())
}

#[allow(dead_code)]
pub fn create_test_app_with_config(config: Config) -> (Router, Arc<AppState>) {
    let state = Arc::new(AppState::new(config, Database::Memory(MemoryDb::new())));
    (create_router(state.clone()), state)
}

/// Insert a user directly into storage and return a session token for it.
#[allow(dead_code)]
pub async fn create_test_user(state: &AppState, username: &str) -> (Uuid, String) {
    let user = User {
        user_id: Uuid::new_v4(),
        username: username.to_string(),
        password_hash: "unused".to_string(),
        third_party_id: None,
        created_at: Utc::now().trunc_subsecs(0),
    };
    state.db.create_user(&user).await.unwrap();
    let token = create_jwt(user.user_id, &state.config.jwt_signing_key).unwrap();
    (user.user_id, token)
}

/// Send a request and decode the JSON response body (`Null` when empty).
#[allow(dead_code)]
pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    // Extractor rejections from axum itself are plain text.
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, json)
}

/// Questionnaire answers for a speed-focused runner who ran within the
/// last week.
#[allow(dead_code)]
pub fn speed_runner_answers() -> Value {
    json!({
        "g1": "Faster speed",
        "g2": "Yes (Additional: distance=10.0, speed=5)",
        "h1": "Within a week",
        "h2": "3~10km",
        "h3": "5~7",
        "h4": "kg (Additional: weight=65)",
        "m1": "No",
        "m2": "Yes"
    })
}

/// Activity request body.
#[allow(dead_code)]
pub fn activity_body(start_time: &str, distance_km: f64, pace: u32) -> Value {
    json!({
        "start_time": start_time,
        "duration_seconds": (distance_km * pace as f64) as u32,
        "distance_km": distance_km,
        "average_pace_seconds_per_km": pace
    })
}
