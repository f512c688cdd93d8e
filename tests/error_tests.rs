// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::http::StatusCode;
use axum::response::IntoResponse;
use pacekeeper::error::AppError;
use pacekeeper::models::questionnaire::{QuestionKey, QuestionnaireError};

async fn error_body(err: AppError) -> (StatusCode, serde_json::Value) {
    let response = err.into_response();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_client_errors_carry_details() {
    let (status, body) = error_body(AppError::Conflict("Username already taken".into())).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");
    assert_eq!(body["details"], "Username already taken");

    let (status, body) =
        error_body(QuestionnaireError::Missing(QuestionKey::H3).into()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_answer");
    assert_eq!(body["details"], "missing answer for h3");
}

#[tokio::test]
async fn test_server_errors_hide_details() {
    let (status, body) = error_body(AppError::Database("connection reset".into())).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "database_error");
    assert!(body.get("details").is_none());

    let (status, body) = error_body(anyhow::anyhow!("join error").into()).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "internal_error");
    assert!(body.get("details").is_none());
}

#[tokio::test]
async fn test_auth_errors_are_unauthorized() {
    for err in [AppError::Unauthorized, AppError::InvalidToken] {
        let (status, _) = error_body(err).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
