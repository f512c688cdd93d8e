// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account routes: registration, password login, logout.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use uuid::Uuid;
use validator::Validate;

use crate::db::Store;
use crate::error::{AppError, Result};
use crate::middleware::auth::{create_jwt, SESSION_COOKIE, SESSION_TTL_SECS};
use crate::models::User;
use crate::routes::validated;
use crate::services::password::{hash_password, verify_password};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", get(logout).post(logout))
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[serde(default)]
    #[validate(length(min = 1, max = 64, message = "Username is required"))]
    pub username: String,
    // bcrypt only looks at the first 72 bytes.
    #[serde(default)]
    #[validate(length(min = 1, max = 72, message = "Password is required"))]
    pub password: String,
    #[validate(length(min = 1, max = 128))]
    pub third_party_id: Option<String>,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct RegisterResponse {
    pub user_id: Uuid,
    pub username: String,
}

/// Create an account.
async fn register(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RegisterResponse>)> {
    let request = validated(payload)?;
    let username = request.username.trim().to_string();
    if username.is_empty() {
        return Err(AppError::BadRequest("Username is required".to_string()));
    }

    // Cheap check first so a taken name does not pay for a bcrypt hash.
    if state.db.get_user_by_username(&username).await?.is_some() {
        return Err(AppError::Conflict("Username already taken".to_string()));
    }

    let password_hash = hash_password(&request.password, state.config.bcrypt_cost).await?;
    let user = User {
        user_id: Uuid::new_v4(),
        username,
        password_hash,
        third_party_id: request.third_party_id,
        created_at: Utc::now().trunc_subsecs(0),
    };
    state.db.create_user(&user).await?;

    tracing::info!(user_id = %user.user_id, username = %user.username, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user_id: user.user_id,
            username: user.username,
        }),
    ))
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct LoginResponse {
    pub user_id: Uuid,
    pub token: String,
}

/// Password login. Returns the session token and also sets it as a cookie.
async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    payload: std::result::Result<Json<LoginRequest>, JsonRejection>,
) -> Result<(CookieJar, Json<LoginResponse>)> {
    let request = validated(payload)?;

    let Some(user) = state.db.get_user_by_username(request.username.trim()).await? else {
        tracing::info!("Login for unknown username");
        return Err(AppError::Unauthorized);
    };

    if !verify_password(&request.password, &user.password_hash).await? {
        tracing::info!(user_id = %user.user_id, "Login with wrong password");
        return Err(AppError::Unauthorized);
    }

    let token = create_jwt(user.user_id, &state.config.jwt_signing_key)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("JWT creation failed: {}", e)))?;

    tracing::info!(user_id = %user.user_id, "User logged in");

    let cookie = session_cookie(token.clone(), &state.config.frontend_url);
    Ok((
        jar.add(cookie),
        Json(LoginResponse {
            user_id: user.user_id,
            token,
        }),
    ))
}

/// Logout - clear the session cookie.
async fn logout(State(state): State<Arc<AppState>>, jar: CookieJar) -> (StatusCode, CookieJar) {
    let removal = session_cookie(String::new(), &state.config.frontend_url);
    (StatusCode::NO_CONTENT, jar.remove(removal))
}

/// Session cookie with attributes matching the deployment. Removal must use
/// the same attributes or browsers keep the original cookie.
fn session_cookie(token: String, frontend_url: &str) -> Cookie<'static> {
    let secure = frontend_url.starts_with("https://");
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(time::Duration::seconds(SESSION_TTL_SECS as i64))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_cookie_secure_only_over_https() {
        let local = session_cookie("t".to_string(), "http://localhost:5173");
        assert_eq!(local.secure(), Some(false));
        assert_eq!(local.http_only(), Some(true));

        let prod = session_cookie("t".to_string(), "https://pacekeeper.app");
        assert_eq!(prod.secure(), Some(true));
        assert_eq!(prod.path(), Some("/"));
    }

    #[test]
    fn test_register_request_requires_fields() {
        let missing: RegisterRequest = serde_json::from_str(r#"{"username": "alice"}"#).unwrap();
        assert!(missing.validate().is_err());

        let ok: RegisterRequest =
            serde_json::from_str(r#"{"username": "alice", "password": "pw"}"#).unwrap();
        assert!(ok.validate().is_ok());
    }
}
