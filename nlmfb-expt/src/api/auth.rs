//! Administrator authentication middleware
//!
//! Protected routes take HTTP Basic credentials that must match a
//! superuser in the `admins` table.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use nlmfb_common::auth::verify_password;
use serde_json::json;
use tracing::{debug, warn};

use crate::db::admins::find_admin;
use crate::AppState;

const REALM: &str = "Basic realm=\"nlm_fb\"";

/// Authentication middleware for admin-only routes
pub async fn admin_auth_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let (username, password) = basic_credentials(request.headers())?;

    let admin = find_admin(&state.db, &username)
        .await
        .map_err(|e| AuthError::Other(e.to_string()))?
        .ok_or_else(|| {
            warn!(username = %username, "Login attempt for unknown admin");
            AuthError::InvalidCredentials
        })?;

    if !verify_password(&password, &admin.password_salt, &admin.password_hash) {
        warn!(username = %username, "Admin password rejected");
        return Err(AuthError::InvalidCredentials);
    }
    if !admin.is_superuser {
        warn!(username = %username, "Admin is not a superuser");
        return Err(AuthError::NotSuperuser);
    }

    debug!(username = %username, "Admin authenticated");
    Ok(next.run(request).await)
}

/// Decode `Authorization: Basic <base64(user:pass)>`
fn basic_credentials(headers: &HeaderMap) -> Result<(String, String), AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingCredentials)?;

    let encoded = value
        .strip_prefix("Basic ")
        .ok_or(AuthError::MissingCredentials)?;
    let decoded = STANDARD
        .decode(encoded.trim())
        .map_err(|_| AuthError::MalformedCredentials)?;
    let decoded = String::from_utf8(decoded).map_err(|_| AuthError::MalformedCredentials)?;

    let (username, password) = decoded
        .split_once(':')
        .ok_or(AuthError::MalformedCredentials)?;
    Ok((username.to_string(), password.to_string()))
}

/// Authentication error types for HTTP responses
#[derive(Debug)]
pub enum AuthError {
    MissingCredentials,
    MalformedCredentials,
    InvalidCredentials,
    NotSuperuser,
    Other(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let message = match self {
            AuthError::MissingCredentials => "Authentication required".to_string(),
            AuthError::MalformedCredentials => "Malformed Basic credentials".to_string(),
            AuthError::InvalidCredentials => "Invalid username or password".to_string(),
            AuthError::NotSuperuser => "Administrator access required".to_string(),
            AuthError::Other(msg) => {
                tracing::error!("Authentication error: {}", msg);
                let body = Json(json!({
                    "error": {"code": "INTERNAL_ERROR", "message": format!("Authentication error: {}", msg)}
                }));
                return (StatusCode::INTERNAL_SERVER_ERROR, body).into_response();
            }
        };

        let body = Json(json!({
            "error": {"code": "UNAUTHORIZED", "message": message}
        }));

        (
            StatusCode::UNAUTHORIZED,
            [(header::WWW_AUTHENTICATE, REALM)],
            body,
        )
            .into_response()
    }
}
