//! Participant session updates posted by the experiment page

use axum::{extract::State, Json};
use nlmfb_common::db::DeviceInfo;
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::participant_id;
use crate::db::participants;
use crate::services::{CaptchaClient, CaptchaError};
use crate::{ApiError, ApiResult, AppState};

/// POST /ua_data/
///
/// Sent once the page is fullscreen, so the screen size is the real one.
/// The whole post is appended to the participant's notes.
pub async fn ua_data(
    State(state): State<AppState>,
    Json(post): Json<Value>,
) -> ApiResult<Json<Value>> {
    let ppt_id = participant_id(&post)?;

    let field = |key: &str| match post.get(key) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    };
    let device = DeviceInfo {
        ua_header: field("ua_header"),
        screen_width: field("width"),
        screen_height: field("height"),
        worker_id: field("worker_id"),
        assignment_id: field("assignment_id"),
    };

    participants::update_device(&state.db, ppt_id, &device, &post.to_string()).await?;
    debug!(ppt_id, worker_id = %device.worker_id, "Recorded device details");

    Ok(Json(json!({"success": true})))
}

/// POST /validate_captcha/
///
/// Verifies the page's CAPTCHA token, stores the score and relays the
/// provider's answer.
pub async fn validate_captcha(
    State(state): State<AppState>,
    Json(post): Json<Value>,
) -> ApiResult<Json<Value>> {
    let ppt_id = participant_id(&post)?;
    // Fail on unknown participants before calling out
    participants::get_participant(&state.db, ppt_id).await?;

    let token = post.get("token").and_then(Value::as_str);
    let verdict = state.captcha.verify(token).await.map_err(|e| match e {
        CaptchaError::NotConfigured => ApiError::Internal(e.to_string()),
        other => {
            warn!(ppt_id, "CAPTCHA verification failed: {}", other);
            ApiError::Upstream(other.to_string())
        }
    })?;

    let score = CaptchaClient::score(&verdict);
    participants::set_captcha_score(&state.db, ppt_id, score).await?;
    debug!(ppt_id, ?score, "Stored CAPTCHA score");

    Ok(Json(verdict))
}
