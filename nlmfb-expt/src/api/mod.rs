//! HTTP API handlers for nlmfb-expt

pub mod auth;
pub mod download;
pub mod expt;
pub mod health;
pub mod results;
pub mod session;

pub use auth::admin_auth_middleware;
pub use download::download_data;
pub use expt::{error_page, expt, serve_expt_js};
pub use health::health_routes;
pub use results::save_results;
pub use session::{ua_data, validate_captcha};

use crate::{ApiError, ApiResult};
use serde_json::Value;

/// Participant id from a posted JSON body (number or numeric string)
pub(crate) fn participant_id(post: &Value) -> ApiResult<i64> {
    match post.get("ppt_id") {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    }
    .ok_or_else(|| ApiError::BadRequest("ppt_id is missing or not an integer".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_participant_id_forms() {
        assert_eq!(participant_id(&json!({"ppt_id": 12})).unwrap(), 12);
        assert_eq!(participant_id(&json!({"ppt_id": "12"})).unwrap(), 12);
        assert!(matches!(participant_id(&json!({})), Err(ApiError::BadRequest(_))));
        assert!(matches!(participant_id(&json!({"ppt_id": "x"})), Err(ApiError::BadRequest(_))));
    }
}
