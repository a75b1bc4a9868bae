//! Experiment page
//!
//! `GET /expt?item_id=...` registers a new participant and serves the page
//! that runs the jsPsych timeline for one stimulus item.

use axum::{
    extract::{ConnectInfo, Query, RawQuery, State},
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
};
use nlmfb_common::db::NewParticipant;
use nlmfb_common::keys::generate_key;
use serde::Serialize;
use serde_json::json;
use std::net::SocketAddr;
use tracing::{info, warn};

use crate::db::participants;
use crate::{ApiResult, AppState};

const EXPT_HTML: &str = include_str!("../../static/expt.html");
const ERROR_HTML: &str = include_str!("../../static/error.html");
const EXPT_JS: &str = include_str!("../../static/nlm_fb.js");

/// Values handed to the page script
#[derive(Debug, Serialize)]
struct PageConf {
    ppt_id: i64,
    key: String,
}

/// GET /expt
pub async fn expt(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    RawQuery(raw_query): RawQuery,
    Query(params): Query<Vec<(String, String)>>,
) -> ApiResult<Response> {
    let item_id = last_param(&params, "item_id").unwrap_or("None");
    let item = match state.stimuli.get(item_id) {
        Ok(item) => item,
        Err(e) => {
            warn!("Refusing experiment request: {}", e);
            return Ok((StatusCode::NOT_FOUND, Html(ERROR_HTML)).into_response());
        }
    };

    let new_participant = NewParticipant {
        ip_address: client_ip(&headers, connect_info.map(|ConnectInfo(addr)| addr)),
        key: generate_key(),
        get_args: raw_query.unwrap_or_default(),
        study: last_param(&params, "study").unwrap_or_default().to_string(),
    };
    let ppt_id =
        participants::insert_participant(&state.db, &new_participant, nlmfb_common::time::now())
            .await?;
    info!(ppt_id, item_id, study = %new_participant.study, "New participant");

    let conf = PageConf {
        ppt_id,
        key: new_participant.key,
    };
    let page = render_expt_page(
        &serde_json::to_string(item).map_err(nlmfb_common::Error::from)?,
        &serde_json::to_string(&conf).map_err(nlmfb_common::Error::from)?,
        state.captcha_site_key.as_deref(),
    );

    Ok(Html(page).into_response())
}

/// GET /error
pub async fn error_page() -> Html<&'static str> {
    Html(ERROR_HTML)
}

/// GET /static/nlm_fb.js
pub async fn serve_expt_js() -> Response {
    (
        StatusCode::OK,
        [("content-type", "application/javascript")],
        EXPT_JS,
    )
        .into_response()
}

/// Last value of a possibly repeated query parameter
fn last_param<'a>(params: &'a [(String, String)], name: &str) -> Option<&'a str> {
    params
        .iter()
        .rev()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.as_str())
}

/// First `X-Forwarded-For` hop, else the socket peer, else empty
fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    if let Some(forwarded) = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
    {
        return forwarded.split(',').next().unwrap_or_default().to_string();
    }

    peer.map(|addr| addr.ip().to_string()).unwrap_or_default()
}

fn render_expt_page(item_json: &str, conf_json: &str, captcha_site_key: Option<&str>) -> String {
    let site_key_json = json!(captcha_site_key).to_string();
    let captcha_script = match captcha_site_key {
        Some(key) => format!(
            r#"<script src="https://www.google.com/recaptcha/api.js?render={}"></script>"#,
            html_attr_escape(key)
        ),
        None => String::new(),
    };

    EXPT_HTML
        .replace("__CAPTCHA_SCRIPT__", &captcha_script)
        .replace("__ITEM_DATA__", &script_escape(item_json))
        .replace("__CONF__", &script_escape(conf_json))
        .replace("__CAPTCHA_SITE_KEY__", &script_escape(&site_key_json))
}

/// Make JSON safe to inline inside a `<script>` element
fn script_escape(json: &str) -> String {
    json.replace('<', "\\u003c")
        .replace('>', "\\u003e")
        .replace('&', "\\u0026")
}

fn html_attr_escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
