//! nlmfb-expt library - experiment web service
//!
//! Serves the passage comprehension experiment to participants, records
//! their device details, CAPTCHA score and results, credits crowdsourced
//! workers, and lets administrators download the collected data as CSV.

use axum::{middleware, routing::get, routing::post, Router};
use nlmfb_common::StimulusSet;
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod db;
pub mod error;
pub mod services;

pub use error::{ApiError, ApiResult};

use services::{CaptchaClient, MturkClient};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Experiment items, loaded once at startup
    pub stimuli: Arc<StimulusSet>,
    /// Raw JSON backups of submissions
    pub results_dir: PathBuf,
    pub captcha: Arc<CaptchaClient>,
    pub mturk: Arc<MturkClient>,
    /// Public CAPTCHA key embedded in the experiment page
    pub captcha_site_key: Option<String>,
    /// Server start, for health uptime
    pub startup_time: Instant,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        stimuli: StimulusSet,
        results_dir: PathBuf,
        captcha: CaptchaClient,
        mturk: MturkClient,
        captcha_site_key: Option<String>,
    ) -> Self {
        Self {
            db,
            stimuli: Arc::new(stimuli),
            results_dir,
            captcha: Arc::new(captcha),
            mturk: Arc::new(mturk),
            captcha_site_key: captcha_site_key.filter(|k| !k.trim().is_empty()),
            startup_time: Instant::now(),
        }
    }
}

/// Build application router
///
/// Data downloads require an administrator; everything else is public.
pub fn build_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/data/:model/", get(api::download_data))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::admin_auth_middleware,
        ));

    let public = Router::new()
        .route("/expt", get(api::expt))
        .route("/error", get(api::error_page))
        .route("/ua_data/", post(api::ua_data))
        .route("/validate_captcha/", post(api::validate_captcha))
        .route("/save_results/", post(api::save_results))
        .route("/static/nlm_fb.js", get(api::serve_expt_js))
        .merge(api::health_routes());

    Router::new()
        .merge(protected)
        .merge(public)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
