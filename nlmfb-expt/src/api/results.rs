//! Results submission

use axum::{extract::State, Json};
use nlmfb_common::time::now;
use serde_json::{json, Value};
use tracing::info;

use super::participant_id;
use crate::db::participants;
use crate::services::{partition_results, save_json_results, store_results};
use crate::{ApiError, ApiResult, AppState};

/// POST /save_results/
///
/// Backs up the raw submission, stores it, then credits crowdsourced
/// workers. `success` reports whether crediting worked.
pub async fn save_results(
    State(state): State<AppState>,
    Json(post): Json<Value>,
) -> ApiResult<Json<Value>> {
    save_json_results(&state.results_dir, &post, now()).await?;

    let ppt_id = participant_id(&post)?;
    let participant = participants::get_participant(&state.db, ppt_id).await?;

    let events = post
        .get("results")
        .and_then(Value::as_array)
        .ok_or_else(|| ApiError::BadRequest("results must be a list of trial events".to_string()))?;
    let partitioned = partition_results(events)?;
    store_results(&state.db, ppt_id, &partitioned, now()).await?;
    info!(ppt_id, events = events.len(), "Results saved");

    let success = if !participant.worker_id.is_empty() || !participant.assignment_id.is_empty() {
        let outcome = state.mturk.block_worker(&participant.worker_id).await;
        participants::append_note(&state.db, ppt_id, &outcome.note).await?;
        outcome.success
    } else {
        true
    };

    Ok(Json(json!({"success": success})))
}
