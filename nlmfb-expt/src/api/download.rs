//! Data download for administrators

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use nlmfb_common::db::ExportEntity;
use nlmfb_common::time::{file_timestamp, now};
use tracing::info;

use crate::db::export::export_csv;
use crate::{ApiError, ApiResult, AppState};

/// GET /data/:model/
///
/// Downloads every record of `model` (participant, critical,
/// attention_check) as a CSV attachment.
pub async fn download_data(
    State(state): State<AppState>,
    Path(model): Path<String>,
) -> ApiResult<Response> {
    let entity = ExportEntity::from_name(&model)
        .ok_or_else(|| ApiError::NotFound(format!("unknown model '{}'", model)))?;

    let body = export_csv(&state.db, entity).await?;
    let filename = format!("nlm_fb_{}_{}.csv", entity.name(), file_timestamp(now()));
    info!(model = entity.name(), bytes = body.len(), "Data download");

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        body,
    )
        .into_response())
}
