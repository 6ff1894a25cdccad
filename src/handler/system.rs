// handler/system.rs
use std::sync::Arc;

use axum::{response::IntoResponse, routing::post, Extension, Json, Router};
use chrono::Utc;

use crate::{
    dtos::jobdtos::{ApiResponse, SweepResultDto},
    error::HttpError,
    AppState,
};

pub fn system_handler() -> Router {
    Router::new().route("/jobs/expire-handover", post(expire_handover))
}

/// On-demand run of the handover sweep.
pub async fn expire_handover(
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let jobs = app_state.sweeper.sweep(Utc::now()).await?;

    Ok(Json(ApiResponse::success(
        "Handover sweep completed",
        SweepResultDto {
            expired_count: jobs.len(),
            jobs,
        },
    )))
}
