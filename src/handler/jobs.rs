// handler/jobs.rs
use std::sync::Arc;

use axum::{
    extract::Path,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dtos::jobdtos::*,
    error::HttpError,
    middleware::AuthPrincipal,
    AppState,
};

pub fn jobs_handler() -> Router {
    Router::new()
        .route("/jobs", post(create_job))
        .route("/jobs/mine", get(get_my_jobs))
        .route(
            "/jobs/:job_id",
            get(get_job).put(update_job).delete(delete_job),
        )
        .route("/jobs/:job_id/history", get(get_job_history))
        .route("/jobs/:job_id/apply", post(apply_to_job))
        .route("/jobs/:job_id/applications", get(get_job_applications))
        .route("/jobs/:job_id/accept/:worker_id", post(accept_application))
        .route("/jobs/:job_id/reject/:worker_id", post(reject_application))
        .route("/jobs/:job_id/complete", post(complete_job))
        .route("/jobs/:job_id/reset", post(reset_job))
        .route("/applications/mine", get(get_my_applications))
}

pub async fn create_job(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<AuthPrincipal>,
    Json(body): Json<CreateJobDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let new_job = body.into_new_job().map_err(HttpError::bad_request)?;
    let job = app_state.state_machine.create_job(auth.user_id, new_job).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success("Job created successfully", job)),
    ))
}

pub async fn get_my_jobs(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<AuthPrincipal>,
) -> Result<impl IntoResponse, HttpError> {
    let jobs = app_state.state_machine.employer_jobs(auth.user_id).await?;

    Ok(Json(ApiResponse::success("Jobs retrieved successfully", jobs)))
}

pub async fn get_job(
    Extension(app_state): Extension<Arc<AppState>>,
    Path(job_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let job = app_state.state_machine.get_job(job_id).await?;

    Ok(Json(ApiResponse::success("Job retrieved successfully", job)))
}

pub async fn update_job(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<AuthPrincipal>,
    Path(job_id): Path<Uuid>,
    Json(body): Json<UpdateJobDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let edit = body.into_edit().map_err(HttpError::bad_request)?;
    let job = app_state
        .state_machine
        .update_job(job_id, auth.user_id, edit)
        .await?;

    Ok(Json(ApiResponse::success("Job updated successfully", job)))
}

pub async fn delete_job(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<AuthPrincipal>,
    Path(job_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    app_state.state_machine.delete_job(job_id, auth.user_id).await?;

    Ok(Json(ApiResponse::<()>::message("Job deleted successfully")))
}

pub async fn get_job_history(
    Extension(app_state): Extension<Arc<AppState>>,
    Path(job_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let history = app_state.state_machine.history(job_id).await?;

    Ok(Json(ApiResponse::success("Job history retrieved successfully", history)))
}

pub async fn apply_to_job(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<AuthPrincipal>,
    Path(job_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let application = app_state.workflow.apply_to_job(job_id, auth.user_id).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success("Application submitted successfully", application)),
    ))
}

pub async fn get_job_applications(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<AuthPrincipal>,
    Path(job_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let applications = app_state
        .workflow
        .applications_for_job(job_id, auth.user_id)
        .await?;

    Ok(Json(ApiResponse::success("Applications retrieved successfully", applications)))
}

pub async fn get_my_applications(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<AuthPrincipal>,
) -> Result<impl IntoResponse, HttpError> {
    let applications = app_state.workflow.applications_for_worker(auth.user_id).await?;

    Ok(Json(ApiResponse::success("Applications retrieved successfully", applications)))
}

pub async fn accept_application(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<AuthPrincipal>,
    Path((job_id, worker_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, HttpError> {
    let accepted = app_state
        .workflow
        .accept_application(job_id, worker_id, auth.user_id)
        .await?;

    Ok(Json(ApiResponse::success("Worker accepted successfully", accepted)))
}

pub async fn reject_application(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<AuthPrincipal>,
    Path((job_id, worker_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, HttpError> {
    let application = app_state
        .workflow
        .reject_application(job_id, worker_id, auth.user_id)
        .await?;

    Ok(Json(ApiResponse::success("Application rejected", application)))
}

pub async fn complete_job(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<AuthPrincipal>,
    Path(job_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let job = app_state.workflow.complete_job(job_id, auth.user_id).await?;

    Ok(Json(ApiResponse::success("Job completed successfully", job)))
}

pub async fn reset_job(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<AuthPrincipal>,
    Path(job_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let job = app_state.workflow.reset_job(job_id, auth.user_id).await?;

    Ok(Json(ApiResponse::success("Job reopened successfully", job)))
}
