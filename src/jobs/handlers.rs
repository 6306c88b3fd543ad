use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{instrument, warn};

use super::{
    dto::{CreateJobRequest, JobResponse, ListJobsQuery, UpdateJobRequest},
    services,
};
use crate::{
    auth::{extractors::AuthUser, handlers::json_body},
    error::{AppError, AppResult},
    state::AppState,
};

pub fn job_routes() -> Router<AppState> {
    Router::new()
        .route("/jobs", get(list_jobs).post(create_job))
        .route("/jobs/:id", get(get_job).put(update_job).delete(delete_job))
}

#[instrument(skip(state, query))]
pub async fn list_jobs(
    State(state): State<AppState>,
    user: AuthUser,
    query: Result<Query<ListJobsQuery>, QueryRejection>,
) -> AppResult<Json<Vec<JobResponse>>> {
    let Query(q) = query.map_err(|e| {
        warn!(error = %e, "rejected query string");
        AppError::Validation("Invalid status filter.".into())
    })?;
    let jobs = services::list_jobs(state.jobs.as_ref(), user, q.status.as_deref()).await?;
    Ok(Json(jobs.into_iter().map(JobResponse::from).collect()))
}

#[instrument(skip(state, body))]
pub async fn create_job(
    State(state): State<AppState>,
    user: AuthUser,
    body: Result<Json<CreateJobRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<JobResponse>)> {
    let job = services::create_job(state.jobs.as_ref(), user, json_body(body)?).await?;
    Ok((StatusCode::CREATED, Json(job.into())))
}

#[instrument(skip(state))]
pub async fn get_job(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<JobResponse>> {
    let id = services::parse_job_id(&id)?;
    let job = services::get_job(state.jobs.as_ref(), user, id).await?;
    Ok(Json(job.into()))
}

#[instrument(skip(state, body))]
pub async fn update_job(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    body: Result<Json<UpdateJobRequest>, JsonRejection>,
) -> AppResult<Json<JobResponse>> {
    let id = services::parse_job_id(&id)?;
    let job = services::update_job(state.jobs.as_ref(), user, id, json_body(body)?).await?;
    Ok(Json(job.into()))
}

#[instrument(skip(state))]
pub async fn delete_job(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    let id = services::parse_job_id(&id)?;
    services::delete_job(state.jobs.as_ref(), user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
