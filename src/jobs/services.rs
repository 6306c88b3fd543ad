use tracing::{info, warn};

use super::{
    dto::{parse_application_date, CreateJobRequest, UpdateJobRequest},
    repo::JobStore,
    repo_types::{Job, JobPatch, JobStatus, NewJob},
};
use crate::{
    auth::extractors::AuthUser,
    error::{AppError, AppResult, JOB_NOT_FOUND},
};

fn invalid(msg: &str) -> AppError {
    AppError::Validation(msg.into())
}

fn parse_status(raw: &str) -> AppResult<JobStatus> {
    raw.parse().map_err(|_| invalid("Invalid status."))
}

fn parse_date(raw: &str) -> AppResult<time::Date> {
    parse_application_date(raw).ok_or_else(|| invalid("Invalid applicationDate."))
}

/// Parses a raw `:id` path segment.
pub fn parse_job_id(raw: &str) -> AppResult<i64> {
    raw.parse::<i64>().map_err(|_| invalid("Invalid job id."))
}

/// Resolves a job only if `user` owns it. A missing record and a record owned
/// by someone else are reported identically.
pub async fn find_owned(jobs: &dyn JobStore, user: AuthUser, id: i64) -> AppResult<Job> {
    match jobs.find_by_id(id).await? {
        Some(job) if job.user_id == user.0 => Ok(job),
        Some(_) => {
            warn!(user_id = %user.0, job_id = id, "job owned by another user");
            Err(AppError::NotFound(JOB_NOT_FOUND))
        }
        None => Err(AppError::NotFound(JOB_NOT_FOUND)),
    }
}

pub async fn list_jobs(
    jobs: &dyn JobStore,
    user: AuthUser,
    status: Option<&str>,
) -> AppResult<Vec<Job>> {
    let status = match status.filter(|s| !s.is_empty()) {
        Some(raw) => Some(
            raw.parse::<JobStatus>()
                .map_err(|_| invalid("Invalid status filter."))?,
        ),
        None => None,
    };
    Ok(jobs.list(user.0, status).await?)
}

pub async fn create_job(
    jobs: &dyn JobStore,
    user: AuthUser,
    req: CreateJobRequest,
) -> AppResult<Job> {
    let non_empty = |v: Option<String>| v.filter(|s| !s.is_empty());
    let (Some(company_name), Some(job_title), Some(status)) = (
        non_empty(req.company_name),
        non_empty(req.job_title),
        non_empty(req.status),
    ) else {
        return Err(invalid("companyName, jobTitle, and status are required."));
    };

    let status = parse_status(&status)?;
    let application_date = match non_empty(req.application_date) {
        Some(raw) => Some(parse_date(&raw)?),
        None => None,
    };

    let job = jobs
        .create(NewJob {
            user_id: user.0,
            company_name,
            job_title,
            status,
            application_date,
            notes: req.notes,
        })
        .await?;
    info!(user_id = %user.0, job_id = job.id, "job created");
    Ok(job)
}

pub async fn get_job(jobs: &dyn JobStore, user: AuthUser, id: i64) -> AppResult<Job> {
    find_owned(jobs, user, id).await
}

pub async fn update_job(
    jobs: &dyn JobStore,
    user: AuthUser,
    id: i64,
    req: UpdateJobRequest,
) -> AppResult<Job> {
    find_owned(jobs, user, id).await?;

    let status = match req.status {
        None => None,
        Some(Some(raw)) => Some(parse_status(&raw)?),
        Some(None) => return Err(invalid("Invalid status.")),
    };
    let application_date = match req.application_date {
        None => None,
        Some(raw) => match raw.filter(|s| !s.is_empty()) {
            Some(raw) => Some(Some(parse_date(&raw)?)),
            None => Some(None),
        },
    };

    let patch = JobPatch {
        company_name: req.company_name,
        job_title: req.job_title,
        status,
        application_date,
        notes: req.notes,
    };
    let job = jobs
        .update(id, patch)
        .await?
        .ok_or(AppError::NotFound(JOB_NOT_FOUND))?;
    info!(user_id = %user.0, job_id = id, "job updated");
    Ok(job)
}

pub async fn delete_job(jobs: &dyn JobStore, user: AuthUser, id: i64) -> AppResult<()> {
    find_owned(jobs, user, id).await?;
    if !jobs.delete(id).await? {
        return Err(AppError::NotFound(JOB_NOT_FOUND));
    }
    info!(user_id = %user.0, job_id = id, "job deleted");
    Ok(())
}
