use std::collections::BTreeMap;

use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::repo_types::{Job, JobPatch, JobRow, JobStatus, NewJob};
use crate::error::StoreError;

/// Job record store. Lookups by id are unscoped; callers apply the ownership
/// filter in `jobs::services` before touching a record.
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<Job>, StoreError>;
    /// Owner's jobs, newest first.
    async fn list(&self, user_id: Uuid, status: Option<JobStatus>) -> Result<Vec<Job>, StoreError>;
    async fn create(&self, job: NewJob) -> Result<Job, StoreError>;
    /// Returns `None` when the record vanished before the update landed.
    async fn update(&self, id: i64, patch: JobPatch) -> Result<Option<Job>, StoreError>;
    async fn delete(&self, id: i64) -> Result<bool, StoreError>;
}

const JOB_COLUMNS: &str =
    "id, user_id, company_name, job_title, status, application_date, notes, created_at";

#[derive(Clone)]
pub struct PgJobStore {
    db: PgPool,
}

impl PgJobStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn into_jobs(rows: Vec<JobRow>) -> Result<Vec<Job>, StoreError> {
    rows.into_iter()
        .map(|r| Job::try_from(r).map_err(StoreError::from))
        .collect()
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn find_by_id(&self, id: i64) -> Result<Option<Job>, StoreError> {
        let row = sqlx::query_as::<_, JobRow>(&format!(
            "SELECT {JOB_COLUMNS} FROM jobs WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(Job::try_from).transpose()?)
    }

    async fn list(&self, user_id: Uuid, status: Option<JobStatus>) -> Result<Vec<Job>, StoreError> {
        let rows = sqlx::query_as::<_, JobRow>(&format!(
            r#"
            SELECT {JOB_COLUMNS}
            FROM jobs
            WHERE user_id = $1 AND ($2::TEXT IS NULL OR status = $2)
            ORDER BY created_at DESC, id DESC
            "#
        ))
        .bind(user_id)
        .bind(status.map(JobStatus::as_str))
        .fetch_all(&self.db)
        .await?;
        into_jobs(rows)
    }

    async fn create(&self, job: NewJob) -> Result<Job, StoreError> {
        let row = sqlx::query_as::<_, JobRow>(&format!(
            r#"
            INSERT INTO jobs (user_id, company_name, job_title, status, application_date, notes)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {JOB_COLUMNS}
            "#
        ))
        .bind(job.user_id)
        .bind(&job.company_name)
        .bind(&job.job_title)
        .bind(job.status.as_str())
        .bind(job.application_date)
        .bind(&job.notes)
        .fetch_one(&self.db)
        .await?;
        Ok(Job::try_from(row)?)
    }

    async fn update(&self, id: i64, patch: JobPatch) -> Result<Option<Job>, StoreError> {
        let row = sqlx::query_as::<_, JobRow>(&format!(
            r#"
            UPDATE jobs SET
                company_name     = COALESCE($2, company_name),
                job_title        = COALESCE($3, job_title),
                status           = COALESCE($4, status),
                application_date = CASE WHEN $5 THEN $6 ELSE application_date END,
                notes            = CASE WHEN $7 THEN $8 ELSE notes END
            WHERE id = $1
            RETURNING {JOB_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(patch.company_name)
        .bind(patch.job_title)
        .bind(patch.status.map(JobStatus::as_str))
        .bind(patch.application_date.is_some())
        .bind(patch.application_date.flatten())
        .bind(patch.notes.is_some())
        .bind(patch.notes.flatten())
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(Job::try_from).transpose()?)
    }

    async fn delete(&self, id: i64) -> Result<bool, StoreError> {
        let res = sqlx::query("DELETE FROM jobs WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}

#[derive(Default)]
struct MemoryJobs {
    next_id: i64,
    rows: BTreeMap<i64, Job>,
}

/// Process-local job store, used when no database is configured and in tests.
#[derive(Default)]
pub struct MemoryJobStore {
    inner: RwLock<MemoryJobs>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn find_by_id(&self, id: i64) -> Result<Option<Job>, StoreError> {
        Ok(self.inner.read().await.rows.get(&id).cloned())
    }

    async fn list(&self, user_id: Uuid, status: Option<JobStatus>) -> Result<Vec<Job>, StoreError> {
        let inner = self.inner.read().await;
        let mut jobs: Vec<Job> = inner
            .rows
            .values()
            .filter(|j| j.user_id == user_id)
            .filter(|j| status.map_or(true, |s| j.status == s))
            .cloned()
            .collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(jobs)
    }

    async fn create(&self, job: NewJob) -> Result<Job, StoreError> {
        let mut inner = self.inner.write().await;
        inner.next_id += 1;
        let job = Job {
            id: inner.next_id,
            user_id: job.user_id,
            company_name: job.company_name,
            job_title: job.job_title,
            status: job.status,
            application_date: job.application_date,
            notes: job.notes,
            created_at: OffsetDateTime::now_utc(),
        };
        inner.rows.insert(job.id, job.clone());
        Ok(job)
    }

    async fn update(&self, id: i64, patch: JobPatch) -> Result<Option<Job>, StoreError> {
        let mut inner = self.inner.write().await;
        Ok(inner.rows.get_mut(&id).map(|job| {
            patch.apply(job);
            job.clone()
        }))
    }

    async fn delete(&self, id: i64) -> Result<bool, StoreError> {
        Ok(self.inner.write().await.rows.remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_job(user_id: Uuid, company: &str, status: JobStatus) -> NewJob {
        NewJob {
            user_id,
            company_name: company.into(),
            job_title: "Engineer".into(),
            status,
            application_date: None,
            notes: None,
        }
    }

    #[tokio::test]
    async fn list_is_scoped_filtered_and_newest_first() {
        let store = MemoryJobStore::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        store.create(new_job(a, "First", JobStatus::Applied)).await.unwrap();
        store.create(new_job(b, "Other", JobStatus::Applied)).await.unwrap();
        store.create(new_job(a, "Second", JobStatus::Offer)).await.unwrap();
        store.create(new_job(a, "Third", JobStatus::Applied)).await.unwrap();

        let all: Vec<String> = store
            .list(a, None)
            .await
            .unwrap()
            .into_iter()
            .map(|j| j.company_name)
            .collect();
        assert_eq!(all, ["Third", "Second", "First"]);

        let applied = store.list(a, Some(JobStatus::Applied)).await.unwrap();
        assert_eq!(applied.len(), 2);
        assert!(applied.iter().all(|j| j.user_id == a && j.status == JobStatus::Applied));
    }

    #[tokio::test]
    async fn update_and_delete_report_missing_rows() {
        let store = MemoryJobStore::new();
        assert!(store.update(42, JobPatch::default()).await.unwrap().is_none());
        assert!(!store.delete(42).await.unwrap());

        let job = store
            .create(new_job(Uuid::new_v4(), "Acme", JobStatus::Applied))
            .await
            .unwrap();
        assert!(store.delete(job.id).await.unwrap());
        assert!(store.find_by_id(job.id).await.unwrap().is_none());
    }
}
