use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

/// Where an application currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobStatus {
    Applied,
    Interviewing,
    Rejected,
    Offer,
}

impl JobStatus {
    pub const ALL: [JobStatus; 4] = [
        JobStatus::Applied,
        JobStatus::Interviewing,
        JobStatus::Rejected,
        JobStatus::Offer,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Applied => "Applied",
            JobStatus::Interviewing => "Interviewing",
            JobStatus::Rejected => "Rejected",
            JobStatus::Offer => "Offer",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStatus(pub String);

impl FromStr for JobStatus {
    type Err = UnknownStatus;

    // exact, case-sensitive names only
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JobStatus::ALL
            .into_iter()
            .find(|st| st.as_str() == s)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

/// Job application record. `user_id` is the owner and never changes.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub id: i64,
    pub user_id: Uuid,
    pub company_name: String,
    pub job_title: String,
    pub status: JobStatus,
    pub application_date: Option<Date>,
    pub notes: Option<String>,
    pub created_at: OffsetDateTime,
}

/// Raw `jobs` row; status is stored as text.
#[derive(Debug, FromRow)]
pub struct JobRow {
    pub id: i64,
    pub user_id: Uuid,
    pub company_name: String,
    pub job_title: String,
    pub status: String,
    pub application_date: Option<Date>,
    pub notes: Option<String>,
    pub created_at: OffsetDateTime,
}

impl TryFrom<JobRow> for Job {
    type Error = anyhow::Error;

    fn try_from(r: JobRow) -> Result<Self, Self::Error> {
        let status = r
            .status
            .parse::<JobStatus>()
            .map_err(|e| anyhow::anyhow!("job {} has unknown status {:?}", r.id, e.0))?;
        Ok(Self {
            id: r.id,
            user_id: r.user_id,
            company_name: r.company_name,
            job_title: r.job_title,
            status,
            application_date: r.application_date,
            notes: r.notes,
            created_at: r.created_at,
        })
    }
}

/// Fields for a new job; the owner comes from the authenticated identity.
#[derive(Debug, Clone)]
pub struct NewJob {
    pub user_id: Uuid,
    pub company_name: String,
    pub job_title: String,
    pub status: JobStatus,
    pub application_date: Option<Date>,
    pub notes: Option<String>,
}

/// Partial update. `None` leaves a field untouched; for the nullable fields
/// `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobPatch {
    pub company_name: Option<String>,
    pub job_title: Option<String>,
    pub status: Option<JobStatus>,
    pub application_date: Option<Option<Date>>,
    pub notes: Option<Option<String>>,
}

impl JobPatch {
    pub fn apply(self, job: &mut Job) {
        if let Some(v) = self.company_name {
            job.company_name = v;
        }
        if let Some(v) = self.job_title {
            job.job_title = v;
        }
        if let Some(v) = self.status {
            job.status = v;
        }
        if let Some(v) = self.application_date {
            job.application_date = v;
        }
        if let Some(v) = self.notes {
            job.notes = v;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime};

    #[test]
    fn status_parses_exact_names_only() {
        for st in JobStatus::ALL {
            assert_eq!(st.as_str().parse::<JobStatus>(), Ok(st));
        }
        assert!("applied".parse::<JobStatus>().is_err());
        assert!("Ghosted".parse::<JobStatus>().is_err());
    }

    #[test]
    fn patch_leaves_absent_fields_and_clears_nulls() {
        let mut job = Job {
            id: 1,
            user_id: Uuid::new_v4(),
            company_name: "Acme".into(),
            job_title: "Engineer".into(),
            status: JobStatus::Applied,
            application_date: Some(date!(2025 - 01 - 02)),
            notes: Some("referral".into()),
            created_at: datetime!(2025-01-02 9:00 UTC),
        };
        let owner = job.user_id;

        JobPatch {
            status: Some(JobStatus::Interviewing),
            notes: Some(None),
            ..Default::default()
        }
        .apply(&mut job);

        assert_eq!(job.status, JobStatus::Interviewing);
        assert_eq!(job.notes, None);
        assert_eq!(job.company_name, "Acme");
        assert_eq!(job.application_date, Some(date!(2025 - 01 - 02)));
        assert_eq!(job.user_id, owner);
    }

    #[test]
    fn row_with_unknown_status_is_an_error() {
        let row = JobRow {
            id: 7,
            user_id: Uuid::new_v4(),
            company_name: "Acme".into(),
            job_title: "Engineer".into(),
            status: "Lost".into(),
            application_date: None,
            notes: None,
            created_at: datetime!(2025-01-02 9:00 UTC),
        };
        assert!(Job::try_from(row).is_err());
    }
}
