use serde::{Deserialize, Deserializer, Serialize};
use time::{format_description::well_known::Rfc3339, macros::format_description, Date, OffsetDateTime};
use uuid::Uuid;

use super::repo_types::{Job, JobStatus};

/// Distinguishes an absent field (`None`) from an explicit `null` (`Some(None)`).
fn nullable<'de, D, T>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(de).map(Some)
}

/// Accepts `YYYY-MM-DD` or a full RFC 3339 timestamp, keeping the date part.
pub fn parse_application_date(raw: &str) -> Option<Date> {
    Date::parse(raw, format_description!("[year]-[month]-[day]"))
        .ok()
        .or_else(|| OffsetDateTime::parse(raw, &Rfc3339).ok().map(|dt| dt.date()))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateJobRequest {
    pub company_name: Option<String>,
    pub job_title: Option<String>,
    pub status: Option<String>,
    pub application_date: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateJobRequest {
    pub company_name: Option<String>,
    pub job_title: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub status: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub application_date: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub notes: Option<Option<String>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListJobsQuery {
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobResponse {
    pub id: i64,
    pub user_id: Uuid,
    pub company_name: String,
    pub job_title: String,
    pub status: JobStatus,
    pub application_date: Option<String>,
    pub notes: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<Job> for JobResponse {
    fn from(j: Job) -> Self {
        Self {
            id: j.id,
            user_id: j.user_id,
            company_name: j.company_name,
            job_title: j.job_title,
            status: j.status,
            application_date: j.application_date.map(|d| d.to_string()),
            notes: j.notes,
            created_at: j.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn update_request_distinguishes_absent_from_null() {
        let req: UpdateJobRequest =
            serde_json::from_str(r#"{"notes": null, "status": "Offer"}"#).unwrap();
        assert_eq!(req.notes, Some(None));
        assert_eq!(req.status, Some(Some("Offer".to_string())));
        assert_eq!(req.application_date, None);
        assert_eq!(req.company_name, None);
    }

    #[test]
    fn parses_plain_dates_and_timestamps() {
        assert_eq!(parse_application_date("2025-02-03"), Some(date!(2025 - 02 - 03)));
        assert_eq!(
            parse_application_date("2025-02-03T10:30:00Z"),
            Some(date!(2025 - 02 - 03))
        );
        assert_eq!(parse_application_date("03/02/2025"), None);
        assert_eq!(parse_application_date("2025-02-30"), None);
    }

    #[test]
    fn response_uses_camel_case_and_plain_date() {
        let job = Job {
            id: 3,
            user_id: Uuid::nil(),
            company_name: "Acme".into(),
            job_title: "Engineer".into(),
            status: JobStatus::Interviewing,
            application_date: Some(date!(2025 - 02 - 03)),
            notes: None,
            created_at: time::macros::datetime!(2025-02-03 10:30 UTC),
        };
        let json = serde_json::to_value(JobResponse::from(job)).unwrap();
        assert_eq!(json["companyName"], "Acme");
        assert_eq!(json["status"], "Interviewing");
        assert_eq!(json["applicationDate"], "2025-02-03");
        assert_eq!(json["createdAt"], "2025-02-03T10:30:00Z");
    }
}
