use crate::domain::models::{
    CategoryBreakdown, DailySummary, EntryId, MonthlyReport, TaskBreakdown, TaskId, TaskSummary,
    TimeEntry, TimeEntryCreateRequest, WeeklySummary,
};
use crate::domain::report_keys::{daily_key, month_bounds};
use crate::domain::time_math::format_duration;
use crate::infrastructure::config::ApiConfig;
use crate::infrastructure::error::{ChangeOutcome, TimesheetError};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

/// Persistence service for time entries.
#[async_trait]
pub trait TimeEntryGateway: Send + Sync {
    async fn create_time_entry(
        &self,
        request: &TimeEntryCreateRequest,
    ) -> Result<TimeEntry, TimesheetError>;

    async fn delete_time_entry(&self, entry_id: EntryId) -> Result<(), TimesheetError>;

    async fn list_time_entries_for_date(
        &self,
        date: NaiveDate,
    ) -> Result<Vec<TimeEntry>, TimesheetError>;
}

/// Task catalogue lookups.
#[async_trait]
pub trait TaskGateway: Send + Sync {
    async fn task(&self, task_id: TaskId) -> Result<TaskSummary, TimesheetError>;
}

/// Aggregate reports computed by the persistence service.
#[async_trait]
pub trait ReportGateway: Send + Sync {
    async fn daily_report(&self, date: NaiveDate) -> Result<DailySummary, TimesheetError>;

    async fn weekly_report(&self, date: NaiveDate) -> Result<WeeklySummary, TimesheetError>;

    async fn monthly_report(&self, year: i32, month: u32) -> Result<MonthlyReport, TimesheetError>;
}

#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    success: bool,
    message: Option<String>,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct EnhancedStatisticsPayload {
    total_minutes: u32,
    total_time_formatted: Option<String>,
    total_entries: u32,
    days_tracked: u32,
    average_daily_hours: f64,
    category_breakdown: Vec<CategoryBreakdown>,
    task_breakdown: Vec<TaskBreakdown>,
    weekday_minutes: u32,
    weekend_minutes: u32,
    longest_session: u32,
}

impl EnhancedStatisticsPayload {
    fn into_monthly(self, year: i32, month: u32) -> MonthlyReport {
        MonthlyReport {
            year,
            month,
            total_minutes: self.total_minutes,
            total_time_formatted: self
                .total_time_formatted
                .unwrap_or_else(|| format_duration(self.total_minutes)),
            total_entries: self.total_entries,
            days_tracked: self.days_tracked,
            average_daily_hours: self.average_daily_hours,
            category_breakdowns: self.category_breakdown,
            task_breakdowns: self.task_breakdown,
            weekday_minutes: self.weekday_minutes,
            weekend_minutes: self.weekend_minutes,
            longest_session: self.longest_session,
        }
    }
}

/// REST client for the time tracking service. Retries are left to the caller.
#[derive(Debug, Clone)]
pub struct ReqwestTimesheetClient {
    client: Client,
    base_url: Url,
}

impl ReqwestTimesheetClient {
    pub fn new(config: &ApiConfig) -> Result<Self, TimesheetError> {
        let mut raw = config.base_url.trim().to_string();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        let base_url = Url::parse(&raw)
            .map_err(|error| TimesheetError::Config(format!("invalid api base url '{raw}': {error}")))?;
        if base_url.cannot_be_a_base() {
            return Err(TimesheetError::Config(format!(
                "api base url '{raw}' cannot be a base"
            )));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds.max(1)))
            .build()
            .map_err(|error| TimesheetError::Config(format!("failed building http client: {error}")))?;
        Ok(Self { client, base_url })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, TimesheetError> {
        let mut url = self.base_url.clone();
        {
            let mut path = url.path_segments_mut().map_err(|_| {
                TimesheetError::Config("api base url cannot be a base".to_string())
            })?;
            path.pop_if_empty();
            path.extend(segments);
        }
        Ok(url)
    }

    /// Sends the request and returns the raw body of a successful response.
    async fn execute(&self, request: RequestBuilder, action: &str) -> Result<String, TimesheetError> {
        let response = request
            .send()
            .await
            .map_err(|error| transport_error(action, &error))?;

        let status = response.status();
        let body = response.text().await.map_err(|error| {
            TimesheetError::network(
                format!("failed reading {action} response: {error}"),
                ChangeOutcome::Unknown,
            )
        })?;

        if !status.is_success() {
            return Err(http_error(action, status, &body));
        }
        Ok(body)
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        action: &str,
    ) -> Result<T, TimesheetError> {
        let body = self.execute(request, action).await?;
        decode_envelope::<T>(action, &body)?.ok_or_else(|| {
            TimesheetError::network(
                format!("{action} response did not include data"),
                ChangeOutcome::Unknown,
            )
        })
    }
}

#[async_trait]
impl TimeEntryGateway for ReqwestTimesheetClient {
    async fn create_time_entry(
        &self,
        request: &TimeEntryCreateRequest,
    ) -> Result<TimeEntry, TimesheetError> {
        let endpoint = self.endpoint(&["time-entries"])?;
        self.fetch(self.client.post(endpoint).json(request), "time entry create")
            .await
    }

    async fn delete_time_entry(&self, entry_id: EntryId) -> Result<(), TimesheetError> {
        let id = entry_id.to_string();
        let endpoint = self.endpoint(&["time-entries", &id])?;
        let body = self
            .execute(self.client.delete(endpoint), "time entry delete")
            .await?;
        decode_envelope::<serde_json::Value>("time entry delete", &body)?;
        Ok(())
    }

    async fn list_time_entries_for_date(
        &self,
        date: NaiveDate,
    ) -> Result<Vec<TimeEntry>, TimesheetError> {
        let day = daily_key(date);
        let endpoint = self.endpoint(&["time-entries", "date", &day])?;
        self.fetch(self.client.get(endpoint), "time entry list").await
    }
}

#[async_trait]
impl TaskGateway for ReqwestTimesheetClient {
    async fn task(&self, task_id: TaskId) -> Result<TaskSummary, TimesheetError> {
        let id = task_id.to_string();
        let endpoint = self.endpoint(&["tasks", &id])?;
        self.fetch(self.client.get(endpoint), "task lookup").await
    }
}

#[async_trait]
impl ReportGateway for ReqwestTimesheetClient {
    async fn daily_report(&self, date: NaiveDate) -> Result<DailySummary, TimesheetError> {
        let day = daily_key(date);
        let endpoint = self.endpoint(&["reports", "daily", &day])?;
        self.fetch(self.client.get(endpoint), "daily report").await
    }

    async fn weekly_report(&self, date: NaiveDate) -> Result<WeeklySummary, TimesheetError> {
        let day = daily_key(date);
        let endpoint = self.endpoint(&["reports", "weekly", &day])?;
        self.fetch(self.client.get(endpoint), "weekly report").await
    }

    async fn monthly_report(&self, year: i32, month: u32) -> Result<MonthlyReport, TimesheetError> {
        let (first, last) = month_bounds(year, month)?;
        let endpoint = self.endpoint(&["reports", "enhanced-statistics"])?;
        let request = self.client.get(endpoint).query(&[
            ("startDate", daily_key(first)),
            ("endDate", daily_key(last)),
        ]);
        let payload: EnhancedStatisticsPayload = self.fetch(request, "monthly report").await?;
        Ok(payload.into_monthly(year, month))
    }
}

/// Connection and request-building failures happen before anything reaches the server.
fn transport_error(action: &str, error: &reqwest::Error) -> TimesheetError {
    let outcome = if error.is_connect() || error.is_builder() {
        ChangeOutcome::Unchanged
    } else {
        ChangeOutcome::Unknown
    };
    TimesheetError::network(format!("network error during {action}: {error}"), outcome)
}

fn http_error(action: &str, status: StatusCode, body: &str) -> TimesheetError {
    let detail = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|parsed| parsed.message.or(parsed.error))
        .filter(|message| !message.trim().is_empty())
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                format!("http {}", status.as_u16())
            } else {
                format!("http {}; body={body}", status.as_u16())
            }
        });

    match status {
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            TimesheetError::Validation(format!("{action}: {detail}"))
        }
        StatusCode::NOT_FOUND => TimesheetError::NotFound(format!("{action}: {detail}")),
        StatusCode::CONFLICT => TimesheetError::Overlap {
            message: format!("{action}: {detail}"),
            conflicts: Vec::new(),
        },
        status if status.is_client_error() => TimesheetError::network(
            format!("{action} rejected: {detail}"),
            ChangeOutcome::Unchanged,
        ),
        _ => TimesheetError::network(
            format!("{action} failed: {detail}"),
            ChangeOutcome::Unknown,
        ),
    }
}

fn decode_envelope<T: DeserializeOwned>(action: &str, body: &str) -> Result<Option<T>, TimesheetError> {
    let envelope: ApiEnvelope<T> = serde_json::from_str(body).map_err(|error| {
        TimesheetError::network(
            format!("invalid {action} payload: {error}; body={body}"),
            ChangeOutcome::Unknown,
        )
    })?;
    if !envelope.success {
        return Err(TimesheetError::Validation(format!(
            "{action}: {}",
            envelope.message.unwrap_or_else(|| "request was not successful".to_string())
        )));
    }
    Ok(envelope.data)
}
