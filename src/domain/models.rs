use crate::domain::time_math::{self, is_valid_time_format, to_minutes, validate_grid_window};
use crate::infrastructure::error::TimesheetError;
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

pub type EntryId = i64;
pub type TaskId = i64;
pub type CategoryId = i64;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GridConfig {
    pub start_hour: u32,
    pub end_hour: u32,
    pub interval_minutes: u32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            start_hour: 7,
            end_hour: 17,
            interval_minutes: 15,
        }
    }
}

impl GridConfig {
    pub fn validate(&self) -> Result<(), TimesheetError> {
        validate_grid_window(self.start_hour, self.end_hour, self.interval_minutes)
    }

    pub fn slot_count(&self) -> usize {
        ((self.end_hour.saturating_sub(self.start_hour)) * 60 / self.interval_minutes.max(1)) as usize
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TimeEntry {
    pub id: EntryId,
    pub task_id: TaskId,
    #[serde(default)]
    pub task_title: String,
    #[serde(default)]
    pub task_color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<CategoryId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_title: Option<String>,
    pub entry_date: NaiveDate,
    #[serde(deserialize_with = "deserialize_clock")]
    pub start_time: String,
    #[serde(deserialize_with = "deserialize_clock")]
    pub end_time: String,
    pub duration_minutes: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub is_billable: bool,
}

impl TimeEntry {
    /// Half-open `[start, end)` minute range of the entry.
    pub fn minute_range(&self) -> Result<(u32, u32), TimesheetError> {
        Ok((to_minutes(&self.start_time)?, to_minutes(&self.end_time)?))
    }

    pub fn validate(&self) -> Result<(), String> {
        validate_clock(&self.start_time, "time_entry.start_time")?;
        validate_clock(&self.end_time, "time_entry.end_time")?;
        let (start, end) = self.minute_range().map_err(|error| error.to_string())?;
        if end <= start {
            return Err("time_entry.end_time must be after time_entry.start_time".to_string());
        }
        if self.duration_minutes != end - start {
            return Err(format!(
                "time_entry.duration_minutes must be {} but was {}",
                end - start,
                self.duration_minutes
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TimeEntryCreateRequest {
    pub task_id: TaskId,
    pub entry_date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub is_billable: bool,
}

impl TimeEntryCreateRequest {
    pub fn validate(&self) -> Result<(), String> {
        validate_clock(&self.start_time, "request.start_time")?;
        validate_clock(&self.end_time, "request.end_time")?;
        let start = to_minutes(&self.start_time).map_err(|error| error.to_string())?;
        let end = to_minutes(&self.end_time).map_err(|error| error.to_string())?;
        if end <= start {
            return Err(format!(
                "request.end_time {} must be after request.start_time {} on the same day",
                self.end_time, self.start_time
            ));
        }
        Ok(())
    }

    pub fn duration_minutes(&self) -> Result<u32, TimesheetError> {
        time_math::duration(&self.start_time, &self.end_time)
    }
}

/// Task as reported by the service; only what a new entry needs to describe itself.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TaskSummary {
    pub id: TaskId,
    pub title: String,
    #[serde(default)]
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<CategoryId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_title: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CategoryBreakdown {
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    pub category_title: String,
    pub total_minutes: u32,
    #[serde(default)]
    pub time_formatted: String,
    #[serde(default)]
    pub entry_count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TaskBreakdown {
    pub task_id: TaskId,
    pub task_title: String,
    #[serde(default)]
    pub task_color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_icon: Option<String>,
    #[serde(default)]
    pub category_title: String,
    pub total_minutes: u32,
    #[serde(default)]
    pub time_formatted: String,
    #[serde(default)]
    pub entry_count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DailySummary {
    pub date: NaiveDate,
    pub total_minutes: u32,
    #[serde(default)]
    pub total_time_formatted: String,
    #[serde(default)]
    pub total_entries: u32,
    #[serde(default)]
    pub category_breakdowns: Vec<CategoryBreakdown>,
    #[serde(default)]
    pub task_breakdowns: Vec<TaskBreakdown>,
    #[serde(default)]
    pub time_entries: Vec<TimeEntry>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WeeklySummary {
    pub week_start_date: NaiveDate,
    pub week_end_date: NaiveDate,
    pub total_minutes: u32,
    #[serde(default)]
    pub total_time_formatted: String,
    #[serde(default)]
    pub total_entries: u32,
    #[serde(default)]
    pub average_daily_hours: f64,
    #[serde(default)]
    pub daily_summaries: Vec<DailySummary>,
    #[serde(default)]
    pub category_breakdowns: Vec<CategoryBreakdown>,
    #[serde(default)]
    pub task_breakdowns: Vec<TaskBreakdown>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyReport {
    pub year: i32,
    pub month: u32,
    pub total_minutes: u32,
    pub total_time_formatted: String,
    pub total_entries: u32,
    pub days_tracked: u32,
    pub average_daily_hours: f64,
    pub category_breakdowns: Vec<CategoryBreakdown>,
    pub task_breakdowns: Vec<TaskBreakdown>,
    pub weekday_minutes: u32,
    pub weekend_minutes: u32,
    pub longest_session: u32,
}

fn deserialize_clock<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    time_math::normalize_clock(&raw).map_err(serde::de::Error::custom)
}

fn validate_clock(value: &str, field_name: &str) -> Result<(), String> {
    if !is_valid_time_format(value) {
        return Err(format!("{field_name} must be HH:MM"));
    }
    Ok(())
}
