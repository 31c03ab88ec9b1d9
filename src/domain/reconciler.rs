use crate::domain::drag::CommitPlan;
use crate::domain::models::{CategoryId, EntryId, TaskId, TimeEntry, TimeEntryCreateRequest};
use crate::domain::time_math::{format_duration, to_minutes};
use crate::infrastructure::error::TimesheetError;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashMap;

/// Reference working day used for productivity percentages.
pub const REFERENCE_DAY_MINUTES: u32 = 8 * 60;

const DAILY_WARNING_MINUTES: u32 = 16 * 60;
const DAILY_LIMIT_MINUTES: u32 = 24 * 60;
const LONG_ENTRY_MINUTES: u32 = 12 * 60;
const SHORT_ENTRY_MINUTES: u32 = 15;
const LARGE_GAP_MINUTES: u32 = 4 * 60;
const EARLY_START_MINUTES: u32 = 5 * 60;
const LATE_END_MINUTES: u32 = 23 * 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskTime {
    pub task_id: TaskId,
    pub task_title: String,
    pub task_color: String,
    pub minutes: u32,
    pub entry_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryTime {
    pub category_id: Option<CategoryId>,
    pub category_title: String,
    pub minutes: u32,
    pub entry_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayConflict {
    pub entry_id: EntryId,
    pub task_title: String,
    pub start_time: String,
    pub end_time: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayValidation {
    pub valid: bool,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
    pub conflicts: Vec<DayConflict>,
}

/// Minutes per task for `date`, in encounter order. Display attributes come from the
/// first entry seen for each task.
pub fn breakdown_by_task(entries: &[TimeEntry], date: NaiveDate) -> Vec<TaskTime> {
    let mut positions: HashMap<TaskId, usize> = HashMap::new();
    let mut breakdown: Vec<TaskTime> = Vec::new();
    for entry in entries.iter().filter(|entry| entry.entry_date == date) {
        let position = *positions.entry(entry.task_id).or_insert_with(|| {
            breakdown.push(TaskTime {
                task_id: entry.task_id,
                task_title: entry.task_title.clone(),
                task_color: entry.task_color.clone(),
                minutes: 0,
                entry_count: 0,
            });
            breakdown.len() - 1
        });
        breakdown[position].minutes += entry.duration_minutes;
        breakdown[position].entry_count += 1;
    }
    breakdown
}

pub fn breakdown_by_category(entries: &[TimeEntry], date: NaiveDate) -> Vec<CategoryTime> {
    let mut positions: HashMap<Option<CategoryId>, usize> = HashMap::new();
    let mut breakdown: Vec<CategoryTime> = Vec::new();
    for entry in entries.iter().filter(|entry| entry.entry_date == date) {
        let position = *positions.entry(entry.category_id).or_insert_with(|| {
            breakdown.push(CategoryTime {
                category_id: entry.category_id,
                category_title: entry
                    .category_title
                    .clone()
                    .unwrap_or_else(|| "Uncategorized".to_string()),
                minutes: 0,
                entry_count: 0,
            });
            breakdown.len() - 1
        });
        breakdown[position].minutes += entry.duration_minutes;
        breakdown[position].entry_count += 1;
    }
    breakdown
}

pub fn total_tracked_minutes(entries: &[TimeEntry], date: NaiveDate) -> u32 {
    entries
        .iter()
        .filter(|entry| entry.entry_date == date)
        .map(|entry| entry.duration_minutes)
        .sum()
}

/// Share of the reference day, rounded, capped at 100.
pub fn productivity_percentage(total_minutes: u32) -> u32 {
    let percentage = (u64::from(total_minutes) * 100 + u64::from(REFERENCE_DAY_MINUTES) / 2)
        / u64::from(REFERENCE_DAY_MINUTES);
    percentage.min(100) as u32
}

/// Entries strictly overlapping the half-open candidate range `[start, end)`.
/// Touching ranges (`end == other.start`) do not conflict.
pub fn detect_overlap<'a>(
    candidate_start: &str,
    candidate_end: &str,
    existing: &'a [TimeEntry],
    exclude_id: Option<EntryId>,
) -> Result<Vec<&'a TimeEntry>, TimesheetError> {
    let start = to_minutes(candidate_start)?;
    let end = to_minutes(candidate_end)?;
    let mut conflicts = Vec::new();
    for entry in existing {
        if Some(entry.id) == exclude_id {
            continue;
        }
        let (entry_start, entry_end) = entry.minute_range()?;
        if start < entry_end && end > entry_start {
            conflicts.push(entry);
        }
    }
    Ok(conflicts)
}

pub fn build_create_request(
    date: NaiveDate,
    plan: &CommitPlan,
    task_id: TaskId,
    task_title: &str,
) -> TimeEntryCreateRequest {
    TimeEntryCreateRequest {
        task_id,
        entry_date: date,
        start_time: plan.start_time.clone(),
        end_time: plan.end_time.clone(),
        description: Some(format!("{task_title} work session")),
        is_billable: false,
    }
}

/// Flags unusual patterns in one day's entries: excessive totals, overlaps,
/// very long or short entries, large gaps and very early or late hours.
pub fn validate_day(entries: &[TimeEntry], date: NaiveDate) -> Result<DayValidation, TimesheetError> {
    let mut day: Vec<(u32, u32, &TimeEntry)> = entries
        .iter()
        .filter(|entry| entry.entry_date == date)
        .map(|entry| entry.minute_range().map(|(start, end)| (start, end, entry)))
        .collect::<Result<_, _>>()?;
    day.sort_by_key(|(start, end, _)| (*start, *end));

    let mut report = DayValidation {
        valid: true,
        ..DayValidation::default()
    };
    if day.is_empty() {
        return Ok(report);
    }

    let total = total_tracked_minutes(entries, date);
    if total > DAILY_WARNING_MINUTES {
        report
            .warnings
            .push(format!("Daily total exceeds 16 hours ({})", format_duration(total)));
    }
    if total > DAILY_LIMIT_MINUTES {
        report
            .errors
            .push(format!("Daily total exceeds 24 hours ({})", format_duration(total)));
        report.valid = false;
    }

    let (_, first_end, first) = day[0];
    let mut covering = (first_end, first);
    for &(next_start, next_end, next) in &day[1..] {
        let (covered_until, current) = covering;
        if covered_until > next_start {
            report.conflicts.push(DayConflict {
                entry_id: current.id,
                task_title: current.task_title.clone(),
                start_time: current.start_time.clone(),
                end_time: current.end_time.clone(),
            });
            report.errors.push(format!(
                "Time entries overlap: {} and {}",
                current.task_title, next.task_title
            ));
            report.valid = false;
        } else if next_start - covered_until > LARGE_GAP_MINUTES {
            report.warnings.push(format!(
                "Large gap detected between entries: {} between {} and {}",
                format_duration(next_start - covered_until),
                current.task_title,
                next.task_title
            ));
        }
        if next_end > covered_until {
            covering = (next_end, next);
        }
    }

    for (_, _, entry) in &day {
        if entry.duration_minutes > LONG_ENTRY_MINUTES {
            report.warnings.push(format!(
                "Long time entry detected: {} ({})",
                entry.task_title,
                format_duration(entry.duration_minutes)
            ));
        }
        if entry.duration_minutes < SHORT_ENTRY_MINUTES {
            report.warnings.push(format!(
                "Short time entry detected: {} ({})",
                entry.task_title,
                format_duration(entry.duration_minutes)
            ));
        }
    }

    let (first_start, _, first) = day[0];
    if first_start < EARLY_START_MINUTES {
        report
            .warnings
            .push(format!("Very early start time: {}", first.start_time));
    }
    let (last_end, last) = covering;
    if last_end > LATE_END_MINUTES {
        report
            .warnings
            .push(format!("Very late end time: {}", last.end_time));
    }

    Ok(report)
}
