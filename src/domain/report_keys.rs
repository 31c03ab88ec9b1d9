//! Cache keys for daily, weekly and monthly reports.
//!
//! Weeks run Monday to Sunday, matching the weeks the report service aggregates. They are
//! numbered within the calendar year of the date: week 1 is the (possibly partial) week
//! holding January 1st. A week that straddles New Year therefore has a different key on
//! each side.

use crate::infrastructure::error::TimesheetError;
use chrono::{Datelike, NaiveDate};

pub fn daily_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn week_of_year(date: NaiveDate) -> u32 {
    let offset = NaiveDate::from_ymd_opt(date.year(), 1, 1)
        .map(|first| first.weekday().num_days_from_monday())
        .unwrap_or(0);
    (date.ordinal0() + offset) / 7 + 1
}

pub fn week_key(date: NaiveDate) -> String {
    format!("{}-W{:02}", date.year(), week_of_year(date))
}

pub fn month_key(year: i32, month: u32) -> String {
    format!("{year}-{month:02}")
}

pub fn month_key_for(date: NaiveDate) -> String {
    month_key(date.year(), date.month())
}

/// First and last day of a month.
pub fn month_bounds(year: i32, month: u32) -> Result<(NaiveDate, NaiveDate), TimesheetError> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| TimesheetError::Validation(format!("invalid month {year}-{month:02}")))?;
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    let last = NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|next| next.pred_opt())
        .ok_or_else(|| TimesheetError::Validation(format!("invalid month {year}-{month:02}")))?;
    Ok((first, last))
}

/// Every date of the inclusive range; empty when `end < start`.
pub fn dates_in_range(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    start.iter_days().take_while(move |date| *date <= end)
}
