//! Clock arithmetic over `HH:MM` strings and minute-of-day offsets.

use crate::infrastructure::error::TimesheetError;

pub const MINUTES_PER_DAY: u32 = 24 * 60;

/// Strict `HH:MM` check: one or two hour digits (0-23), exactly two minute digits (00-59).
pub fn is_valid_time_format(value: &str) -> bool {
    split_clock(value).is_some()
}

pub fn to_minutes(value: &str) -> Result<u32, TimesheetError> {
    let (hour, minute) =
        split_clock(value).ok_or_else(|| TimesheetError::Parse(value.to_string()))?;
    Ok(hour * 60 + minute)
}

/// Minutes are reduced modulo a day first, so the output is always a valid `HH:MM`.
pub fn to_time_string(minutes: i64) -> String {
    let wrapped = minutes.rem_euclid(i64::from(MINUTES_PER_DAY));
    format!("{:02}:{:02}", wrapped / 60, wrapped % 60)
}

/// Accepts `HH:MM` or `HH:MM:SS` and returns the canonical zero-padded `HH:MM`.
pub fn normalize_clock(value: &str) -> Result<String, TimesheetError> {
    let trimmed = value.trim();
    let clock = match trimmed.len() {
        8 => {
            let (Some(clock), Some(seconds)) = (trimmed.get(..5), trimmed.get(5..)) else {
                return Err(TimesheetError::Parse(value.to_string()));
            };
            let valid_seconds = seconds
                .strip_prefix(':')
                .and_then(|raw| raw.parse::<u8>().ok())
                .is_some_and(|seconds| seconds < 60);
            if !valid_seconds {
                return Err(TimesheetError::Parse(value.to_string()));
            }
            clock
        }
        _ => trimmed,
    };
    Ok(to_time_string(i64::from(to_minutes(clock)?)))
}

/// Minute distance from `start` to `end`. An `end` before `start` is read as crossing midnight.
pub fn duration_between(start: u32, end: u32) -> u32 {
    let start = start % MINUTES_PER_DAY;
    let end = end % MINUTES_PER_DAY;
    if end < start {
        MINUTES_PER_DAY - start + end
    } else {
        end - start
    }
}

pub fn duration(start: &str, end: &str) -> Result<u32, TimesheetError> {
    Ok(duration_between(to_minutes(start)?, to_minutes(end)?))
}

/// Rounds to the nearest multiple of `interval` (halves round up), then wraps into the day.
pub fn snap_to_interval(minutes: u32, interval: u32) -> u32 {
    if interval == 0 {
        return minutes % MINUTES_PER_DAY;
    }
    let remainder = minutes % interval;
    let snapped = if remainder * 2 >= interval {
        minutes - remainder + interval
    } else {
        minutes - remainder
    };
    snapped % MINUTES_PER_DAY
}

pub fn validate_grid_window(
    start_hour: u32,
    end_hour: u32,
    interval_minutes: u32,
) -> Result<(), TimesheetError> {
    if interval_minutes == 0 || 60 % interval_minutes != 0 {
        return Err(TimesheetError::Config(format!(
            "interval of {interval_minutes} minutes does not evenly divide an hour"
        )));
    }
    if start_hour > 23 {
        return Err(TimesheetError::Config(format!(
            "start hour {start_hour} must be within 0..=23"
        )));
    }
    if end_hour > 24 || start_hour >= end_hour {
        return Err(TimesheetError::Config(format!(
            "end hour {end_hour} must be after start hour {start_hour} and at most 24"
        )));
    }
    Ok(())
}

/// Ordered slot keys covering `[start_hour:00, end_hour:00)`.
pub fn generate_slots(
    start_hour: u32,
    end_hour: u32,
    interval_minutes: u32,
) -> Result<Vec<String>, TimesheetError> {
    validate_grid_window(start_hour, end_hour, interval_minutes)?;
    Ok((start_hour * 60..end_hour * 60)
        .step_by(interval_minutes as usize)
        .map(|minutes| to_time_string(i64::from(minutes)))
        .collect())
}

/// Human readable duration: `45m`, `2h`, `1h 30m`.
pub fn format_duration(minutes: u32) -> String {
    if minutes < 60 {
        return format!("{minutes}m");
    }
    let hours = minutes / 60;
    let remaining = minutes % 60;
    if remaining == 0 {
        format!("{hours}h")
    } else {
        format!("{hours}h {remaining}m")
    }
}

fn split_clock(value: &str) -> Option<(u32, u32)> {
    let (hour_str, minute_str) = value.split_once(':')?;
    if hour_str.is_empty() || hour_str.len() > 2 || minute_str.len() != 2 {
        return None;
    }
    if !hour_str.bytes().chain(minute_str.bytes()).all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    let hour = hour_str.parse::<u32>().ok()?;
    let minute = minute_str.parse::<u32>().ok()?;
    if hour > 23 || minute > 59 {
        return None;
    }
    Some((hour, minute))
}
