use crate::domain::models::{DailySummary, MonthlyReport, WeeklySummary};
use crate::domain::report_keys::{daily_key, dates_in_range, month_bounds, month_key, week_key};
use crate::infrastructure::error::TimesheetError;
use crate::infrastructure::timesheet_client::ReportGateway;
use chrono::{Datelike, NaiveDate};
use log::debug;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::OnceCell;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportKind {
    Daily,
    Weekly,
    Monthly,
}

impl ReportKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

type ReportCell<T> = Arc<OnceCell<Arc<T>>>;

struct Slots<T> {
    cells: HashMap<String, ReportCell<T>>,
    current: Option<(String, Arc<T>)>,
}

/// Reports of one kind, keyed by their cache key.
///
/// Each key owns a `OnceCell`; callers racing on the same key await the same
/// initialization. Evicting a key drops its cell, so a fetch still in flight
/// finishes into a detached cell and never becomes visible to later readers.
struct KeyedReports<T> {
    kind: ReportKind,
    slots: Mutex<Slots<T>>,
}

impl<T> KeyedReports<T> {
    fn new(kind: ReportKind) -> Self {
        Self {
            kind,
            slots: Mutex::new(Slots {
                cells: HashMap::new(),
                current: None,
            }),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Slots<T>>, TimesheetError> {
        self.slots
            .lock()
            .map_err(|error| TimesheetError::poisoned("report cache", error))
    }

    async fn get_or_fetch<F, Fut>(&self, key: String, fetch: F) -> Result<Arc<T>, TimesheetError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, TimesheetError>>,
    {
        let cell = {
            let mut slots = self.lock()?;
            Arc::clone(slots.cells.entry(key.clone()).or_default())
        };

        let report = match cell.get() {
            Some(report) => {
                debug!("{} report cache hit: {key}", self.kind);
                Arc::clone(report)
            }
            None => {
                let kind = self.kind;
                let label = key.as_str();
                let report = cell
                    .get_or_try_init(|| async move {
                        debug!("{kind} report cache miss, fetching: {label}");
                        fetch().await.map(Arc::new)
                    })
                    .await?;
                Arc::clone(report)
            }
        };

        let mut slots = self.lock()?;
        let still_cached = slots
            .cells
            .get(&key)
            .is_some_and(|cached| Arc::ptr_eq(cached, &cell));
        if still_cached {
            slots.current = Some((key, Arc::clone(&report)));
        } else {
            debug!("{} report {key} was invalidated while loading", self.kind);
        }
        Ok(report)
    }

    fn invalidate(&self, key: &str) -> Result<bool, TimesheetError> {
        let mut slots = self.lock()?;
        let evicted = slots
            .cells
            .remove(key)
            .is_some_and(|cell| cell.initialized());
        if slots
            .current
            .as_ref()
            .is_some_and(|(current, _)| current == key)
        {
            slots.current = None;
        }
        if evicted {
            debug!("evicted {} report {key}", self.kind);
        }
        Ok(evicted)
    }

    fn invalidate_current(&self) -> Result<Option<String>, TimesheetError> {
        let mut slots = self.lock()?;
        let Some((key, _)) = slots.current.take() else {
            return Ok(None);
        };
        slots.cells.remove(&key);
        debug!("evicted current {} report {key}", self.kind);
        Ok(Some(key))
    }

    fn clear(&self) -> Result<(), TimesheetError> {
        let mut slots = self.lock()?;
        slots.cells.clear();
        slots.current = None;
        Ok(())
    }

    fn current(&self) -> Result<Option<Arc<T>>, TimesheetError> {
        Ok(self
            .lock()?
            .current
            .as_ref()
            .map(|(_, report)| Arc::clone(report)))
    }

    fn is_cached(&self, key: &str) -> Result<bool, TimesheetError> {
        Ok(self
            .lock()?
            .cells
            .get(key)
            .is_some_and(|cell| cell.initialized()))
    }
}

/// Daily, weekly and monthly reports fetched through a [`ReportGateway`].
///
/// Stored reports are never modified; a changed day is evicted and fetched again.
pub struct ReportCache<R>
where
    R: ReportGateway,
{
    gateway: Arc<R>,
    daily: KeyedReports<DailySummary>,
    weekly: KeyedReports<WeeklySummary>,
    monthly: KeyedReports<MonthlyReport>,
}

impl<R> ReportCache<R>
where
    R: ReportGateway,
{
    pub fn new(gateway: Arc<R>) -> Self {
        Self {
            gateway,
            daily: KeyedReports::new(ReportKind::Daily),
            weekly: KeyedReports::new(ReportKind::Weekly),
            monthly: KeyedReports::new(ReportKind::Monthly),
        }
    }

    pub async fn daily(&self, date: NaiveDate) -> Result<Arc<DailySummary>, TimesheetError> {
        self.daily
            .get_or_fetch(daily_key(date), || self.gateway.daily_report(date))
            .await
    }

    /// The report for the week containing `date`.
    pub async fn weekly(&self, date: NaiveDate) -> Result<Arc<WeeklySummary>, TimesheetError> {
        self.weekly
            .get_or_fetch(week_key(date), || self.gateway.weekly_report(date))
            .await
    }

    pub async fn monthly(&self, year: i32, month: u32) -> Result<Arc<MonthlyReport>, TimesheetError> {
        month_bounds(year, month)?;
        self.monthly
            .get_or_fetch(month_key(year, month), || {
                self.gateway.monthly_report(year, month)
            })
            .await
    }

    /// Evicts one key. Returns whether a stored report was dropped.
    pub fn invalidate(&self, kind: ReportKind, key: &str) -> Result<bool, TimesheetError> {
        match kind {
            ReportKind::Daily => self.daily.invalidate(key),
            ReportKind::Weekly => self.weekly.invalidate(key),
            ReportKind::Monthly => self.monthly.invalidate(key),
        }
    }

    pub fn invalidate_daily(&self, date: NaiveDate) -> Result<bool, TimesheetError> {
        self.daily.invalidate(&daily_key(date))
    }

    pub fn invalidate_weekly(&self, date: NaiveDate) -> Result<bool, TimesheetError> {
        self.weekly.invalidate(&week_key(date))
    }

    pub fn invalidate_monthly(&self, year: i32, month: u32) -> Result<bool, TimesheetError> {
        self.monthly.invalidate(&month_key(year, month))
    }

    /// Evicts every daily, weekly and monthly key touched by the inclusive range.
    /// Returns the number of stored reports dropped.
    pub fn invalidate_range(&self, start: NaiveDate, end: NaiveDate) -> Result<usize, TimesheetError> {
        let mut weeks = BTreeSet::new();
        let mut months = BTreeSet::new();
        let mut evicted = 0;

        for date in dates_in_range(start, end) {
            if self.invalidate_daily(date)? {
                evicted += 1;
            }
            weeks.insert(week_key(date));
            months.insert((date.year(), date.month()));
        }
        for week in weeks {
            if self.weekly.invalidate(&week)? {
                evicted += 1;
            }
        }
        for (year, month) in months {
            if self.invalidate_monthly(year, month)? {
                evicted += 1;
            }
        }
        debug!("invalidated {evicted} reports between {start} and {end}");
        Ok(evicted)
    }

    /// Evicts the report of `kind` currently on display, if any, and returns its key.
    pub fn invalidate_current(&self, kind: ReportKind) -> Result<Option<String>, TimesheetError> {
        match kind {
            ReportKind::Daily => self.daily.invalidate_current(),
            ReportKind::Weekly => self.weekly.invalidate_current(),
            ReportKind::Monthly => self.monthly.invalidate_current(),
        }
    }

    /// Cascade run after any entry on `date` is created or deleted.
    pub fn invalidate_for_entry_date(&self, date: NaiveDate) -> Result<(), TimesheetError> {
        self.invalidate_daily(date)?;
        self.invalidate_weekly(date)?;
        self.invalidate_monthly(date.year(), date.month())?;
        Ok(())
    }

    pub fn clear(&self) -> Result<(), TimesheetError> {
        self.daily.clear()?;
        self.weekly.clear()?;
        self.monthly.clear()
    }

    pub fn current_daily(&self) -> Result<Option<Arc<DailySummary>>, TimesheetError> {
        self.daily.current()
    }

    pub fn current_weekly(&self) -> Result<Option<Arc<WeeklySummary>>, TimesheetError> {
        self.weekly.current()
    }

    pub fn current_monthly(&self) -> Result<Option<Arc<MonthlyReport>>, TimesheetError> {
        self.monthly.current()
    }

    pub fn is_cached(&self, kind: ReportKind, key: &str) -> Result<bool, TimesheetError> {
        match kind {
            ReportKind::Daily => self.daily.is_cached(key),
            ReportKind::Weekly => self.weekly.is_cached(key),
            ReportKind::Monthly => self.monthly.is_cached(key),
        }
    }
}
