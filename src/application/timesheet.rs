use crate::application::report_cache::ReportCache;
use crate::domain::drag::{CommitPlan, DragSelectionMachine, DragState};
use crate::domain::models::{EntryId, GridConfig, TaskId, TimeEntry, TimeEntryCreateRequest};
use crate::domain::reconciler::{
    self, build_create_request, detect_overlap, CategoryTime, DayValidation, TaskTime,
};
use crate::domain::slot_grid::{SlotConflict, SlotGrid, TimeSlot};
use crate::infrastructure::error::{ChangeOutcome, TimesheetError};
use crate::infrastructure::task_selection::TaskSelection;
use crate::infrastructure::timesheet_client::{ReportGateway, TaskGateway, TimeEntryGateway};
use chrono::NaiveDate;
use log::{debug, info, warn};
use std::ops::RangeInclusive;
use std::sync::{Arc, Mutex, MutexGuard};

struct SessionState {
    current_date: NaiveDate,
    entries: Vec<TimeEntry>,
    grid: SlotGrid,
    drag: DragSelectionMachine,
}

impl SessionState {
    fn rebuild(&mut self) -> Result<Vec<SlotConflict>, TimesheetError> {
        let conflicts = self.grid.rebuild(self.current_date, &self.entries)?;
        self.drag.sync_selection(&mut self.grid);
        Ok(conflicts)
    }
}

/// One user's timesheet for one day at a time.
///
/// Owns the entry list, slot grid and drag machine of the current date. Locks are
/// never held across a gateway call; a commit keeps the machine in `Committing`
/// for the duration of its call so nothing else can mutate the day meanwhile.
pub struct TimesheetSession<G, R, T>
where
    G: TimeEntryGateway + TaskGateway,
    R: ReportGateway,
    T: TaskSelection,
{
    entry_gateway: Arc<G>,
    reports: Arc<ReportCache<R>>,
    task_selection: Arc<T>,
    state: Mutex<SessionState>,
}

impl<G, R, T> TimesheetSession<G, R, T>
where
    G: TimeEntryGateway + TaskGateway,
    R: ReportGateway,
    T: TaskSelection,
{
    pub fn new(
        grid_config: GridConfig,
        date: NaiveDate,
        entry_gateway: Arc<G>,
        reports: Arc<ReportCache<R>>,
        task_selection: Arc<T>,
    ) -> Result<Self, TimesheetError> {
        let mut grid = SlotGrid::new(grid_config)?;
        grid.rebuild(date, &[])?;
        Ok(Self {
            entry_gateway,
            reports,
            task_selection,
            state: Mutex::new(SessionState {
                current_date: date,
                entries: Vec::new(),
                grid,
                drag: DragSelectionMachine::new(),
            }),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, SessionState>, TimesheetError> {
        self.state
            .lock()
            .map_err(|error| TimesheetError::poisoned("timesheet session", error))
    }

    pub fn reports(&self) -> &ReportCache<R> {
        &self.reports
    }

    /// Switches to `date` and fetches its entries.
    pub async fn load(&self, date: NaiveDate) -> Result<Vec<SlotConflict>, TimesheetError> {
        self.set_current_date(date)?;
        self.refresh_entries().await
    }

    /// Cancels any drag and discards the previous day's entries and bindings.
    /// Rejected while a commit is in flight.
    pub fn set_current_date(&self, date: NaiveDate) -> Result<(), TimesheetError> {
        let mut guard = self.lock()?;
        let state = &mut *guard;
        if state.drag.is_committing() {
            return Err(TimesheetError::CommitInProgress);
        }
        state.drag.cancel(&mut state.grid);
        if state.current_date != date {
            debug!("switching timesheet from {} to {date}", state.current_date);
            state.current_date = date;
            state.entries.clear();
            state.rebuild()?;
        }
        Ok(())
    }

    /// Replaces the current date's entries with the persisted ones.
    ///
    /// A response for a date that is no longer current is dropped.
    pub async fn refresh_entries(&self) -> Result<Vec<SlotConflict>, TimesheetError> {
        let date = self.lock()?.current_date;
        self.reload_entries(date).await
    }

    async fn reload_entries(&self, date: NaiveDate) -> Result<Vec<SlotConflict>, TimesheetError> {
        let entries = self.entry_gateway.list_time_entries_for_date(date).await?;

        let mut state = self.lock()?;
        if state.current_date != date {
            debug!("dropping entries for {date}; session moved to {}", state.current_date);
            return Ok(Vec::new());
        }
        debug!("loaded {} entries for {date}", entries.len());
        state.entries = entries;
        state.rebuild()
    }

    pub fn begin_drag(&self, index: usize) -> Result<(), TimesheetError> {
        let mut guard = self.lock()?;
        let state = &mut *guard;
        state.drag.begin(&mut state.grid, index)
    }

    pub fn extend_drag(&self, index: usize) -> Result<(), TimesheetError> {
        let mut guard = self.lock()?;
        let state = &mut *guard;
        state.drag.extend(&mut state.grid, index)
    }

    pub fn begin_drag_at(&self, time_string: &str) -> Result<(), TimesheetError> {
        let mut guard = self.lock()?;
        let state = &mut *guard;
        let index = state.grid.index_of(time_string)?;
        state.drag.begin(&mut state.grid, index)
    }

    pub fn extend_drag_at(&self, time_string: &str) -> Result<(), TimesheetError> {
        let mut guard = self.lock()?;
        let state = &mut *guard;
        let index = state.grid.index_of(time_string)?;
        state.drag.extend(&mut state.grid, index)
    }

    pub fn cancel_drag(&self) -> Result<bool, TimesheetError> {
        let mut guard = self.lock()?;
        let state = &mut *guard;
        Ok(state.drag.cancel(&mut state.grid))
    }

    /// Persists the dragged range as an entry for `task_id`, or for the selected task.
    ///
    /// The selection is cleared whatever the outcome. A task whose title the selection
    /// does not know is looked up first so the entry always carries a description. The
    /// entry list changes only after the gateway confirms the entry; when the outcome of
    /// the call is unknown the day is re-fetched instead.
    pub async fn commit(&self, task_id: Option<TaskId>) -> Result<TimeEntry, TimesheetError> {
        let (plan, task_id, known_title) = {
            let mut guard = self.lock()?;
            let state = &mut *guard;
            let plan = state.drag.begin_commit(&state.grid)?;
            match self.resolve_task(task_id) {
                Ok((task_id, title)) => (plan, task_id, title),
                Err(error) => {
                    state.drag.finish_commit(&mut state.grid);
                    debug!("commit rejected before persistence: {error}");
                    return Err(error);
                }
            }
        };

        let title = match known_title {
            Some(title) => Ok(title),
            None => self
                .entry_gateway
                .task(task_id)
                .await
                .map(|task| task.title)
                .map_err(task_lookup_error),
        };

        let (request, date) = {
            let mut guard = self.lock()?;
            let state = &mut *guard;
            match title.and_then(|title| self.prepare_commit(state, &plan, task_id, &title)) {
                Ok(request) => (request, state.current_date),
                Err(error) => {
                    state.drag.finish_commit(&mut state.grid);
                    debug!("commit rejected before persistence: {error}");
                    return Err(error);
                }
            }
        };

        let result = self.entry_gateway.create_time_entry(&request).await;

        let rebuilt = {
            let mut guard = self.lock()?;
            let state = &mut *guard;
            state.drag.finish_commit(&mut state.grid);
            match &result {
                Ok(entry) if state.current_date == date => {
                    state.entries.retain(|existing| existing.id != entry.id);
                    state.entries.push(entry.clone());
                    state.rebuild().map(|_| ())
                }
                _ => Ok(()),
            }
        };

        match result {
            Ok(entry) => {
                self.reports.invalidate_for_entry_date(entry.entry_date)?;
                rebuilt?;
                info!(
                    "created entry {} for task {} on {date} {}-{}",
                    entry.id, entry.task_id, entry.start_time, entry.end_time
                );
                Ok(entry)
            }
            Err(error) if error.is_ambiguous() => {
                self.recover_after_ambiguous(date, &error).await;
                Err(error)
            }
            Err(error) => {
                warn!("entry creation failed for {date}: {error}");
                Err(error)
            }
        }
    }

    fn resolve_task(
        &self,
        task_id: Option<TaskId>,
    ) -> Result<(TaskId, Option<String>), TimesheetError> {
        let task_id = match task_id {
            Some(task_id) => task_id,
            None => self
                .task_selection
                .selected_task()?
                .ok_or(TimesheetError::NoTaskSelected)?,
        };
        let title = self.task_selection.task_title(task_id)?;
        Ok((task_id, title))
    }

    fn prepare_commit(
        &self,
        state: &SessionState,
        plan: &CommitPlan,
        task_id: TaskId,
        task_title: &str,
    ) -> Result<TimeEntryCreateRequest, TimesheetError> {
        let request = build_create_request(state.current_date, plan, task_id, task_title);
        request.validate().map_err(TimesheetError::Validation)?;

        let conflicts = detect_overlap(&request.start_time, &request.end_time, &state.entries, None)?;
        if !conflicts.is_empty() {
            return Err(TimesheetError::Overlap {
                message: format!(
                    "{}-{} on {} overlaps existing entries",
                    request.start_time, request.end_time, state.current_date
                ),
                conflicts: conflicts.into_iter().cloned().collect(),
            });
        }
        Ok(request)
    }

    /// Removes an entry remotely, then locally.
    pub async fn delete_entry(&self, entry_id: EntryId) -> Result<(), TimesheetError> {
        let date = {
            let state = self.lock()?;
            if state.drag.is_committing() {
                return Err(TimesheetError::CommitInProgress);
            }
            state
                .entries
                .iter()
                .find(|entry| entry.id == entry_id)
                .map(|entry| entry.entry_date)
                .unwrap_or(state.current_date)
        };

        match self.entry_gateway.delete_time_entry(entry_id).await {
            Ok(()) => {
                {
                    let mut state = self.lock()?;
                    state.entries.retain(|entry| entry.id != entry_id);
                    state.rebuild()?;
                }
                self.reports.invalidate_for_entry_date(date)?;
                info!("deleted entry {entry_id} on {date}");
                Ok(())
            }
            Err(error) if error.is_ambiguous() => {
                self.recover_after_ambiguous(date, &error).await;
                Err(error)
            }
            Err(error) => Err(error),
        }
    }

    /// Best effort: the caller still receives the error that triggered it.
    async fn recover_after_ambiguous(&self, date: NaiveDate, error: &TimesheetError) {
        warn!("outcome unknown for {date}, re-fetching entries: {error}");
        if let Err(refresh_error) = self.reload_entries(date).await {
            warn!("re-fetch of {date} failed: {refresh_error}");
        }
        if let Err(cache_error) = self.reports.invalidate_for_entry_date(date) {
            warn!("report invalidation for {date} failed: {cache_error}");
        }
    }

    pub fn current_date(&self) -> Result<NaiveDate, TimesheetError> {
        Ok(self.lock()?.current_date)
    }

    pub fn entries(&self) -> Result<Vec<TimeEntry>, TimesheetError> {
        Ok(self.lock()?.entries.clone())
    }

    pub fn slots(&self) -> Result<Vec<TimeSlot>, TimesheetError> {
        Ok(self.lock()?.grid.slots().to_vec())
    }

    pub fn entry_for_slot(&self, index: usize) -> Result<Option<EntryId>, TimesheetError> {
        Ok(self.lock()?.grid.entry_for_slot(index))
    }

    pub fn drag_state(&self) -> Result<DragState, TimesheetError> {
        Ok(self.lock()?.drag.state())
    }

    pub fn selected_range(&self) -> Result<Option<RangeInclusive<usize>>, TimesheetError> {
        Ok(self.lock()?.grid.selected_range())
    }

    pub fn breakdown_by_task(&self) -> Result<Vec<TaskTime>, TimesheetError> {
        let state = self.lock()?;
        Ok(reconciler::breakdown_by_task(&state.entries, state.current_date))
    }

    pub fn breakdown_by_category(&self) -> Result<Vec<CategoryTime>, TimesheetError> {
        let state = self.lock()?;
        Ok(reconciler::breakdown_by_category(&state.entries, state.current_date))
    }

    pub fn total_tracked_minutes(&self) -> Result<u32, TimesheetError> {
        let state = self.lock()?;
        Ok(reconciler::total_tracked_minutes(&state.entries, state.current_date))
    }

    pub fn productivity_percentage(&self) -> Result<u32, TimesheetError> {
        Ok(reconciler::productivity_percentage(self.total_tracked_minutes()?))
    }

    pub fn validate_day(&self) -> Result<DayValidation, TimesheetError> {
        let state = self.lock()?;
        reconciler::validate_day(&state.entries, state.current_date)
    }
}

/// Nothing was written when the lookup failed, whatever the transport reported.
fn task_lookup_error(error: TimesheetError) -> TimesheetError {
    match error {
        TimesheetError::Network { message, .. } => TimesheetError::network(
            format!("task lookup failed: {message}"),
            ChangeOutcome::Unchanged,
        ),
        other => other,
    }
}
