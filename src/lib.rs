//! Core of a drag-to-paint timesheet.
//!
//! A day is split into fixed-width slots ([`domain::slot_grid`]). Dragging across slots
//! selects a contiguous range ([`domain::drag`]) which a [`TimesheetSession`] commits as a
//! time entry through a [`TimeEntryGateway`]. Aggregate reports are cached per day, week
//! and month in a [`ReportCache`] and evicted whenever an entry on a covered date changes.

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::bootstrap::{bootstrap_workspace, BootstrapResult};
pub use application::report_cache::{ReportCache, ReportKind};
pub use application::timesheet::TimesheetSession;
pub use domain::models::{GridConfig, TaskSummary, TimeEntry, TimeEntryCreateRequest};
pub use infrastructure::error::{ChangeOutcome, TimesheetError};
pub use infrastructure::task_selection::{StoredTaskSelection, TaskSelection};
pub use infrastructure::timesheet_client::{
    ReportGateway, ReqwestTimesheetClient, TaskGateway, TimeEntryGateway,
};
