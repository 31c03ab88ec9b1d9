pub mod bootstrap;
pub mod report_cache;
pub mod timesheet;
