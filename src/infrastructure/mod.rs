pub mod config;
pub mod error;
pub mod key_value_store;
pub mod task_selection;
pub mod timesheet_client;
