pub mod drag;
pub mod models;
pub mod reconciler;
pub mod report_keys;
pub mod slot_grid;
pub mod time_math;
