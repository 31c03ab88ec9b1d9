use crate::infrastructure::config::{ensure_default_config, load_config, TimesheetConfig};
use crate::infrastructure::error::TimesheetError;
use crate::infrastructure::key_value_store::initialize_database;
use log::info;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct BootstrapResult {
    pub workspace_root: PathBuf,
    pub config_dir: PathBuf,
    pub database_path: PathBuf,
    pub config: TimesheetConfig,
}

pub fn bootstrap_workspace(workspace_root: &Path) -> Result<BootstrapResult, TimesheetError> {
    let config_dir = workspace_root.join("config");
    let state_dir = workspace_root.join("state");
    let database_path = state_dir.join("timesheet.sqlite");

    fs::create_dir_all(&config_dir)?;
    fs::create_dir_all(&state_dir)?;

    ensure_default_config(&config_dir)?;
    let config = load_config(&config_dir)?;
    initialize_database(&database_path)?;

    info!(
        "timesheet workspace ready at {} ({}:00-{}:00 every {}m)",
        workspace_root.display(),
        config.grid.start_hour,
        config.grid.end_hour,
        config.grid.interval_minutes
    );
    Ok(BootstrapResult {
        workspace_root: workspace_root.to_path_buf(),
        config_dir,
        database_path,
        config,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::GridConfig;
    use crate::infrastructure::key_value_store::{KeyValueStore, SqliteKeyValueStore};

    struct TempWorkspace {
        path: PathBuf,
    }

    impl TempWorkspace {
        fn new(name: &str) -> Self {
            let path = std::env::temp_dir().join(format!(
                "timesheet-bootstrap-{name}-{}-{}",
                std::process::id(),
                chrono::Utc::now().timestamp_nanos_opt().unwrap_or(0)
            ));
            Self { path }
        }
    }

    impl Drop for TempWorkspace {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.path);
        }
    }

    #[test]
    fn bootstrap_creates_layout_and_defaults() {
        let workspace = TempWorkspace::new("fresh");
        let result = bootstrap_workspace(&workspace.path).expect("bootstrap");

        assert!(result.config_dir.join("timesheet.json").exists());
        assert!(result.database_path.exists());
        assert_eq!(result.config.grid, GridConfig::default());

        let store = SqliteKeyValueStore::new(&result.database_path);
        store.save("bootstrap.check", "1").expect("database is writable");
    }

    #[test]
    fn bootstrap_fails_on_invalid_grid() {
        let workspace = TempWorkspace::new("invalid");
        let config_dir = workspace.path.join("config");
        fs::create_dir_all(&config_dir).expect("config dir");
        fs::write(
            config_dir.join("timesheet.json"),
            r#"{"schema": 1, "grid": {"startHour": 17, "endHour": 7, "intervalMinutes": 15}}"#,
        )
        .expect("seed config");

        assert!(matches!(
            bootstrap_workspace(&workspace.path),
            Err(TimesheetError::Config(_))
        ));
    }
}
