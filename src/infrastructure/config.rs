use crate::domain::models::GridConfig;
use crate::infrastructure::error::TimesheetError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

const TIMESHEET_JSON: &str = "timesheet.json";
const SUPPORTED_SCHEMA: u64 = 1;
const DEFAULT_BASE_URL: &str = "http://localhost:8080/api/";
const DEFAULT_TIMEOUT_SECONDS: u64 = 10;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ApiConfig {
    pub base_url: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TimesheetConfig {
    pub schema: u8,
    #[serde(default)]
    pub grid: GridConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

fn default_timeout_seconds() -> u64 {
    DEFAULT_TIMEOUT_SECONDS
}

fn default_config() -> serde_json::Value {
    serde_json::json!({
        "schema": 1,
        "grid": {
            "startHour": 7,
            "endHour": 17,
            "intervalMinutes": 15
        },
        "api": {
            "baseUrl": DEFAULT_BASE_URL,
            "timeoutSeconds": DEFAULT_TIMEOUT_SECONDS
        }
    })
}

pub fn ensure_default_config(config_dir: &Path) -> Result<(), TimesheetError> {
    let path = config_dir.join(TIMESHEET_JSON);
    if !path.exists() {
        let formatted = serde_json::to_string_pretty(&default_config())?;
        fs::write(path, format!("{formatted}\n"))?;
    }
    Ok(())
}

fn read_config(path: &Path) -> Result<serde_json::Value, TimesheetError> {
    let raw = fs::read_to_string(path)?;
    let parsed: serde_json::Value = serde_json::from_str(&raw)?;
    let schema = parsed
        .get("schema")
        .and_then(serde_json::Value::as_u64)
        .ok_or_else(|| TimesheetError::Config(format!("missing schema in {}", path.display())))?;
    if schema != SUPPORTED_SCHEMA {
        return Err(TimesheetError::Config(format!(
            "unsupported schema {} in {}",
            schema,
            path.display()
        )));
    }
    Ok(parsed)
}

/// Reads `timesheet.json` and rejects an invalid grid window up front.
pub fn load_config(config_dir: &Path) -> Result<TimesheetConfig, TimesheetError> {
    let value = read_config(&config_dir.join(TIMESHEET_JSON))?;
    let config: TimesheetConfig = serde_json::from_value(value)?;
    config.grid.validate()?;
    if config.api.base_url.trim().is_empty() {
        return Err(TimesheetError::Config("api.baseUrl must not be empty".to_string()));
    }
    Ok(config)
}

/// Persists a grid window for the next session. The running session keeps its own.
pub fn save_grid_config(config_dir: &Path, grid: &GridConfig) -> Result<(), TimesheetError> {
    grid.validate()?;
    let path = config_dir.join(TIMESHEET_JSON);
    let mut config = read_config(&path)?;
    let object = config.as_object_mut().ok_or_else(|| {
        TimesheetError::Config(format!("invalid object structure in {}", path.display()))
    })?;
    object.insert("grid".to_string(), serde_json::to_value(grid)?);

    let formatted = serde_json::to_string_pretty(&config)?;
    fs::write(path, format!("{formatted}\n"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static NEXT_TEMP_ID: AtomicUsize = AtomicUsize::new(0);

    struct TempConfigDir {
        path: PathBuf,
    }

    impl TempConfigDir {
        fn new() -> Self {
            let sequence = NEXT_TEMP_ID.fetch_add(1, Ordering::Relaxed);
            let path = std::env::temp_dir().join(format!(
                "timesheet-config-{}-{}-{}",
                std::process::id(),
                chrono::Utc::now().timestamp_nanos_opt().unwrap_or(0),
                sequence
            ));
            fs::create_dir_all(&path).expect("create temp directory");
            Self { path }
        }

        fn path(&self) -> &Path {
            &self.path
        }
    }

    impl Drop for TempConfigDir {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.path);
        }
    }

    #[test]
    fn default_config_roundtrips_through_disk() {
        let temp = TempConfigDir::new();
        ensure_default_config(temp.path()).expect("write defaults");

        let config = load_config(temp.path()).expect("load defaults");
        assert_eq!(config.schema, 1);
        assert_eq!(config.grid, GridConfig::default());
        assert_eq!(config.api, ApiConfig::default());
    }

    #[test]
    fn ensure_default_config_keeps_existing_file() {
        let temp = TempConfigDir::new();
        fs::write(
            temp.path().join(TIMESHEET_JSON),
            r#"{"schema": 1, "grid": {"startHour": 8, "endHour": 18, "intervalMinutes": 30}}"#,
        )
        .expect("seed config");
        ensure_default_config(temp.path()).expect("ensure defaults");

        let config = load_config(temp.path()).expect("load seeded");
        assert_eq!(config.grid.start_hour, 8);
        assert_eq!(config.grid.interval_minutes, 30);
        assert_eq!(config.api.timeout_seconds, DEFAULT_TIMEOUT_SECONDS);
    }

    #[test]
    fn load_config_rejects_bad_schema_and_grid() {
        let temp = TempConfigDir::new();
        let path = temp.path().join(TIMESHEET_JSON);

        fs::write(&path, r#"{"grid": {}}"#).expect("write schemaless");
        assert!(matches!(load_config(temp.path()), Err(TimesheetError::Config(_))));

        fs::write(&path, r#"{"schema": 2}"#).expect("write future schema");
        assert!(matches!(load_config(temp.path()), Err(TimesheetError::Config(_))));

        fs::write(
            &path,
            r#"{"schema": 1, "grid": {"startHour": 7, "endHour": 17, "intervalMinutes": 7}}"#,
        )
        .expect("write uneven interval");
        assert!(matches!(load_config(temp.path()), Err(TimesheetError::Config(_))));
    }

    #[test]
    fn save_grid_config_updates_only_grid() {
        let temp = TempConfigDir::new();
        ensure_default_config(temp.path()).expect("write defaults");

        let grid = GridConfig {
            start_hour: 6,
            end_hour: 22,
            interval_minutes: 30,
        };
        save_grid_config(temp.path(), &grid).expect("save grid");
        let config = load_config(temp.path()).expect("reload");
        assert_eq!(config.grid, grid);
        assert_eq!(config.api, ApiConfig::default());

        let invalid = GridConfig {
            start_hour: 10,
            end_hour: 9,
            interval_minutes: 15,
        };
        assert!(save_grid_config(temp.path(), &invalid).is_err());
    }
}
