//! Application configuration stored as JSON next to the database.

use crate::error::{Result, TrackerError};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "tracker.json";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// SQLite file holding cards, sessions and the simulated clock.
    pub database_path: PathBuf,
    /// Profile whose cards are shown. There is no login, so this is fixed per config.
    pub user_id: i64,
    /// `EnvFilter` directive used when `RUST_LOG` is not set.
    pub log_filter: String,
    pub window_width: f32,
    pub window_height: f32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("db.sqlite3"),
            user_id: 1,
            log_filter: "study_tracker=info".to_string(),
            window_width: 500.0,
            window_height: 700.0,
        }
    }
}

impl AppConfig {
    /// Reads a config from a JSON file. Missing fields take their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;

        serde_json::from_str(&contents).map_err(|e| TrackerError::Config(e.to_string()))
    }

    /// Writes the config as pretty JSON, creating parent directories as needed.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json_string =
            serde_json::to_string_pretty(self).map_err(|e| TrackerError::Config(e.to_string()))?;
        let mut file = File::create(path)?;
        file.write_all(json_string.as_bytes())?;
        Ok(())
    }

    /// Loads `path` if it exists, otherwise the defaults, then applies
    /// `TRACKER_DB` and `TRACKER_USER` overrides.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            Self::from_file(path)?
        } else {
            Self::default()
        };
        config.apply_overrides(
            std::env::var("TRACKER_DB").ok(),
            std::env::var("TRACKER_USER").ok(),
        )?;
        Ok(config)
    }

    fn apply_overrides(&mut self, db: Option<String>, user: Option<String>) -> Result<()> {
        if let Some(db) = db.filter(|s| !s.trim().is_empty()) {
            self.database_path = PathBuf::from(db);
        }
        if let Some(user) = user {
            self.user_id = user
                .trim()
                .parse()
                .map_err(|_| TrackerError::Config(format!("TRACKER_USER is not an id: {user}")))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("tracker.json");

        let config = AppConfig {
            database_path: PathBuf::from("/tmp/cards.sqlite3"),
            user_id: 7,
            ..AppConfig::default()
        };
        config.save_to_file(&path).unwrap();

        let loaded = AppConfig::from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tracker.json");
        std::fs::write(&path, r#"{ "user_id": 3 }"#).unwrap();

        let loaded = AppConfig::from_file(&path).unwrap();
        assert_eq!(loaded.user_id, 3);
        assert_eq!(loaded.database_path, PathBuf::from("db.sqlite3"));
    }

    #[test]
    fn test_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tracker.json");
        std::fs::write(&path, "{ this is not valid json }").unwrap();

        let result = AppConfig::from_file(&path);
        assert!(matches!(result, Err(TrackerError::Config(_))));
    }

    #[test]
    fn test_nonexistent_file() {
        let result = AppConfig::from_file(Path::new("/nonexistent/tracker_xyz123.json"));
        assert!(matches!(result, Err(TrackerError::Io(_))));
    }

    #[test]
    fn test_overrides() {
        let mut config = AppConfig::default();
        config
            .apply_overrides(Some("other.sqlite3".to_string()), Some(" 42 ".to_string()))
            .unwrap();
        assert_eq!(config.database_path, PathBuf::from("other.sqlite3"));
        assert_eq!(config.user_id, 42);

        let bad = config.apply_overrides(None, Some("abc".to_string()));
        assert!(matches!(bad, Err(TrackerError::Config(_))));
    }
}
