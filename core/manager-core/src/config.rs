//! Preferences loading and saving.
//!
//! Preferences live in `config.json` under the storage root. A missing or
//! corrupt file loads as defaults. On first launch (no `last_launch` stamp)
//! the Tomcat home is read from `$CATALINA_HOME` in the user's login shell
//! and the repository root is derived from the home directory.

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use fs_err as fs;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::app::TomcatLayout;
use crate::error::{ManagerError, Result};
use crate::runner::CommandRunner;
use crate::storage::StorageConfig;

const DEFAULT_REPOSITORY_DIR: &str = "Developer";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub catalina_home: String,
    pub repository_root: String,
    pub launch_on_login: bool,
    pub show_on_launch: bool,
    pub last_launch: Option<DateTime<Utc>>,
    pub tick_interval_ms: u64,
    pub tick_tolerance_ms: u64,
    pub shutdown_grace_secs: u64,
    pub build_log_dir: String,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            catalina_home: String::new(),
            repository_root: String::new(),
            launch_on_login: true,
            show_on_launch: true,
            last_launch: None,
            tick_interval_ms: 1000,
            tick_tolerance_ms: 200,
            shutdown_grace_secs: 5,
            build_log_dir: "/tmp".to_string(),
        }
    }
}

impl Preferences {
    /// Loads preferences, returning defaults if the file is missing or corrupt.
    pub fn load(storage: &StorageConfig) -> Self {
        let path = storage.config_file();
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(_) => return Self::default(),
        };
        serde_json::from_str(&contents).unwrap_or_else(|err| {
            warn!(path = %path.display(), error = %err, "Ignoring malformed preferences");
            Self::default()
        })
    }

    /// Loads preferences, filling computed defaults on first launch, and
    /// stamps `last_launch`.
    pub async fn load_or_init(storage: &StorageConfig, runner: &dyn CommandRunner) -> Result<Self> {
        let mut prefs = Self::load(storage);
        if prefs.last_launch.is_none() {
            info!("First launch; computing default preferences");
            prefs.apply_first_launch_defaults(runner).await;
        }
        prefs.last_launch = Some(Utc::now());
        prefs.save(storage)?;
        Ok(prefs)
    }

    async fn apply_first_launch_defaults(&mut self, runner: &dyn CommandRunner) {
        if self.catalina_home.is_empty() {
            let response = runner.run_as_user("echo $CATALINA_HOME").await;
            self.catalina_home = response.first_line().unwrap_or_default().to_string();
        }
        if self.repository_root.is_empty() {
            if let Some(home) = dirs::home_dir() {
                self.repository_root = home
                    .join(DEFAULT_REPOSITORY_DIR)
                    .to_string_lossy()
                    .into_owned();
            }
        }
    }

    pub fn save(&self, storage: &StorageConfig) -> Result<()> {
        let path = storage.config_file();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| ManagerError::ConfigWriteFailed {
                path: path.clone(),
                source,
            })?;
        }
        let content = serde_json::to_string_pretty(self).map_err(|source| ManagerError::Json {
            context: "serializing preferences".to_string(),
            source,
        })?;
        fs::write(&path, content).map_err(|source| ManagerError::ConfigWriteFailed { path, source })
    }

    /// Sets one preference from its string form.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let invalid = || ManagerError::InvalidPreferenceValue {
            key: key.to_string(),
            value: value.to_string(),
        };
        match key {
            "catalina_home" => self.catalina_home = value.to_string(),
            "repository_root" => self.repository_root = value.to_string(),
            "build_log_dir" => self.build_log_dir = value.to_string(),
            "launch_on_login" => self.launch_on_login = value.parse().map_err(|_| invalid())?,
            "show_on_launch" => self.show_on_launch = value.parse().map_err(|_| invalid())?,
            "tick_interval_ms" => {
                self.tick_interval_ms = value
                    .parse()
                    .ok()
                    .filter(|ms: &u64| *ms > 0)
                    .ok_or_else(invalid)?
            }
            "tick_tolerance_ms" => self.tick_tolerance_ms = value.parse().map_err(|_| invalid())?,
            "shutdown_grace_secs" => {
                self.shutdown_grace_secs = value.parse().map_err(|_| invalid())?
            }
            _ => return Err(ManagerError::UnknownPreference(key.to_string())),
        }
        Ok(())
    }

    pub fn layout(&self) -> TomcatLayout {
        TomcatLayout::new(&self.catalina_home, &self.build_log_dir)
    }

    pub fn repository_root(&self) -> PathBuf {
        PathBuf::from(&self.repository_root)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    pub fn tick_tolerance(&self) -> Duration {
        Duration::from_millis(self.tick_tolerance_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageConfig::with_root(dir.path().to_path_buf());
        assert_eq!(Preferences::load(&storage), Preferences::default());
    }

    #[test]
    fn corrupt_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageConfig::with_root(dir.path().to_path_buf());
        std::fs::write(storage.config_file(), "{not json").unwrap();
        assert_eq!(Preferences::load(&storage), Preferences::default());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageConfig::with_root(dir.path().join("nested"));
        let mut prefs = Preferences::default();
        prefs.set("catalina_home", "/opt/tomcat").unwrap();
        prefs.set("launch_on_login", "false").unwrap();
        prefs.save(&storage).unwrap();

        let loaded = Preferences::load(&storage);
        assert_eq!(loaded.catalina_home, "/opt/tomcat");
        assert!(!loaded.launch_on_login);
    }

    #[test]
    fn partial_file_fills_missing_fields() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageConfig::with_root(dir.path().to_path_buf());
        std::fs::write(storage.config_file(), r#"{"catalina_home":"/srv/tomcat"}"#).unwrap();
        let loaded = Preferences::load(&storage);
        assert_eq!(loaded.catalina_home, "/srv/tomcat");
        assert_eq!(loaded.tick_interval_ms, 1000);
    }

    #[test]
    fn set_rejects_unknown_keys_and_bad_values() {
        let mut prefs = Preferences::default();
        assert!(matches!(
            prefs.set("colour", "blue"),
            Err(ManagerError::UnknownPreference(_))
        ));
        assert!(matches!(
            prefs.set("show_on_launch", "maybe"),
            Err(ManagerError::InvalidPreferenceValue { .. })
        ));
        assert!(prefs.set("tick_interval_ms", "0").is_err());
    }
}
