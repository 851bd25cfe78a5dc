//! Storage paths for Tomcat Manager data.
//!
//! Production code uses `StorageConfig::from_home()` which points to
//! `~/.tomcat-manager/`. Tests use `StorageConfig::with_root(temp_dir)`.

use std::path::{Path, PathBuf};

use crate::error::{ManagerError, Result};

const ROOT_DIR_NAME: &str = ".tomcat-manager";

#[derive(Debug, Clone)]
pub struct StorageConfig {
    root: PathBuf,
}

impl StorageConfig {
    pub fn from_home() -> Result<Self> {
        let home = dirs::home_dir().ok_or(ManagerError::HomeDirNotFound)?;
        Ok(Self {
            root: home.join(ROOT_DIR_NAME),
        })
    }

    pub fn with_root(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path to config.json (preferences).
    pub fn config_file(&self) -> PathBuf {
        self.root.join("config.json")
    }

    /// Path to the PID file held by a running `watch`.
    pub fn instance_file(&self) -> PathBuf {
        self.root.join("manager.pid")
    }

    /// Directory for rolling log files.
    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }
}
