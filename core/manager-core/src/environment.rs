//! Environment selection through a `dibs` symlink inside Tomcat's home.
//!
//! Each `dibs_<name>` directory is one environment; the bare `dibs` symlink
//! points at the active one.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

use crate::runner::CommandRunner;

pub const LINK_NAME: &str = "dibs";
pub const ENV_PREFIX: &str = "dibs_";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EnvironmentSelection {
    pub available: Vec<String>,
    pub current: Option<String>,
}

#[derive(Debug, Clone)]
pub struct EnvironmentSelector {
    base_dir: PathBuf,
}

impl EnvironmentSelector {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    fn is_configured(&self) -> bool {
        !self.base_dir.as_os_str().is_empty()
    }

    pub async fn selection(&self, runner: &dyn CommandRunner) -> EnvironmentSelection {
        let (available, current) = tokio::join!(self.available(runner), self.current(runner));
        EnvironmentSelection { available, current }
    }

    /// Names of every `dibs_<name>` entry.
    pub async fn available(&self, runner: &dyn CommandRunner) -> Vec<String> {
        if !self.is_configured() {
            return Vec::new();
        }
        let base_dir = self.base_dir.to_string_lossy();
        let response = runner.run("ls", &[base_dir.as_ref()]).await;
        parse_available(&response.output)
    }

    /// Environment the `dibs` symlink currently points at.
    pub async fn current(&self, runner: &dyn CommandRunner) -> Option<String> {
        if !self.is_configured() {
            return None;
        }
        let base_dir = self.base_dir.to_string_lossy();
        let response = runner.run("ls", &["-l", base_dir.as_ref()]).await;
        parse_current(&response.output)
    }

    /// Repoints `dibs` at `dibs_<name>` and reports the resulting current
    /// environment. Failed steps are logged; nothing is rolled back.
    pub async fn switch(&self, runner: &dyn CommandRunner, name: &str) -> Option<String> {
        if !self.is_configured() {
            return None;
        }
        let link = self.base_dir.join(LINK_NAME);
        let target = self.base_dir.join(format!("{}{}", ENV_PREFIX, name));
        let link = link.to_string_lossy();
        let target = target.to_string_lossy();

        let removed = runner.run("rm", &[link.as_ref()]).await;
        if !removed.succeeded() {
            warn!(stderr = ?removed.error, "Failed to remove environment link");
        }
        let linked = runner
            .run("ln", &["-s", target.as_ref(), link.as_ref()])
            .await;
        if linked.succeeded() {
            info!(environment = name, "Switched environment");
        } else {
            warn!(environment = name, stderr = ?linked.error, "Failed to create environment link");
        }

        self.current(runner).await
    }
}

fn parse_available(lines: &[String]) -> Vec<String> {
    lines
        .iter()
        .filter_map(|line| line.trim().strip_prefix(ENV_PREFIX))
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

/// Picks the `dibs -> .../dibs_<name>` line out of `ls -l` output.
fn parse_current(lines: &[String]) -> Option<String> {
    let marker = format!(" {} -> ", LINK_NAME);
    lines.iter().find_map(|line| {
        let (_, target) = line.split_once(&marker)?;
        let file_name = Path::new(target.trim()).file_name()?.to_str()?;
        file_name
            .strip_prefix(ENV_PREFIX)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
    })
}
