//! User-triggered actions on a single application.
//!
//! Each action only issues commands; the caller refreshes the app's flags
//! afterwards. Actions that need a build descriptor are skipped for
//! deploy-only applications.

use std::path::Path;

use fs_err as fs;
use tracing::{info, warn};

use crate::app::{TomcatLayout, TrackedApplication};
use crate::error::{ManagerError, Result};
use crate::runner::{shell_quote, CommandRunner, ShellResponse};

/// Fixed flags for `mvn clean package`.
pub const MAVEN_FLAGS: &str = "-DskipTests -DskipRestdoc clean package";

/// Why an action was not performed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Skipped {
    NoDescriptor,
}

impl std::fmt::Display for Skipped {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Skipped::NoDescriptor => f.write_str("no build descriptor known"),
        }
    }
}

/// Script that builds `app`, writing all output to its build log.
///
/// Returns `None` for apps without a descriptor.
pub fn build_script(app: &TrackedApplication, layout: &TomcatLayout) -> Option<String> {
    let descriptor = app.descriptor_path.as_ref()?;
    Some(format!(
        "mvn {} -f {} > {} 2>&1",
        MAVEN_FLAGS,
        shell_quote(&descriptor.to_string_lossy()),
        shell_quote(&layout.build_log(app.name()).to_string_lossy()),
    ))
}

/// Clears the stale war and the previous build log ahead of a build.
pub async fn prepare_build(
    runner: &dyn CommandRunner,
    app: &TrackedApplication,
    layout: &TomcatLayout,
) -> std::result::Result<(), Skipped> {
    if !app.can_build() {
        return Err(Skipped::NoDescriptor);
    }
    if app.flags.can_deploy {
        if let Some(built_war) = app.built_war() {
            remove_file(runner, &built_war).await;
        }
    }
    if app.flags.has_build_log {
        remove_file(runner, &layout.build_log(app.name())).await;
    }
    Ok(())
}

/// Copies the built war into `webapps`.
pub async fn deploy(
    runner: &dyn CommandRunner,
    app: &TrackedApplication,
    layout: &TomcatLayout,
) -> std::result::Result<ShellResponse, Skipped> {
    let built_war = app.built_war().ok_or(Skipped::NoDescriptor)?;
    let source = built_war.to_string_lossy();
    let target = layout.deployed_war(app.name());
    let target = target.to_string_lossy();
    let response = runner.run("cp", &[source.as_ref(), target.as_ref()]).await;
    if response.succeeded() {
        info!(app = app.name(), "Deployed war");
    } else {
        warn!(app = app.name(), stderr = ?response.error, "Deploy failed");
    }
    Ok(response)
}

/// Deletes the extracted directory and the deployed war.
pub async fn remove(runner: &dyn CommandRunner, app: &TrackedApplication, layout: &TomcatLayout) {
    let extracted = layout.extracted_dir(app.name());
    let extracted = extracted.to_string_lossy();
    runner.run("rm", &["-rf", extracted.as_ref()]).await;
    remove_file(runner, &layout.deployed_war(app.name())).await;
    info!(app = app.name(), "Removed deployed artifacts");
}

/// Contents of the app's build log, if one exists.
pub fn read_build_log(app: &TrackedApplication, layout: &TomcatLayout) -> Result<Option<String>> {
    let path = layout.build_log(app.name());
    match fs::read_to_string(&path) {
        Ok(contents) => Ok(Some(contents)),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(ManagerError::Io {
            context: format!("reading build log {}", path.display()),
            source,
        }),
    }
}

async fn remove_file(runner: &dyn CommandRunner, path: &Path) {
    let path = path.to_string_lossy();
    runner.run("rm", &["-f", path.as_ref()]).await;
}
