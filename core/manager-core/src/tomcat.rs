//! Tomcat process control: status, startup and shutdown.

use std::time::Duration;

use tracing::{info, warn};

use crate::app::TomcatLayout;
use crate::probes;
use crate::runner::{shell_quote, CommandRunner, ShellResponse};

/// Command-line fragment identifying a running Tomcat JVM.
pub const BOOTSTRAP_PATTERN: &str = "org.apache.catalina.startup.Bootstrap";

const SHUTDOWN_POLL_INTERVAL: Duration = Duration::from_millis(500);

pub async fn pid(runner: &dyn CommandRunner) -> Option<u32> {
    probes::first_matching_pid(runner, &[BOOTSTRAP_PATTERN]).await
}

pub async fn is_running(runner: &dyn CommandRunner) -> bool {
    probes::process_matches(runner, &[BOOTSTRAP_PATTERN]).await
}

/// Runs `bin/startup.sh`. A missing or failing script is reported in the
/// response, never raised.
pub async fn startup(runner: &dyn CommandRunner, layout: &TomcatLayout) -> ShellResponse {
    run_bin_script(runner, layout, "startup.sh").await
}

/// Runs `bin/shutdown.sh`, waits up to `grace`, then force-kills whatever
/// Tomcat processes remain. Returns the number of processes killed.
pub async fn shutdown(runner: &dyn CommandRunner, layout: &TomcatLayout, grace: Duration) -> usize {
    run_bin_script(runner, layout, "shutdown.sh").await;

    let deadline = tokio::time::Instant::now() + grace;
    loop {
        let leftovers = probes::matching_pids(runner, &[BOOTSTRAP_PATTERN]).await;
        if leftovers.is_empty() {
            return 0;
        }
        if tokio::time::Instant::now() >= deadline {
            return force_kill(runner, &leftovers).await;
        }
        tokio::time::sleep(SHUTDOWN_POLL_INTERVAL).await;
    }
}

async fn force_kill(runner: &dyn CommandRunner, pids: &[u32]) -> usize {
    let pid_args: Vec<String> = pids.iter().map(u32::to_string).collect();
    let mut args = vec!["-9"];
    args.extend(pid_args.iter().map(String::as_str));
    let response = runner.run("kill", &args).await;
    if response.succeeded() {
        warn!(pids = ?pids, "Force-killed Tomcat processes after shutdown grace period");
    } else {
        warn!(pids = ?pids, stderr = ?response.error, "Failed to force-kill Tomcat processes");
    }
    pids.len()
}

async fn run_bin_script(
    runner: &dyn CommandRunner,
    layout: &TomcatLayout,
    script: &str,
) -> ShellResponse {
    let path = layout.bin_script(script);
    let response = runner
        .run_as_user(&shell_quote(&path.to_string_lossy()))
        .await;
    if response.succeeded() {
        info!(script, "Tomcat script finished");
    } else {
        warn!(
            script,
            path = %path.display(),
            exit_code = response.exit_code,
            stderr = ?response.error,
            "Tomcat script failed"
        );
    }
    response
}
