//! Asynchronous command execution with normalized output.
//!
//! Every probe and action in the crate goes through [`CommandRunner`]. The
//! production implementation spawns real subprocesses; tests inject a scripted
//! runner instead.
//!
//! A runner never fails: a non-zero exit code or a process that cannot be
//! spawned is reported inside [`ShellResponse`], and the caller decides what
//! that means.

use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::patterns::RE_ANSI_ESCAPE;

/// Shell used for commands that need the user's login environment
/// (`PATH` for `mvn`, `CATALINA_HOME`, ...).
pub const LOGIN_SHELL: &str = "/bin/bash";

/// Exit code reported when the process could not be spawned at all.
pub const SPAWN_FAILURE_EXIT_CODE: i32 = -1;

/// Normalized result of one command invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ShellResponse {
    pub output: Vec<String>,
    pub error: Vec<String>,
    pub exit_code: i32,
}

impl ShellResponse {
    pub fn from_raw(stdout: &[u8], stderr: &[u8], exit_code: i32) -> Self {
        Self {
            output: normalize_lines(&String::from_utf8_lossy(stdout)),
            error: normalize_lines(&String::from_utf8_lossy(stderr)),
            exit_code,
        }
    }

    fn spawn_failure(program: &str, err: &std::io::Error) -> Self {
        Self {
            output: Vec::new(),
            error: vec![format!("failed to spawn {}: {}", program, err)],
            exit_code: SPAWN_FAILURE_EXIT_CODE,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.exit_code == 0
    }

    /// Exit 0 and nothing on stderr.
    pub fn is_clean(&self) -> bool {
        self.succeeded() && self.error.is_empty()
    }

    pub fn first_line(&self) -> Option<&str> {
        self.output.first().map(String::as_str)
    }
}

/// Trims, strips ANSI escapes, and splits into lines.
///
/// An output that is empty after trimming yields no lines at all.
pub fn normalize_lines(raw: &str) -> Vec<String> {
    let cleaned = RE_ANSI_ESCAPE.replace_all(raw.trim(), "");
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return Vec::new();
    }
    cleaned
        .split('\n')
        .map(|line| line.trim().to_string())
        .collect()
}

/// Quotes a value for interpolation into a `bash -c` script.
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Runs `program` with `args`, waiting for it to exit.
    async fn run(&self, program: &str, args: &[&str]) -> ShellResponse;

    /// Runs a script through the login shell so the user's profile applies.
    async fn run_as_user(&self, script: &str) -> ShellResponse {
        self.run(LOGIN_SHELL, &["-l", "-c", script]).await
    }
}

/// Runs commands as real subprocesses.
#[derive(Debug, Clone, Default)]
pub struct ShellRunner;

impl ShellRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandRunner for ShellRunner {
    async fn run(&self, program: &str, args: &[&str]) -> ShellResponse {
        trace!(program, ?args, "spawning command");

        // `output()` drains both pipes concurrently and reaps the child.
        let result = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await;

        let response = match result {
            Ok(output) => ShellResponse::from_raw(
                &output.stdout,
                &output.stderr,
                output.status.code().unwrap_or(SPAWN_FAILURE_EXIT_CODE),
            ),
            Err(err) => ShellResponse::spawn_failure(program, &err),
        };

        debug!(
            program,
            exit_code = response.exit_code,
            stdout_lines = response.output.len(),
            stderr_lines = response.error.len(),
            "command finished"
        );
        if !response.error.is_empty() {
            trace!(program, stderr = ?response.error, "command stderr");
        }
        response
    }
}

/// Runs a login-shell script on a detached task.
///
/// The caller may await the handle for the result or drop it.
pub fn spawn_as_user(runner: Arc<dyn CommandRunner>, script: String) -> JoinHandle<ShellResponse> {
    tokio::spawn(async move { runner.run_as_user(&script).await })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_trims_and_splits() {
        assert_eq!(normalize_lines("  foo\nbar  \n"), vec!["foo", "bar"]);
    }

    #[test]
    fn normalize_empty_output_yields_no_lines() {
        assert!(normalize_lines("").is_empty());
        assert!(normalize_lines("\n\n  \n").is_empty());
    }

    #[test]
    fn normalize_strips_ansi_sequences() {
        assert_eq!(
            normalize_lines("\x1B[31merror\x1B[0m\r\nplain\n"),
            vec!["error", "plain"]
        );
    }

    #[test]
    fn shell_quote_escapes_single_quotes() {
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
        assert_eq!(shell_quote("/tmp/a b"), "'/tmp/a b'");
    }

    #[tokio::test]
    async fn shell_runner_captures_both_streams() {
        let runner = ShellRunner::new();
        let response = runner
            .run("/bin/sh", &["-c", "printf '  foo\\nbar  \\n'; exit 3"])
            .await;
        assert_eq!(response.output, vec!["foo", "bar"]);
        assert!(response.error.is_empty());
        assert_eq!(response.exit_code, 3);
    }

    #[tokio::test]
    async fn shell_runner_reports_stderr_without_failing() {
        let runner = ShellRunner::new();
        let response = runner.run("/bin/sh", &["-c", "echo oops >&2"]).await;
        assert!(response.output.is_empty());
        assert_eq!(response.error, vec!["oops"]);
        assert!(response.succeeded());
        assert!(!response.is_clean());
    }

    #[tokio::test]
    async fn shell_runner_reports_spawn_failure_as_exit_code() {
        let runner = ShellRunner::new();
        let response = runner.run("/definitely/not/a/binary", &[]).await;
        assert_eq!(response.exit_code, SPAWN_FAILURE_EXIT_CODE);
        assert_eq!(response.error.len(), 1);
    }
}
