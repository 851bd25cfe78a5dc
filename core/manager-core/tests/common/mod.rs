//! Scripted command runner backed by an in-memory set of paths and a fake
//! process table.

#![allow(dead_code)]

use std::collections::BTreeSet;
use std::sync::Mutex;

use async_trait::async_trait;
use tomcat_manager_core::{CommandRunner, ShellResponse};

#[derive(Default)]
pub struct FakeRunner {
    paths: Mutex<BTreeSet<String>>,
    processes: Mutex<Vec<String>>,
    script_outputs: Mutex<Vec<(String, String)>>,
    calls: Mutex<Vec<String>>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_path(&self, path: impl Into<String>) {
        self.paths.lock().unwrap().insert(path.into());
    }

    pub fn has_path(&self, path: &str) -> bool {
        self.paths.lock().unwrap().contains(path)
    }

    pub fn add_process(&self, pid: u32, args: &str) {
        self.processes
            .lock()
            .unwrap()
            .push(format!("{} {}", pid, args));
    }

    /// Login-shell scripts containing `fragment` create `path` when run.
    pub fn create_on_script(&self, fragment: &str, path: impl Into<String>) {
        self.script_outputs
            .lock()
            .unwrap()
            .push((fragment.to_string(), path.into()));
    }

    pub fn clear_processes(&self) {
        self.processes.lock().unwrap().clear();
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Calls other than the read-only probes.
    pub fn mutating_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|call| !call.starts_with("stat ") && !call.starts_with("ps "))
            .collect()
    }
}

fn ok(output: Vec<String>) -> ShellResponse {
    ShellResponse {
        output,
        error: Vec::new(),
        exit_code: 0,
    }
}

fn failed(message: &str) -> ShellResponse {
    ShellResponse {
        output: Vec::new(),
        error: vec![message.to_string()],
        exit_code: 1,
    }
}

#[async_trait]
impl CommandRunner for FakeRunner {
    async fn run(&self, program: &str, args: &[&str]) -> ShellResponse {
        self.calls
            .lock()
            .unwrap()
            .push(format!("{} {}", program, args.join(" ")));

        match program {
            "stat" => {
                let path = args.last().copied().unwrap_or_default();
                if self.has_path(path) {
                    ok(vec![format!("  File: {}", path)])
                } else {
                    failed("stat: cannot stat: No such file or directory")
                }
            }
            "ps" => ok(self.processes.lock().unwrap().clone()),
            "kill" => {
                let pids: Vec<String> = args
                    .iter()
                    .filter(|arg| !arg.starts_with('-'))
                    .map(|pid| format!("{} ", pid))
                    .collect();
                self.processes
                    .lock()
                    .unwrap()
                    .retain(|process| !pids.iter().any(|pid| process.starts_with(pid.as_str())));
                ok(Vec::new())
            }
            "/bin/bash" => {
                let script = args.last().copied().unwrap_or_default();
                let created: Vec<String> = self
                    .script_outputs
                    .lock()
                    .unwrap()
                    .iter()
                    .filter(|(fragment, _)| script.contains(fragment.as_str()))
                    .map(|(_, path)| path.clone())
                    .collect();
                for path in created {
                    self.add_path(path);
                }
                ok(Vec::new())
            }
            "rm" => {
                let path = args.last().copied().unwrap_or_default().to_string();
                let mut paths = self.paths.lock().unwrap();
                let prefix = format!("{}/", path);
                paths.retain(|existing| existing != &path && !existing.starts_with(&prefix));
                ok(Vec::new())
            }
            "cp" => match args {
                [source, target] if self.has_path(source) => {
                    self.add_path(*target);
                    ok(Vec::new())
                }
                _ => failed("cp: no such file"),
            },
            _ => ok(Vec::new()),
        }
    }
}
