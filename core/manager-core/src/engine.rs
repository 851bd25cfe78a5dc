//! The manager: sole owner of the registry.
//!
//! `Manager` can be driven directly (one-shot CLI commands await each
//! operation) or handed to [`Manager::spawn`], which runs the periodic tick
//! loop on one task and serializes user actions arriving over a channel.
//! Long-running work (Maven builds, Tomcat scripts) runs on detached tasks
//! and reports back to the loop; the registry is never touched elsewhere.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::actions::{self, Skipped};
use crate::app::{AppFlags, TomcatLayout, TrackedApplication};
use crate::config::Preferences;
use crate::discovery;
use crate::environment::{EnvironmentSelection, EnvironmentSelector};
use crate::error::{ManagerError, Result};
use crate::events::{ActionKind, ManagerEvent};
use crate::reconciler::{self, Reconciler};
use crate::registry::Registry;
use crate::runner::{spawn_as_user, CommandRunner, ShellResponse};
use crate::tomcat;

const ACTION_QUEUE_DEPTH: usize = 32;

/// Requests accepted by a running manager loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Rescan,
    StartTomcat,
    StopTomcat,
    Build(String),
    Deploy(String),
    Remove(String),
    RefreshEnvironments,
    SwitchEnvironment(String),
}

/// Results of detached work, delivered back to the loop.
#[derive(Debug)]
enum Completion {
    Build { name: String, response: ShellResponse },
    Lifecycle,
}

/// Sends actions to a spawned manager loop.
#[derive(Debug, Clone)]
pub struct ManagerHandle {
    actions: mpsc::Sender<Action>,
}

impl ManagerHandle {
    pub async fn send(&self, action: Action) -> Result<()> {
        self.actions
            .send(action)
            .await
            .map_err(|_| ManagerError::ManagerStopped)
    }
}

pub struct Manager {
    runner: Arc<dyn CommandRunner>,
    layout: TomcatLayout,
    repository_root: PathBuf,
    environments: EnvironmentSelector,
    registry: Registry,
    reconciler: Reconciler,
    events: mpsc::UnboundedSender<ManagerEvent>,
    tick_interval: Duration,
    tick_tolerance: Duration,
    shutdown_grace: Duration,
}

impl Manager {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        prefs: &Preferences,
        events: mpsc::UnboundedSender<ManagerEvent>,
    ) -> Self {
        let layout = prefs.layout();
        Self {
            environments: EnvironmentSelector::new(layout.catalina_home.clone()),
            runner,
            layout,
            repository_root: prefs.repository_root(),
            registry: Registry::new(),
            reconciler: Reconciler::new(),
            events,
            tick_interval: prefs.tick_interval(),
            tick_tolerance: prefs.tick_tolerance(),
            shutdown_grace: prefs.shutdown_grace(),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn layout(&self) -> &TomcatLayout {
        &self.layout
    }

    /// Tomcat status as of the last tick.
    pub fn tomcat_running(&self) -> bool {
        self.reconciler.tomcat_running()
    }

    fn emit(&self, event: ManagerEvent) {
        if self.events.send(event).is_err() {
            debug!("No event listener; dropping manager event");
        }
    }

    fn app(&self, name: &str) -> Result<TrackedApplication> {
        self.registry
            .get(name)
            .cloned()
            .ok_or_else(|| ManagerError::AppNotFound(name.to_string()))
    }

    // ─────────────────────────────────────────────────────────────────────
    // Discovery & reconciliation
    // ─────────────────────────────────────────────────────────────────────

    /// Rebuilds the registry from both sources and refreshes every app.
    pub async fn discover(&mut self) {
        self.registry = discovery::discover(&self.repository_root, &self.layout).await;
        info!(apps = self.registry.len(), "Discovery finished");

        let apps: Vec<TrackedApplication> = self.registry.iter().cloned().collect();
        let report = reconciler::probe_all(self.runner.as_ref(), &self.layout, &apps).await;
        // Change events are subsumed by the full snapshot below.
        self.reconciler.merge(&mut self.registry, report);

        self.emit(ManagerEvent::DiscoveryFinished {
            apps: self.registry.snapshots(),
        });
    }

    /// One reconciliation pass over Tomcat and every tracked app.
    pub async fn tick(&mut self) {
        let apps: Vec<TrackedApplication> = self.registry.iter().cloned().collect();
        let report = reconciler::probe_all(self.runner.as_ref(), &self.layout, &apps).await;
        for event in self.reconciler.merge(&mut self.registry, report) {
            self.emit(event);
        }
    }

    /// Re-probes one app after an action, emitting `AppChanged` on change.
    pub async fn refresh_app(&mut self, name: &str) -> Option<AppFlags> {
        let app = self.registry.get(name)?.clone();
        let flags = reconciler::probe_app(self.runner.as_ref(), &self.layout, &app).await;
        if self.registry.apply_flags(name, flags) {
            if let Some(app) = self.registry.get(name) {
                self.emit(ManagerEvent::AppChanged {
                    app: app.snapshot(),
                });
            }
        }
        Some(flags)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Tomcat
    // ─────────────────────────────────────────────────────────────────────

    /// PID of the running Tomcat JVM, probed now.
    pub async fn tomcat_pid(&self) -> Option<u32> {
        tomcat::pid(self.runner.as_ref()).await
    }

    pub async fn start_tomcat(&self) -> ShellResponse {
        tomcat::startup(self.runner.as_ref(), &self.layout).await
    }

    /// Returns the number of processes that had to be force-killed.
    pub async fn stop_tomcat(&self) -> usize {
        tomcat::shutdown(self.runner.as_ref(), &self.layout, self.shutdown_grace).await
    }

    // ─────────────────────────────────────────────────────────────────────
    // Application actions
    // ─────────────────────────────────────────────────────────────────────

    fn skipped(&self, name: &str, action: ActionKind, reason: Skipped) {
        info!(app = name, %action, %reason, "Action skipped");
        self.emit(ManagerEvent::ActionSkipped {
            name: name.to_string(),
            action,
            reason: reason.to_string(),
        });
    }

    /// Clears old artifacts and launches Maven on a detached task.
    ///
    /// Returns `None` when the app cannot be built.
    pub async fn start_build(&mut self, name: &str) -> Result<Option<JoinHandle<ShellResponse>>> {
        let app = self.app(name)?;
        if let Err(reason) = actions::prepare_build(self.runner.as_ref(), &app, &self.layout).await {
            self.skipped(name, ActionKind::Build, reason);
            return Ok(None);
        }
        let Some(script) = actions::build_script(&app, &self.layout) else {
            self.skipped(name, ActionKind::Build, Skipped::NoDescriptor);
            return Ok(None);
        };

        info!(app = name, "Starting Maven build");
        self.emit(ManagerEvent::BuildStarted {
            name: name.to_string(),
            log: self.layout.build_log(name).to_string_lossy().into_owned(),
        });
        let handle = spawn_as_user(Arc::clone(&self.runner), script);
        self.refresh_app(name).await;
        Ok(Some(handle))
    }

    /// Reports a finished build and refreshes the app.
    pub async fn finish_build(&mut self, name: &str, response: &ShellResponse) {
        if response.succeeded() {
            info!(app = name, "Maven build finished");
        } else {
            warn!(app = name, exit_code = response.exit_code, "Maven build failed");
        }
        self.emit(ManagerEvent::BuildFinished {
            name: name.to_string(),
            exit_code: response.exit_code,
        });
        self.refresh_app(name).await;
    }

    /// Builds and waits for Maven to exit.
    pub async fn build(&mut self, name: &str) -> Result<Option<ShellResponse>> {
        let Some(handle) = self.start_build(name).await? else {
            return Ok(None);
        };
        let response = handle.await.map_err(|err| ManagerError::Io {
            context: format!("waiting for build of {}", name),
            source: std::io::Error::other(err),
        })?;
        self.finish_build(name, &response).await;
        Ok(Some(response))
    }

    pub async fn deploy(&mut self, name: &str) -> Result<Option<ShellResponse>> {
        let app = self.app(name)?;
        match actions::deploy(self.runner.as_ref(), &app, &self.layout).await {
            Ok(response) => {
                self.refresh_app(name).await;
                Ok(Some(response))
            }
            Err(reason) => {
                self.skipped(name, ActionKind::Deploy, reason);
                Ok(None)
            }
        }
    }

    /// Deletes deployed artifacts. Apps without a descriptor and with nothing
    /// left on disk are evicted; the rest stay as known-but-undeployed.
    ///
    /// Returns true if the app was evicted.
    pub async fn remove(&mut self, name: &str) -> Result<bool> {
        let app = self.app(name)?;
        actions::remove(self.runner.as_ref(), &app, &self.layout).await;

        let flags = self.refresh_app(name).await.unwrap_or_default();
        if !app.can_build() && !flags.has_artifacts() {
            self.registry.remove(name);
            info!(app = name, "Evicted removed application");
            self.emit(ManagerEvent::AppRemoved {
                name: name.to_string(),
            });
            return Ok(true);
        }
        Ok(false)
    }

    pub fn build_log(&self, name: &str) -> Result<Option<String>> {
        let app = self.app(name)?;
        actions::read_build_log(&app, &self.layout)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Environments
    // ─────────────────────────────────────────────────────────────────────

    pub async fn refresh_environments(&self) -> EnvironmentSelection {
        let selection = self.environments.selection(self.runner.as_ref()).await;
        self.emit(ManagerEvent::EnvironmentsListed {
            available: selection.available.clone(),
            current: selection.current.clone(),
        });
        selection
    }

    pub async fn switch_environment(&self, name: &str) -> Option<String> {
        let current = self.environments.switch(self.runner.as_ref(), name).await;
        self.emit(ManagerEvent::EnvironmentChanged {
            current: current.clone(),
        });
        current
    }

    // ─────────────────────────────────────────────────────────────────────
    // Control loop
    // ─────────────────────────────────────────────────────────────────────

    /// Runs the control loop on its own task.
    pub fn spawn(self) -> (ManagerHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(ACTION_QUEUE_DEPTH);
        let task = tokio::spawn(self.run(rx));
        (ManagerHandle { actions: tx }, task)
    }

    /// Discovers, then ticks at the configured interval until every action
    /// sender is dropped.
    pub async fn run(mut self, mut actions: mpsc::Receiver<Action>) {
        let (done_tx, mut done_rx) = mpsc::unbounded_channel();

        self.discover().await;
        self.refresh_environments().await;

        let mut interval = tokio::time::interval(self.tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let started = Instant::now();
                    self.tick().await;
                    let elapsed = started.elapsed();
                    if elapsed > self.tick_interval + self.tick_tolerance {
                        warn!(elapsed_ms = elapsed.as_millis() as u64, "Reconciliation tick overran its interval");
                    }
                }
                action = actions.recv() => match action {
                    Some(action) => self.handle(action, &done_tx).await,
                    None => break,
                },
                Some(completion) = done_rx.recv() => self.complete(completion).await,
            }
        }
        info!("Manager loop stopped");
    }

    async fn handle(&mut self, action: Action, done: &mpsc::UnboundedSender<Completion>) {
        debug!(?action, "Handling action");
        let result = match action {
            Action::Rescan => {
                self.discover().await;
                Ok(())
            }
            Action::StartTomcat => {
                let (runner, layout) = (Arc::clone(&self.runner), self.layout.clone());
                let done = done.clone();
                tokio::spawn(async move {
                    tomcat::startup(runner.as_ref(), &layout).await;
                    let _ = done.send(Completion::Lifecycle);
                });
                Ok(())
            }
            Action::StopTomcat => {
                let (runner, layout) = (Arc::clone(&self.runner), self.layout.clone());
                let grace = self.shutdown_grace;
                let done = done.clone();
                tokio::spawn(async move {
                    tomcat::shutdown(runner.as_ref(), &layout, grace).await;
                    let _ = done.send(Completion::Lifecycle);
                });
                Ok(())
            }
            Action::Build(name) => match self.start_build(&name).await {
                Ok(Some(handle)) => {
                    let done = done.clone();
                    tokio::spawn(async move {
                        let response = handle.await.unwrap_or_else(|err| ShellResponse {
                            error: vec![err.to_string()],
                            exit_code: crate::runner::SPAWN_FAILURE_EXIT_CODE,
                            ..ShellResponse::default()
                        });
                        let _ = done.send(Completion::Build { name, response });
                    });
                    Ok(())
                }
                Ok(None) => Ok(()),
                Err(err) => Err(err),
            },
            Action::Deploy(name) => self.deploy(&name).await.map(|_| ()),
            Action::Remove(name) => self.remove(&name).await.map(|_| ()),
            Action::RefreshEnvironments => {
                self.refresh_environments().await;
                Ok(())
            }
            Action::SwitchEnvironment(name) => {
                self.switch_environment(&name).await;
                Ok(())
            }
        };
        if let Err(err) = result {
            warn!(error = %err, "Action failed");
        }
    }

    async fn complete(&mut self, completion: Completion) {
        match completion {
            Completion::Build { name, response } => self.finish_build(&name, &response).await,
            Completion::Lifecycle => self.tick().await,
        }
    }
}
