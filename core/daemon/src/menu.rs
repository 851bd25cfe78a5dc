//! Terminal rendition of the status menu.
//!
//! `MenuModel` is rebuilt purely from manager events, so it can be driven by
//! the live event channel or seeded from a one-shot snapshot.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use tomcat_manager_core::{AppSnapshot, ManagerEvent};

/// Status light shown next to each application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Indicator {
    /// Deployed and extracted by a running Tomcat.
    Good,
    /// Deployed, Tomcat running, not extracted yet.
    Loading,
    /// Deployed while Tomcat is down.
    Present,
    /// Maven build in progress.
    Warning,
    /// A build log exists but nothing is deployed.
    Error,
    Off,
}

impl Indicator {
    pub fn for_app(app: &AppSnapshot, tomcat_running: bool) -> Self {
        let flags = &app.flags;
        if flags.is_deployed {
            match (tomcat_running, flags.is_extracted) {
                (true, true) => Indicator::Good,
                (true, false) => Indicator::Loading,
                (false, _) => Indicator::Present,
            }
        } else if flags.is_building {
            Indicator::Warning
        } else if flags.has_build_log {
            Indicator::Error
        } else {
            Indicator::Off
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            Indicator::Good => "[up]",
            Indicator::Loading => "[..]",
            Indicator::Present => "[--]",
            Indicator::Warning => "[build]",
            Indicator::Error => "[fail]",
            Indicator::Off => "[  ]",
        }
    }
}

/// Submenu entries; only enabled ones are listed.
pub fn enabled_actions(app: &AppSnapshot) -> Vec<&'static str> {
    let mut actions = Vec::new();
    if app.flags.has_build_log {
        actions.push("logs");
    }
    if app.can_build {
        actions.push("package");
    }
    if app.flags.can_deploy {
        actions.push("deploy");
    }
    if app.flags.is_deployed {
        actions.push("remove");
    }
    actions
}

#[derive(Debug, Clone, Default)]
pub struct MenuModel {
    tomcat_running: bool,
    apps: BTreeMap<String, AppSnapshot>,
    environments: Vec<String>,
    current_environment: Option<String>,
}

impl MenuModel {
    /// Folds one event in. Returns true when the rendered menu would change.
    pub fn apply(&mut self, event: &ManagerEvent) -> bool {
        match event {
            ManagerEvent::DiscoveryFinished { apps } => {
                self.apps = apps
                    .iter()
                    .map(|app| (app.name.clone(), app.clone()))
                    .collect();
                true
            }
            ManagerEvent::TomcatChanged { running } => {
                self.tomcat_running = *running;
                true
            }
            ManagerEvent::AppChanged { app } => {
                self.apps.insert(app.name.clone(), app.clone());
                true
            }
            ManagerEvent::AppRemoved { name } => self.apps.remove(name).is_some(),
            ManagerEvent::EnvironmentsListed { available, current } => {
                self.environments = available.clone();
                self.current_environment = current.clone();
                true
            }
            ManagerEvent::EnvironmentChanged { current } => {
                self.current_environment = current.clone();
                true
            }
            ManagerEvent::TickCompleted { .. }
            | ManagerEvent::BuildStarted { .. }
            | ManagerEvent::BuildFinished { .. }
            | ManagerEvent::ActionSkipped { .. } => false,
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        let (status, toggle) = if self.tomcat_running {
            ("running", "stop")
        } else {
            ("stopped", "start")
        };
        let _ = writeln!(out, "Tomcat: {} ({} available)", status, toggle);

        match &self.current_environment {
            Some(current) => {
                let _ = writeln!(out, "Environment - {}", current);
            }
            None => {
                let _ = writeln!(out, "Environment");
            }
        }
        for env in &self.environments {
            let mark = if Some(env) == self.current_environment.as_ref() {
                "*"
            } else {
                " "
            };
            let _ = writeln!(out, "  {} {}", mark, env);
        }

        if self.apps.is_empty() {
            let _ = writeln!(out, "No web applications found");
        }
        for app in self.apps.values() {
            let indicator = Indicator::for_app(app, self.tomcat_running);
            let _ = writeln!(
                out,
                "{:<7} {:<32} {}",
                indicator.symbol(),
                app.name,
                enabled_actions(app).join(" ")
            );
        }
        out
    }
}
