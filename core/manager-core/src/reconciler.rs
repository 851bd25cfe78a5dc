//! One reconciliation pass: probe everything concurrently, then merge.
//!
//! Probing borrows nothing mutable, so it can run while the registry owner
//! waits. Merging happens afterwards on the owner, which is the only place
//! flags change.

use futures::future::join_all;
use tracing::debug;

use crate::app::{AppFlags, TomcatLayout, TrackedApplication};
use crate::events::ManagerEvent;
use crate::probes::{path_exists, process_with_option};
use crate::registry::Registry;
use crate::runner::CommandRunner;
use crate::tomcat;

/// Raw results of one tick, before merging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickReport {
    pub tomcat_running: bool,
    pub apps: Vec<(String, AppFlags)>,
}

/// Runs every probe for one application concurrently.
///
/// The build-process probe only runs when a descriptor is known; otherwise
/// `is_building` is false without asking.
pub async fn probe_app(
    runner: &dyn CommandRunner,
    layout: &TomcatLayout,
    app: &TrackedApplication,
) -> AppFlags {
    let name = app.name();
    let extracted_dir = layout.extracted_dir(name);
    let deployed_war = layout.deployed_war(name);
    let build_log = layout.build_log(name);
    let built_war = app.built_war();
    let descriptor = app
        .descriptor_path
        .as_ref()
        .map(|path| path.to_string_lossy().into_owned());

    let can_deploy = async {
        match &built_war {
            Some(path) => path_exists(runner, path).await,
            None => false,
        }
    };
    let is_building = async {
        match &descriptor {
            Some(descriptor) => process_with_option(runner, "mvn", "-f", descriptor).await,
            None => false,
        }
    };

    let (is_extracted, is_deployed, can_deploy, has_build_log, is_building) = tokio::join!(
        path_exists(runner, &extracted_dir),
        path_exists(runner, &deployed_war),
        can_deploy,
        path_exists(runner, &build_log),
        is_building,
    );

    AppFlags {
        is_deployed,
        is_extracted,
        can_deploy,
        is_building,
        has_build_log,
    }
}

/// Probes Tomcat and every application in parallel.
pub async fn probe_all(
    runner: &dyn CommandRunner,
    layout: &TomcatLayout,
    apps: &[TrackedApplication],
) -> TickReport {
    let app_probes = join_all(apps.iter().map(|app| async move {
        let flags = probe_app(runner, layout, app).await;
        (app.name().to_string(), flags)
    }));
    let (tomcat_running, apps) = tokio::join!(tomcat::is_running(runner), app_probes);
    TickReport {
        tomcat_running,
        apps,
    }
}

/// Remembers the last Tomcat status so only transitions are reported.
#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    tomcat_running: Option<bool>,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tomcat_running(&self) -> bool {
        self.tomcat_running.unwrap_or(false)
    }

    /// Applies a tick's results and returns the resulting change events,
    /// always ending with [`ManagerEvent::TickCompleted`].
    ///
    /// Results for applications evicted while the probes ran are dropped.
    pub fn merge(&mut self, registry: &mut Registry, report: TickReport) -> Vec<ManagerEvent> {
        let mut events = Vec::new();

        if self.tomcat_running != Some(report.tomcat_running) {
            self.tomcat_running = Some(report.tomcat_running);
            events.push(ManagerEvent::TomcatChanged {
                running: report.tomcat_running,
            });
        }

        for (name, flags) in report.apps {
            if registry.apply_flags(&name, flags) {
                if let Some(app) = registry.get(&name) {
                    events.push(ManagerEvent::AppChanged {
                        app: app.snapshot(),
                    });
                }
            }
        }

        let changed = events.len();
        debug!(changed, "Reconciliation tick merged");
        events.push(ManagerEvent::TickCompleted { changed });
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deployed() -> AppFlags {
        AppFlags {
            is_deployed: true,
            ..AppFlags::default()
        }
    }

    #[test]
    fn first_merge_reports_tomcat_status() {
        let mut registry = Registry::new();
        let mut reconciler = Reconciler::new();
        let events = reconciler.merge(
            &mut registry,
            TickReport {
                tomcat_running: false,
                apps: vec![],
            },
        );
        assert_eq!(
            events,
            vec![
                ManagerEvent::TomcatChanged { running: false },
                ManagerEvent::TickCompleted { changed: 1 },
            ]
        );
    }

    #[test]
    fn unchanged_flags_emit_only_tick_completed() {
        let mut registry = Registry::from_apps([TrackedApplication::new("app1")]);
        let mut reconciler = Reconciler::new();
        let report = TickReport {
            tomcat_running: true,
            apps: vec![("app1".to_string(), deployed())],
        };

        let first = reconciler.merge(&mut registry, report.clone());
        assert_eq!(first.len(), 3);

        let second = reconciler.merge(&mut registry, report);
        assert_eq!(second, vec![ManagerEvent::TickCompleted { changed: 0 }]);
    }

    #[test]
    fn results_for_evicted_apps_are_dropped() {
        let mut registry = Registry::new();
        let mut reconciler = Reconciler::new();
        reconciler.merge(
            &mut registry,
            TickReport {
                tomcat_running: false,
                apps: vec![],
            },
        );
        let events = reconciler.merge(
            &mut registry,
            TickReport {
                tomcat_running: false,
                apps: vec![("gone".to_string(), deployed())],
            },
        );
        assert_eq!(events, vec![ManagerEvent::TickCompleted { changed: 0 }]);
    }
}
