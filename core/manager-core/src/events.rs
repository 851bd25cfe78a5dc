//! Events published by the manager to whatever presents its state.

use serde::Serialize;

use crate::app::AppSnapshot;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ManagerEvent {
    DiscoveryFinished {
        apps: Vec<AppSnapshot>,
    },
    TomcatChanged {
        running: bool,
    },
    AppChanged {
        app: AppSnapshot,
    },
    AppRemoved {
        name: String,
    },
    TickCompleted {
        changed: usize,
    },
    BuildStarted {
        name: String,
        log: String,
    },
    BuildFinished {
        name: String,
        exit_code: i32,
    },
    ActionSkipped {
        name: String,
        action: ActionKind,
        reason: String,
    },
    EnvironmentsListed {
        available: Vec<String>,
        current: Option<String>,
    },
    EnvironmentChanged {
        current: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Build,
    Deploy,
    Remove,
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ActionKind::Build => "build",
            ActionKind::Deploy => "deploy",
            ActionKind::Remove => "remove",
        };
        f.write_str(label)
    }
}
