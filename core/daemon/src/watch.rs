//! The long-running `watch` command.
//!
//! Spawns the manager loop, renders the menu (or raw JSON events) as they
//! arrive, and forwards actions typed on stdin.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};

use tomcat_manager_core::{
    Action, CommandRunner, Manager, ManagerEvent, Preferences, StorageConfig,
};

use crate::instance::InstanceGuard;
use crate::menu::MenuModel;

pub async fn run(
    runner: Arc<dyn CommandRunner>,
    prefs: &Preferences,
    storage: &StorageConfig,
    json: bool,
) -> Result<(), String> {
    let _instance = InstanceGuard::acquire(&storage.instance_file())?;

    let (tx, mut events) = mpsc::unbounded_channel();
    let (handle, task) = Manager::new(runner, prefs, tx).spawn();
    info!("Watching Tomcat");

    let mut presenter = Presenter::new(json, prefs.show_on_launch);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(event) => presenter.present(&event),
                None => break,
            },
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) => match parse_action(&line) {
                    Ok(Some(action)) => handle.send(action).await?,
                    Ok(None) => {}
                    Err(message) => eprintln!("{}", message),
                },
                Ok(None) => stdin_open = false,
                Err(err) => {
                    warn!(error = %err, "Failed to read stdin; ignoring further input");
                    stdin_open = false;
                }
            },
            _ = &mut shutdown => break,
        }
    }

    drop(handle);
    if let Err(err) = task.await {
        warn!(error = %err, "Manager loop ended abnormally");
    }
    Ok(())
}

struct Presenter {
    json: bool,
    show_first_menu: bool,
    discovered: bool,
    model: MenuModel,
}

impl Presenter {
    fn new(json: bool, show_on_launch: bool) -> Self {
        Self {
            json,
            show_first_menu: show_on_launch,
            discovered: false,
            model: MenuModel::default(),
        }
    }

    fn present(&mut self, event: &ManagerEvent) {
        if self.json {
            match serde_json::to_string(event) {
                Ok(line) => println!("{}", line),
                Err(err) => warn!(error = %err, "Failed to serialize event"),
            }
            return;
        }

        match event {
            ManagerEvent::BuildStarted { name, log } => println!("Building {} (log: {})", name, log),
            ManagerEvent::BuildFinished { name, exit_code } => {
                println!("Build of {} finished with exit code {}", name, exit_code)
            }
            ManagerEvent::ActionSkipped {
                name,
                action,
                reason,
            } => println!("Skipped {} for {}: {}", action, name, reason),
            _ => {}
        }

        let changed = self.model.apply(event);
        if matches!(event, ManagerEvent::DiscoveryFinished { .. }) && !self.discovered {
            self.discovered = true;
            if !self.show_first_menu {
                return;
            }
        }
        if changed && self.discovered {
            println!("{}", self.model.render());
        }
    }
}

/// Parses one stdin line into an action. Blank lines are ignored.
fn parse_action(line: &str) -> Result<Option<Action>, String> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };
    let argument = words.next().map(str::to_string);

    let action = match (verb, argument) {
        ("start", None) => Action::StartTomcat,
        ("stop", None) => Action::StopTomcat,
        ("rescan", None) => Action::Rescan,
        ("envs", None) => Action::RefreshEnvironments,
        ("build", Some(app)) => Action::Build(app),
        ("deploy", Some(app)) => Action::Deploy(app),
        ("remove", Some(app)) => Action::Remove(app),
        ("env", Some(name)) => Action::SwitchEnvironment(name),
        _ => {
            return Err(format!(
                "Unknown command: {} (try start, stop, rescan, envs, build <app>, deploy <app>, remove <app>, env <name>)",
                line.trim()
            ))
        }
    };
    Ok(Some(action))
}
