//! One-shot subcommands. Each builds a fresh manager, runs discovery when it
//! needs application state, performs its action, and exits.

use std::sync::Arc;

use serde_json::json;
use tokio::sync::mpsc;
use tracing::info;

use tomcat_manager_core::{
    CommandRunner, Manager, ManagerError, ManagerEvent, Preferences, StorageConfig,
};

use crate::menu::MenuModel;

fn manager(
    runner: Arc<dyn CommandRunner>,
    prefs: &Preferences,
) -> (Manager, mpsc::UnboundedReceiver<ManagerEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Manager::new(runner, prefs, tx), rx)
}

async fn discovered(
    runner: Arc<dyn CommandRunner>,
    prefs: &Preferences,
) -> (Manager, mpsc::UnboundedReceiver<ManagerEvent>) {
    let (mut manager, rx) = manager(runner, prefs);
    manager.discover().await;
    (manager, rx)
}

fn print_json(value: &impl serde::Serialize) -> Result<(), String> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|err| format!("Failed to serialize output: {}", err))?;
    println!("{}", text);
    Ok(())
}

pub async fn status(
    runner: Arc<dyn CommandRunner>,
    prefs: &Preferences,
    json: bool,
) -> Result<(), String> {
    let (mut manager, mut rx) = discovered(runner, prefs).await;
    manager.tick().await;
    let environments = manager.refresh_environments().await;
    let tomcat_pid = manager.tomcat_pid().await;

    if json {
        return print_json(&json!({
            "tomcat_running": manager.tomcat_running(),
            "tomcat_pid": tomcat_pid,
            "apps": manager.registry().snapshots(),
            "environments": environments,
        }));
    }

    let mut model = MenuModel::default();
    while let Ok(event) = rx.try_recv() {
        model.apply(&event);
    }
    print!("{}", model.render());
    if let Some(pid) = tomcat_pid {
        println!("Tomcat pid: {}", pid);
    }
    Ok(())
}

pub async fn start(runner: Arc<dyn CommandRunner>, prefs: &Preferences) -> Result<(), String> {
    let (manager, _rx) = manager(runner, prefs);
    let response = manager.start_tomcat().await;
    for line in &response.output {
        println!("{}", line);
    }
    if !response.succeeded() {
        return Err(format!(
            "startup.sh exited with {}: {}",
            response.exit_code,
            response.error.join("\n")
        ));
    }
    Ok(())
}

pub async fn stop(runner: Arc<dyn CommandRunner>, prefs: &Preferences) -> Result<(), String> {
    let (manager, _rx) = manager(runner, prefs);
    let killed = manager.stop_tomcat().await;
    if killed > 0 {
        println!("Force-killed {} Tomcat process(es)", killed);
    } else {
        println!("Tomcat stopped");
    }
    Ok(())
}

pub async fn apps(
    runner: Arc<dyn CommandRunner>,
    prefs: &Preferences,
    json: bool,
) -> Result<(), String> {
    let (manager, _rx) = discovered(runner, prefs).await;
    let apps = manager.registry().snapshots();
    if json {
        return print_json(&apps);
    }
    for app in apps {
        let source = match &app.descriptor_path {
            Some(path) => path.display().to_string(),
            None => "(deployed only)".to_string(),
        };
        println!(
            "{:<32} {:<12} deployed={:<5} extracted={:<5} {}",
            app.name,
            app.version.as_deref().unwrap_or("-"),
            app.flags.is_deployed,
            app.flags.is_extracted,
            source
        );
    }
    Ok(())
}

pub async fn build(
    runner: Arc<dyn CommandRunner>,
    prefs: &Preferences,
    app: &str,
) -> Result<(), String> {
    let (mut manager, _rx) = discovered(runner, prefs).await;
    let log = manager.layout().build_log(app);
    match manager.build(app).await? {
        None => {
            println!("{} has no build descriptor; nothing to build", app);
            Ok(())
        }
        Some(response) if response.succeeded() => {
            println!("Built {} (log: {})", app, log.display());
            Ok(())
        }
        Some(response) => Err(format!(
            "Maven exited with {} (log: {})",
            response.exit_code,
            log.display()
        )),
    }
}

pub async fn deploy(
    runner: Arc<dyn CommandRunner>,
    prefs: &Preferences,
    app: &str,
) -> Result<(), String> {
    let (mut manager, _rx) = discovered(runner, prefs).await;
    match manager.deploy(app).await? {
        None => {
            println!("{} has no build descriptor; nothing to deploy", app);
            Ok(())
        }
        Some(response) if response.succeeded() => {
            println!("Deployed {}", app);
            Ok(())
        }
        Some(response) => Err(format!("Deploy failed: {}", response.error.join("\n"))),
    }
}

pub async fn remove(
    runner: Arc<dyn CommandRunner>,
    prefs: &Preferences,
    app: &str,
) -> Result<(), String> {
    let (mut manager, _rx) = discovered(runner, prefs).await;
    if manager.remove(app).await? {
        println!("Removed {}", app);
    } else {
        println!("Removed deployed artifacts of {}; project still tracked", app);
    }
    Ok(())
}

pub async fn logs(
    runner: Arc<dyn CommandRunner>,
    prefs: &Preferences,
    app: &str,
) -> Result<(), String> {
    let (manager, _rx) = discovered(runner, prefs).await;
    match manager.build_log(app)? {
        Some(contents) => print!("{}", contents),
        None => println!("No build log for {}", app),
    }
    Ok(())
}

pub async fn env_list(runner: Arc<dyn CommandRunner>, prefs: &Preferences) -> Result<(), String> {
    let (manager, _rx) = manager(runner, prefs);
    let selection = manager.refresh_environments().await;
    for name in &selection.available {
        let mark = if Some(name) == selection.current.as_ref() {
            "*"
        } else {
            " "
        };
        println!("{} {}", mark, name);
    }
    Ok(())
}

pub async fn env_switch(
    runner: Arc<dyn CommandRunner>,
    prefs: &Preferences,
    name: &str,
) -> Result<(), String> {
    let (manager, _rx) = manager(runner, prefs);
    let selection = manager.refresh_environments().await;
    if !selection.available.iter().any(|env| env == name) {
        return Err(ManagerError::EnvironmentNotFound(name.to_string()).into());
    }
    match manager.switch_environment(name).await {
        Some(current) => println!("Environment - {}", current),
        None => println!("Environment link could not be read after switching"),
    }
    Ok(())
}

pub fn config_show(prefs: &Preferences) -> Result<(), String> {
    print_json(prefs)
}

pub fn config_set(
    storage: &StorageConfig,
    mut prefs: Preferences,
    key: &str,
    value: &str,
) -> Result<(), String> {
    prefs.set(key, value)?;
    prefs.save(storage)?;
    info!(key, "Preference updated");
    println!("{} = {}", key, value);
    Ok(())
}
