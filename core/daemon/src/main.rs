//! Tomcat Manager entrypoint.
//!
//! Supervises a local Tomcat and the Maven web applications around it.
//! `watch` runs the polling loop and prints the status menu as it changes;
//! the remaining subcommands perform one action and exit.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::error;

use tomcat_manager_core::{CommandRunner, Preferences, ShellRunner, StorageConfig};

mod commands;
mod instance;
mod logging;
mod menu;
mod process;
mod watch;

#[derive(Parser)]
#[command(name = "tomcat-manager")]
#[command(about = "Supervise a local Tomcat and its Maven web applications")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll continuously and print the menu whenever it changes.
    /// Actions are read from stdin, one per line (e.g. `build shop`).
    Watch {
        /// Emit raw events as JSON lines instead of the menu
        #[arg(long)]
        json: bool,
    },

    /// Print the current menu once
    Status {
        #[arg(long)]
        json: bool,
    },

    /// Start Tomcat via bin/startup.sh
    Start,

    /// Stop Tomcat, force-killing leftovers after the grace period
    Stop,

    /// List discovered web applications
    Apps {
        #[arg(long)]
        json: bool,
    },

    /// Clean and package an application with Maven
    Build {
        #[arg(value_name = "APP")]
        app: String,
    },

    /// Copy an application's built war into webapps
    Deploy {
        #[arg(value_name = "APP")]
        app: String,
    },

    /// Remove an application's deployed war and extracted directory
    Remove {
        #[arg(value_name = "APP")]
        app: String,
    },

    /// Print an application's last build log
    Logs {
        #[arg(value_name = "APP")]
        app: String,
    },

    /// Inspect or switch the active environment
    Env {
        #[command(subcommand)]
        command: EnvCommands,
    },

    /// Show or change preferences
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum EnvCommands {
    /// List available environments, marking the current one
    List,
    /// Point the `dibs` link at another environment
    Switch {
        #[arg(value_name = "NAME")]
        name: String,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print preferences as JSON
    Show,
    /// Set one preference (e.g. `catalina_home /opt/tomcat`)
    Set {
        #[arg(value_name = "KEY")]
        key: String,
        #[arg(value_name = "VALUE")]
        value: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let storage = StorageConfig::from_home();
    let _logging_guard = logging::init(storage.as_ref().ok().map(|s| s.logs_dir()).as_deref());
    let storage = match storage {
        Ok(storage) => storage,
        Err(err) => {
            error!(error = %err, "Failed to resolve storage directory");
            std::process::exit(1);
        }
    };

    let runner: Arc<dyn CommandRunner> = Arc::new(ShellRunner::new());
    let prefs = match Preferences::load_or_init(&storage, runner.as_ref()).await {
        Ok(prefs) => prefs,
        Err(err) => {
            error!(error = %err, "Failed to load preferences");
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Watch { json } => watch::run(runner, &prefs, &storage, json).await,
        Commands::Status { json } => commands::status(runner, &prefs, json).await,
        Commands::Start => commands::start(runner, &prefs).await,
        Commands::Stop => commands::stop(runner, &prefs).await,
        Commands::Apps { json } => commands::apps(runner, &prefs, json).await,
        Commands::Build { app } => commands::build(runner, &prefs, &app).await,
        Commands::Deploy { app } => commands::deploy(runner, &prefs, &app).await,
        Commands::Remove { app } => commands::remove(runner, &prefs, &app).await,
        Commands::Logs { app } => commands::logs(runner, &prefs, &app).await,
        Commands::Env { command } => match command {
            EnvCommands::List => commands::env_list(runner, &prefs).await,
            EnvCommands::Switch { name } => commands::env_switch(runner, &prefs, &name).await,
        },
        Commands::Config { command } => match command {
            ConfigCommands::Show => commands::config_show(&prefs),
            ConfigCommands::Set { key, value } => {
                commands::config_set(&storage, prefs, &key, &value)
            }
        },
    };

    if let Err(err) = result {
        error!(error = %err, "tomcat-manager failed");
        eprintln!("error: {}", err);
        std::process::exit(1);
    }
}
