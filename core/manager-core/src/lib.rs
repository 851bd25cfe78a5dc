//! # tomcat-manager-core
//!
//! Core library for Tomcat Manager: keeps an in-memory view of a local Tomcat
//! and the Maven web applications around it in sync with the process table
//! and the filesystem.
//!
//! ## Design Principles
//!
//! - **Derived state**: every application flag is recomputed from external
//!   facts on each tick; nothing is authoritative in memory.
//! - **Single owner**: the registry is mutated only by [`Manager`]; probes
//!   run concurrently and hand results back for merging.
//! - **Graceful degradation**: failed commands, unreadable descriptors and
//!   missing directories become `false` flags or omitted entries.
//! - **Explicit events**: state changes are published as [`ManagerEvent`]s.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tomcat_manager_core::{Manager, Preferences, ShellRunner, StorageConfig};
//!
//! let storage = StorageConfig::from_home()?;
//! let runner = Arc::new(ShellRunner::new());
//! let prefs = Preferences::load_or_init(&storage, runner.as_ref()).await?;
//! let (events, mut rx) = tokio::sync::mpsc::unbounded_channel();
//! let (handle, task) = Manager::new(runner, &prefs, events).spawn();
//! ```

pub mod actions;
pub mod app;
pub mod config;
pub mod discovery;
pub mod engine;
pub mod environment;
pub mod error;
pub mod events;
pub mod patterns;
pub mod pom;
pub mod probes;
pub mod reconciler;
pub mod registry;
pub mod runner;
pub mod storage;
pub mod tomcat;

pub use app::{AppFlags, AppSnapshot, TomcatLayout, TrackedApplication};
pub use config::Preferences;
pub use engine::{Action, Manager, ManagerHandle};
pub use environment::{EnvironmentSelection, EnvironmentSelector};
pub use error::{ManagerError, Result};
pub use events::{ActionKind, ManagerEvent};
pub use pom::{BuildDescriptor, Dependency};
pub use registry::Registry;
pub use runner::{CommandRunner, ShellResponse, ShellRunner};
pub use storage::StorageConfig;
