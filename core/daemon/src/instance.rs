//! Single-instance guard for `watch`.
//!
//! The running instance records its PID; a second instance refuses to start
//! while that PID is alive. Stale files left by a crash are overwritten.

use fs_err as fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::process;

#[derive(Debug)]
pub struct InstanceGuard {
    path: PathBuf,
}

impl InstanceGuard {
    pub fn acquire(path: &Path) -> Result<Self, String> {
        let own_pid = std::process::id();
        if let Some(pid) = read_pid(path) {
            if pid != own_pid && process::is_alive(pid) {
                return Err(format!("Tomcat Manager is already running (pid {})", pid));
            }
            debug!(pid, "Replacing stale instance file");
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|err| format!("Failed to create instance directory: {}", err))?;
        }
        fs::write(path, own_pid.to_string())
            .map_err(|err| format!("Failed to write instance file: {}", err))?;
        Ok(Self {
            path: path.to_path_buf(),
        })
    }
}

impl Drop for InstanceGuard {
    fn drop(&mut self) {
        if read_pid(&self.path) == Some(std::process::id()) {
            if let Err(err) = fs::remove_file(&self.path) {
                warn!(error = %err, "Failed to remove instance file");
            }
        }
    }
}

fn read_pid(path: &Path) -> Option<u32> {
    fs::read_to_string(path).ok()?.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_writes_and_releases_pid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("manager.pid");
        {
            let _guard = InstanceGuard::acquire(&path).unwrap();
            assert_eq!(read_pid(&path), Some(std::process::id()));
        }
        assert!(!path.exists());
    }

    #[test]
    fn stale_pid_file_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("manager.pid");
        std::fs::write(&path, "999999999").unwrap();
        let _guard = InstanceGuard::acquire(&path).unwrap();
        assert_eq!(read_pid(&path), Some(std::process::id()));
    }

    #[test]
    fn live_foreign_pid_blocks_acquire() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("manager.pid");
        // PID 1 is always alive and never ours.
        std::fs::write(&path, "1").unwrap();
        assert!(InstanceGuard::acquire(&path).is_err());
    }
}
