//! Discovery of web applications from two sources: build descriptors under
//! the repository root, and entries in Tomcat's `webapps` directory.
//!
//! Both scans run in parallel on blocking threads and are joined before the
//! merge. Descriptor-sourced apps are primary; deployed entries are absorbed
//! into them or appended.

use std::path::{Path, PathBuf};

use fs_err as fs;
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

use crate::app::{TomcatLayout, TrackedApplication};
use crate::pom::{BuildDescriptor, DESCRIPTOR_FILE_NAME};
use crate::registry::Registry;

/// Tomcat's reserved root application, never tracked.
pub const ROOT_ENTRY: &str = "ROOT";

/// Directories that never contain project descriptors worth tracking.
const SKIPPED_DIRS: &[&str] = &["target", ".git", "node_modules"];

/// Runs both scans concurrently and merges them.
pub async fn discover(repository_root: &Path, layout: &TomcatLayout) -> Registry {
    let repository_root = repository_root.to_path_buf();
    let webapps_dir = layout.webapps_dir();
    let configured = layout.is_configured();

    let descriptors = tokio::task::spawn_blocking(move || scan_descriptors(&repository_root));
    let deployed = tokio::task::spawn_blocking(move || {
        if configured {
            scan_deployed(&webapps_dir)
        } else {
            Vec::new()
        }
    });

    let (descriptors, deployed) = tokio::join!(descriptors, deployed);
    let descriptors = descriptors.unwrap_or_else(|err| {
        warn!(error = %err, "Descriptor scan task failed");
        Vec::new()
    });
    let deployed = deployed.unwrap_or_else(|err| {
        warn!(error = %err, "Deployed scan task failed");
        Vec::new()
    });

    merge(descriptors, deployed)
}

/// Descriptor-sourced apps first, then deployed ones absorbed or appended.
pub fn merge(primary: Vec<TrackedApplication>, deployed: Vec<TrackedApplication>) -> Registry {
    let mut registry = Registry::from_apps(primary);
    for app in deployed {
        registry.insert_or_absorb(app);
    }
    registry
}

/// Finds every `pom.xml` under `root` with `war` packaging.
///
/// Unreadable or malformed descriptors are skipped. An empty root yields
/// nothing.
pub fn scan_descriptors(root: &Path) -> Vec<TrackedApplication> {
    if root.as_os_str().is_empty() {
        return Vec::new();
    }

    descriptor_paths(root)
        .into_iter()
        .filter_map(|path| match BuildDescriptor::read(&path) {
            Ok(descriptor) => Some(descriptor),
            Err(err) => {
                warn!(error = %err, "Skipping unreadable build descriptor");
                None
            }
        })
        .filter(BuildDescriptor::is_web_archive)
        .filter_map(|descriptor| match TrackedApplication::from_descriptor(&descriptor) {
            Some(app) => {
                debug!(path = %descriptor.path.display(), name = app.name(), "Found web application descriptor");
                Some(app)
            }
            None => {
                warn!(path = %descriptor.path.display(), "Skipping descriptor without a usable artifact name");
                None
            }
        })
        .collect()
}

fn descriptor_paths(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| !is_skipped_dir(entry))
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file() && entry.file_name() == DESCRIPTOR_FILE_NAME)
        .map(DirEntry::into_path)
        .collect()
}

fn is_skipped_dir(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| SKIPPED_DIRS.contains(&name))
}

/// One app per entry of `webapps`, `.war` stripped, `ROOT` excluded.
/// A missing directory yields nothing.
pub fn scan_deployed(webapps_dir: &Path) -> Vec<TrackedApplication> {
    let entries = match fs::read_dir(webapps_dir) {
        Ok(entries) => entries,
        Err(err) => {
            debug!(error = %err, "webapps directory not readable");
            return Vec::new();
        }
    };

    let mut registry = Registry::new();
    for entry in entries.filter_map(|entry| entry.ok()) {
        let file_name = entry.file_name();
        let Some(name) = file_name.to_str() else {
            continue;
        };
        if name.starts_with('.') {
            continue;
        }
        let app = TrackedApplication::new(name);
        if app.name() == ROOT_ENTRY {
            continue;
        }
        registry.insert_or_absorb(app);
    }
    registry.iter().cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_deployed_dedupes_and_skips_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("app1.war"), b"").unwrap();
        std::fs::create_dir(dir.path().join("app1")).unwrap();
        std::fs::create_dir(dir.path().join("ROOT")).unwrap();
        std::fs::write(dir.path().join(".DS_Store"), b"").unwrap();

        let apps = scan_deployed(dir.path());
        let names: Vec<_> = apps.iter().map(TrackedApplication::name).collect();
        assert_eq!(names, vec!["app1"]);
    }

    #[test]
    fn scan_deployed_missing_dir_is_empty() {
        assert!(scan_deployed(Path::new("/definitely/not/here/webapps")).is_empty());
    }

    #[test]
    fn scan_descriptors_empty_root_is_empty() {
        assert!(scan_descriptors(Path::new("")).is_empty());
    }

    #[test]
    fn scan_descriptors_names_unnamed_projects_after_their_directory() {
        let dir = tempfile::tempdir().unwrap();
        let project = dir.path().join("billing");
        std::fs::create_dir(&project).unwrap();
        std::fs::write(
            project.join("pom.xml"),
            "<project><artifactId>billing-web</artifactId><packaging>war</packaging></project>",
        )
        .unwrap();
        let escaping = dir.path().join("escaping");
        std::fs::create_dir(&escaping).unwrap();
        std::fs::write(
            escaping.join("pom.xml"),
            "<project><packaging>war</packaging><build><finalName>../outside</finalName></build></project>",
        )
        .unwrap();

        let apps = scan_descriptors(dir.path());
        let names: Vec<_> = apps.iter().map(TrackedApplication::name).collect();
        assert_eq!(names, vec!["billing"]);
    }

    #[test]
    fn merge_prefers_descriptor_source() {
        let mut primary = TrackedApplication::new("app1");
        primary.version = Some("1.0".to_string());
        let mut deployed = TrackedApplication::new("app1.war");
        deployed.version = Some("0.1".to_string());

        let registry = merge(vec![primary], vec![deployed, TrackedApplication::new("other")]);

        assert_eq!(registry.names(), vec!["app1", "other"]);
        assert_eq!(
            registry.get("app1").and_then(|app| app.version.clone()),
            Some("1.0".to_string())
        );
    }
}
