//! In-memory registry of tracked applications, keyed by identity.

use std::collections::BTreeMap;

use crate::app::{AppFlags, AppSnapshot, TrackedApplication};

#[derive(Debug, Clone, Default)]
pub struct Registry {
    apps: BTreeMap<String, TrackedApplication>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry from a primary list, absorbing duplicates.
    pub fn from_apps(apps: impl IntoIterator<Item = TrackedApplication>) -> Self {
        let mut registry = Self::new();
        for app in apps {
            registry.insert_or_absorb(app);
        }
        registry
    }

    /// Inserts `app`, or absorbs it into the entry with the same identity.
    /// Returns true when a new entry was created.
    pub fn insert_or_absorb(&mut self, app: TrackedApplication) -> bool {
        match self.apps.get_mut(app.name()) {
            Some(existing) => {
                existing.absorb(app);
                false
            }
            None => {
                self.apps.insert(app.name().to_string(), app);
                true
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&TrackedApplication> {
        self.apps.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<TrackedApplication> {
        self.apps.remove(name)
    }

    /// Stores freshly probed flags. Returns true if they differ from the last ones.
    pub fn apply_flags(&mut self, name: &str, flags: AppFlags) -> bool {
        match self.apps.get_mut(name) {
            Some(app) if app.flags != flags => {
                app.flags = flags;
                true
            }
            _ => false,
        }
    }

    pub fn names(&self) -> Vec<String> {
        self.apps.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrackedApplication> {
        self.apps.values()
    }

    pub fn snapshots(&self) -> Vec<AppSnapshot> {
        self.apps.values().map(TrackedApplication::snapshot).collect()
    }

    pub fn len(&self) -> usize {
        self.apps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.apps.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn identity_is_unique() {
        let mut registry = Registry::new();
        assert!(registry.insert_or_absorb(TrackedApplication::new("app1")));
        assert!(!registry.insert_or_absorb(TrackedApplication::new("app1.war")));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn absorb_through_registry_is_non_destructive() {
        let mut primary = TrackedApplication::new("app1");
        primary.descriptor_path = Some(PathBuf::from("/repo/pom.xml"));
        let mut registry = Registry::from_apps([primary]);

        let mut deployed = TrackedApplication::new("app1.war");
        deployed.descriptor_path = Some(PathBuf::from("/elsewhere/pom.xml"));
        registry.insert_or_absorb(deployed);

        assert_eq!(
            registry.get("app1").and_then(|app| app.descriptor_path.clone()),
            Some(PathBuf::from("/repo/pom.xml"))
        );
    }

    #[test]
    fn apply_flags_reports_changes_only() {
        let mut registry = Registry::from_apps([TrackedApplication::new("app1")]);
        let flags = AppFlags {
            is_deployed: true,
            ..AppFlags::default()
        };
        assert!(registry.apply_flags("app1", flags));
        assert!(!registry.apply_flags("app1", flags));
        assert!(!registry.apply_flags("missing", flags));
    }
}
