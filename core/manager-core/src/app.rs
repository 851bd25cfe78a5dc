//! Tracked web applications and the paths derived from them.

use std::borrow::Cow;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::pom::BuildDescriptor;

const WAR_SUFFIX: &str = ".war";

/// Where Tomcat and build artifacts live on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TomcatLayout {
    pub catalina_home: PathBuf,
    pub build_log_dir: PathBuf,
}

impl TomcatLayout {
    pub fn new(catalina_home: impl Into<PathBuf>, build_log_dir: impl Into<PathBuf>) -> Self {
        Self {
            catalina_home: catalina_home.into(),
            build_log_dir: build_log_dir.into(),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.catalina_home.as_os_str().is_empty()
    }

    pub fn bin_script(&self, script: &str) -> PathBuf {
        self.catalina_home.join("bin").join(script)
    }

    pub fn webapps_dir(&self) -> PathBuf {
        self.catalina_home.join("webapps")
    }

    pub fn extracted_dir(&self, name: &str) -> PathBuf {
        self.webapps_dir().join(path_component(name).as_ref())
    }

    pub fn deployed_war(&self, name: &str) -> PathBuf {
        self.webapps_dir()
            .join(format!("{}{}", path_component(name), WAR_SUFFIX))
    }

    pub fn build_log(&self, name: &str) -> PathBuf {
        self.build_log_dir
            .join(format!("{}.build.log", path_component(name)))
    }
}

/// True when `name` is usable as a single directory entry.
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\0'])
}

/// Keeps every derived path inside its base directory, whatever the name.
fn path_component(name: &str) -> Cow<'_, str> {
    if is_valid_name(name) {
        Cow::Borrowed(name)
    } else {
        Cow::Owned(format!("_{}", name.replace(['/', '\0'], "_")))
    }
}

/// Derived state of one application. Recomputed on every tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AppFlags {
    pub is_deployed: bool,
    pub is_extracted: bool,
    pub can_deploy: bool,
    pub is_building: bool,
    pub has_build_log: bool,
}

impl AppFlags {
    /// Anything left in `webapps`.
    pub fn has_artifacts(&self) -> bool {
        self.is_deployed || self.is_extracted
    }
}

/// A web application identified by its final artifact name.
///
/// Equality and hashing consider the name only.
#[derive(Debug, Clone)]
pub struct TrackedApplication {
    name: String,
    pub descriptor_path: Option<PathBuf>,
    pub version: Option<String>,
    pub artifact_id: Option<String>,
    pub flags: AppFlags,
}

impl TrackedApplication {
    /// Creates an application from a deployed entry name (`foo` or `foo.war`).
    pub fn new(name: &str) -> Self {
        Self {
            name: identity_from_entry(name),
            descriptor_path: None,
            version: None,
            artifact_id: None,
            flags: AppFlags::default(),
        }
    }

    /// `None` when the descriptor yields no name usable inside `webapps`.
    pub fn from_descriptor(descriptor: &BuildDescriptor) -> Option<Self> {
        let name = descriptor.artifact_name()?;
        let mut app = Self::new(&name);
        if !is_valid_name(app.name()) {
            return None;
        }
        app.descriptor_path = Some(descriptor.path.clone());
        app.version = descriptor.version.clone();
        app.artifact_id = descriptor.artifact_id.clone();
        Some(app)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn can_build(&self) -> bool {
        self.descriptor_path.is_some()
    }

    /// Fills every unset descriptor field from `other`; set fields win.
    pub fn absorb(&mut self, other: TrackedApplication) {
        if self.descriptor_path.is_none() {
            self.descriptor_path = other.descriptor_path;
        }
        if self.version.is_none() {
            self.version = other.version;
        }
        if self.artifact_id.is_none() {
            self.artifact_id = other.artifact_id;
        }
    }

    /// `<descriptor dir>/target/<name>.war`, when a descriptor is known.
    pub fn built_war(&self) -> Option<PathBuf> {
        let descriptor = self.descriptor_path.as_deref()?;
        let project_dir = descriptor.parent().unwrap_or_else(|| Path::new("."));
        Some(
            project_dir
                .join("target")
                .join(format!("{}{}", self.name, WAR_SUFFIX)),
        )
    }

    pub fn snapshot(&self) -> AppSnapshot {
        AppSnapshot {
            name: self.name.clone(),
            descriptor_path: self.descriptor_path.clone(),
            version: self.version.clone(),
            artifact_id: self.artifact_id.clone(),
            can_build: self.can_build(),
            flags: self.flags,
        }
    }
}

impl PartialEq for TrackedApplication {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for TrackedApplication {}

impl Hash for TrackedApplication {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

/// Serializable view of a [`TrackedApplication`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppSnapshot {
    pub name: String,
    pub descriptor_path: Option<PathBuf>,
    pub version: Option<String>,
    pub artifact_id: Option<String>,
    pub can_build: bool,
    #[serde(flatten)]
    pub flags: AppFlags,
}

fn identity_from_entry(entry: &str) -> String {
    entry.strip_suffix(WAR_SUFFIX).unwrap_or(entry).to_string()
}
