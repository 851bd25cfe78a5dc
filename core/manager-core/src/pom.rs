//! Maven build descriptor (`pom.xml`) parsing.
//!
//! Only the handful of fields the manager needs are extracted. Lookups match
//! on local element names so the default POM namespace does not matter.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use fs_err as fs;
use roxmltree::{Document, Node};
use serde::Serialize;

use crate::error::{ManagerError, Result};
use crate::patterns::RE_PROPERTY_PLACEHOLDER;

/// Packaging kind of deployable web archives.
pub const WAR_PACKAGING: &str = "war";

/// File name searched for during discovery.
pub const DESCRIPTOR_FILE_NAME: &str = "pom.xml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dependency {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildDescriptor {
    pub path: PathBuf,
    pub packaging: Option<String>,
    pub final_name: Option<String>,
    pub version: Option<String>,
    pub artifact_id: Option<String>,
    pub properties: HashMap<String, String>,
    pub dependencies: Vec<Dependency>,
}

impl BuildDescriptor {
    /// Reads and parses the descriptor at `path`.
    pub fn read(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|source| ManagerError::DescriptorRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(path, &text)
    }

    pub fn parse(path: &Path, text: &str) -> Result<Self> {
        let doc = Document::parse(text).map_err(|err| ManagerError::DescriptorMalformed {
            path: path.to_path_buf(),
            details: err.to_string(),
        })?;
        let project = doc.root_element();

        let properties = collect_properties(project);
        let artifact_id = child_text(project, "artifactId");
        let version =
            child_text(project, "version").or_else(|| nested_text(project, &["parent", "version"]));
        let packaging = child_text(project, "packaging");
        let final_name = nested_text(project, &["build", "finalName"])
            .or_else(|| first_descendant_text(project, "finalName"))
            .map(|name| {
                let scope = builtin_properties(&properties, artifact_id.as_deref(), version.as_deref());
                substitute_placeholders(&name, &scope)
            });

        let dependencies = project
            .descendants()
            .filter(|node| node.has_tag_name("dependency"))
            .filter_map(|node| parse_dependency(node, &properties))
            .collect();

        Ok(Self {
            path: path.to_path_buf(),
            packaging,
            final_name,
            version,
            artifact_id,
            properties,
            dependencies,
        })
    }

    /// Packaging defaults to `jar` in Maven; only an explicit `war` counts.
    pub fn is_web_archive(&self) -> bool {
        self.packaging.as_deref() == Some(WAR_PACKAGING)
    }

    /// Name of the artifact the build produces.
    ///
    /// Falls back to Maven's `<artifactId>-<version>` default, and finally to
    /// the name of the directory holding the descriptor. `None` when even
    /// that is unavailable.
    pub fn artifact_name(&self) -> Option<String> {
        if let Some(name) = self.final_name.as_ref().filter(|name| !name.is_empty()) {
            return Some(name.clone());
        }
        match (&self.artifact_id, &self.version) {
            (Some(artifact_id), Some(version)) => Some(format!("{}-{}", artifact_id, version)),
            _ => self
                .path
                .parent()
                .and_then(Path::file_name)
                .and_then(|name| name.to_str())
                .map(str::to_string),
        }
    }
}

/// Replaces every `${name}` with the matching property value.
/// Unknown placeholders are left verbatim.
pub fn substitute_placeholders(value: &str, properties: &HashMap<String, String>) -> String {
    RE_PROPERTY_PLACEHOLDER
        .replace_all(value, |caps: &regex::Captures| {
            properties
                .get(&caps[1])
                .cloned()
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

fn parse_dependency(node: Node, properties: &HashMap<String, String>) -> Option<Dependency> {
    let fields: HashMap<&str, String> = node
        .children()
        .filter(Node::is_element)
        .filter_map(|child| {
            let text = child.text()?.trim();
            Some((child.tag_name().name(), substitute_placeholders(text, properties)))
        })
        .collect();

    Some(Dependency {
        group_id: fields.get("groupId")?.clone(),
        artifact_id: fields.get("artifactId")?.clone(),
        version: fields.get("version")?.clone(),
    })
}

fn collect_properties(project: Node) -> HashMap<String, String> {
    let mut properties = HashMap::new();
    for block in project
        .descendants()
        .filter(|node| node.has_tag_name("properties"))
    {
        for property in block.children().filter(Node::is_element) {
            let value = property.text().map(str::trim).unwrap_or_default();
            properties
                .entry(property.tag_name().name().to_string())
                .or_insert_with(|| value.to_string());
        }
    }
    properties
}

fn builtin_properties(
    properties: &HashMap<String, String>,
    artifact_id: Option<&str>,
    version: Option<&str>,
) -> HashMap<String, String> {
    let mut scope = properties.clone();
    if let Some(artifact_id) = artifact_id {
        scope.insert("project.artifactId".to_string(), artifact_id.to_string());
    }
    if let Some(version) = version {
        scope.insert("project.version".to_string(), version.to_string());
    }
    scope
}

fn child_text(node: Node, name: &str) -> Option<String> {
    node.children()
        .find(|child| child.has_tag_name(name))
        .and_then(|child| child.text())
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

fn nested_text(node: Node, path: &[&str]) -> Option<String> {
    let (last, parents) = path.split_last()?;
    let mut current = node;
    for name in parents {
        current = current.children().find(|child| child.has_tag_name(*name))?;
    }
    child_text(current, last)
}

fn first_descendant_text(node: Node, name: &str) -> Option<String> {
    node.descendants()
        .find(|child| child.has_tag_name(name))
        .and_then(|child| child.text())
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    const POM: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<project xmlns="http://maven.apache.org/POM/4.0.0">
  <modelVersion>4.0.0</modelVersion>
  <parent>
    <groupId>com.example</groupId>
    <artifactId>parent</artifactId>
    <version>9.9.9</version>
  </parent>
  <artifactId>storefront</artifactId>
  <version>1.2.3</version>
  <packaging>war</packaging>
  <properties>
    <spring.version>5.3.1</spring.version>
  </properties>
  <dependencies>
    <dependency>
      <groupId>org.springframework</groupId>
      <artifactId>spring-web</artifactId>
      <version>${spring.version}</version>
    </dependency>
    <dependency>
      <groupId>com.example</groupId>
      <artifactId>shared</artifactId>
      <version>${project.version}</version>
    </dependency>
    <dependency>
      <groupId>junit</groupId>
      <artifactId>junit</artifactId>
    </dependency>
  </dependencies>
  <build>
    <finalName>${project.artifactId}</finalName>
  </build>
</project>"#;

    fn parse(text: &str) -> BuildDescriptor {
        BuildDescriptor::parse(Path::new("/repo/storefront/pom.xml"), text).unwrap()
    }

    #[test]
    fn parses_single_value_fields() {
        let pom = parse(POM);
        assert_eq!(pom.packaging.as_deref(), Some("war"));
        assert_eq!(pom.version.as_deref(), Some("1.2.3"));
        assert_eq!(pom.artifact_id.as_deref(), Some("storefront"));
        assert_eq!(pom.final_name.as_deref(), Some("storefront"));
        assert!(pom.is_web_archive());
    }

    #[test]
    fn substitutes_properties_in_dependencies() {
        let pom = parse(POM);
        assert_eq!(pom.dependencies[0].version, "5.3.1");
    }

    #[test]
    fn leaves_unresolved_placeholders_verbatim() {
        let pom = parse(POM);
        assert_eq!(pom.dependencies[1].version, "${project.version}");
    }

    #[test]
    fn drops_dependencies_missing_a_coordinate() {
        let pom = parse(POM);
        assert_eq!(pom.dependencies.len(), 2);
        assert!(pom.dependencies.iter().all(|dep| dep.artifact_id != "junit"));
    }

    #[test]
    fn version_falls_back_to_parent() {
        let pom = parse(
            "<project><parent><version>2.0</version></parent><artifactId>a</artifactId></project>",
        );
        assert_eq!(pom.version.as_deref(), Some("2.0"));
        assert_eq!(pom.artifact_name().as_deref(), Some("a-2.0"));
        assert!(!pom.is_web_archive());
    }

    #[test]
    fn artifact_name_falls_back_to_project_dir() {
        let pom = parse("<project><artifactId>shop</artifactId><packaging>war</packaging></project>");
        assert_eq!(pom.artifact_name().as_deref(), Some("storefront"));

        let bare = BuildDescriptor::parse(Path::new("pom.xml"), "<project/>").unwrap();
        assert_eq!(bare.artifact_name(), None);
    }

    #[test]
    fn malformed_xml_is_an_error() {
        let err = BuildDescriptor::parse(Path::new("bad.xml"), "<project>").unwrap_err();
        assert!(matches!(err, ManagerError::DescriptorMalformed { .. }));
    }

    #[test]
    fn property_version_substitution() {
        let mut properties = HashMap::new();
        properties.insert("version".to_string(), "1.2.3".to_string());
        assert_eq!(substitute_placeholders("${version}", &properties), "1.2.3");
    }
}
