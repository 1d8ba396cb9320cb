//! Layout of an extracted repository.
//!
//! ```text
//! <root>/libraries/<artifact>/artifact.json
//! <root>/jars/<artifact>/artifact.json
//! <root>/projects/<artifact>/artifact.json
//! ```

use javagraph_core::facts::{DirectoryFacts, FactSource, ARTIFACT_FILE};
use javagraph_core::{Result, ResultExt};
use std::path::Path;
use std::sync::Arc;
use strum_macros::{AsRefStr, Display, EnumString};
use tracing::{error, info, warn};

/// One logical import: every artifact in one directory of the repository
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum ArtifactGroup {
    Libraries,
    Jars,
    Projects,
}

impl ArtifactGroup {
    pub fn dir_name(&self) -> &'static str {
        match self {
            ArtifactGroup::Libraries => "libraries",
            ArtifactGroup::Jars => "jars",
            ArtifactGroup::Projects => "projects",
        }
    }
}

/// Open every extracted artifact of `group`, sorted by directory name.
///
/// Artifacts the extractor marked as not extracted are left out, and so are
/// directories whose `artifact.json` cannot be read. An artifact without a
/// `path` is identified by `<group>/<directory>`.
pub fn discover_artifacts(root: &Path, group: ArtifactGroup) -> Result<Vec<Arc<dyn FactSource>>> {
    let dir = root.join(group.dir_name());
    if !dir.is_dir() {
        warn!(path = %dir.display(), "No {group} directory in repository");
        return Ok(Vec::new());
    }

    let mut paths = Vec::new();
    for entry in std::fs::read_dir(&dir).context(format!("Failed to list {}", dir.display()))? {
        let path = entry
            .context(format!("Failed to list {}", dir.display()))?
            .path();
        if path.join(ARTIFACT_FILE).is_file() {
            paths.push(path);
        }
    }
    paths.sort();

    let mut artifacts: Vec<Arc<dyn FactSource>> = Vec::with_capacity(paths.len());
    for path in paths {
        let dir_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let facts = match DirectoryFacts::open(&path) {
            Ok(facts) => facts.with_default_path(format!("{}/{dir_name}", group.dir_name())),
            Err(e) => {
                error!(path = %path.display(), "Skipping unreadable artifact: {e}");
                continue;
            }
        };
        if !facts.descriptor().extracted {
            info!(artifact = %facts.descriptor().name, "Skipping artifact that was not extracted");
            continue;
        }
        artifacts.push(Arc::new(facts));
    }
    Ok(artifacts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::str::FromStr;
    use tempfile::TempDir;

    fn write_artifact(root: &Path, group: &str, dir: &str, descriptor: &str) {
        let path = root.join(group).join(dir);
        fs::create_dir_all(&path).unwrap();
        fs::write(path.join(ARTIFACT_FILE), descriptor).unwrap();
    }

    #[test]
    fn test_discovers_sorted_extracted_artifacts() {
        let temp = TempDir::new().unwrap();
        write_artifact(
            temp.path(),
            "jars",
            "b",
            r#"{"name": "b", "kind": "JAR", "hash": "2"}"#,
        );
        write_artifact(
            temp.path(),
            "jars",
            "a",
            r#"{"name": "a", "kind": "JAR", "hash": "1"}"#,
        );
        write_artifact(
            temp.path(),
            "jars",
            "broken",
            r#"{"name": "broken", "kind": "JAR", "extracted": false}"#,
        );
        fs::create_dir_all(temp.path().join("jars").join("empty")).unwrap();

        let artifacts = discover_artifacts(temp.path(), ArtifactGroup::Jars).unwrap();
        let names: Vec<&str> = artifacts
            .iter()
            .map(|a| a.descriptor().name.as_str())
            .collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_same_name_in_different_directories_gets_distinct_paths() {
        let temp = TempDir::new().unwrap();
        write_artifact(
            temp.path(),
            "projects",
            "alice-commons",
            r#"{"name": "commons", "kind": "SOURCE_PROJECT"}"#,
        );
        write_artifact(
            temp.path(),
            "projects",
            "bob-commons",
            r#"{"name": "commons", "kind": "SOURCE_PROJECT"}"#,
        );
        write_artifact(
            temp.path(),
            "projects",
            "pinned",
            r#"{"name": "pinned", "kind": "SOURCE_PROJECT", "path": "elsewhere/pinned"}"#,
        );

        let artifacts = discover_artifacts(temp.path(), ArtifactGroup::Projects).unwrap();
        let paths: Vec<Option<&str>> = artifacts
            .iter()
            .map(|a| a.descriptor().path.as_deref())
            .collect();
        assert_eq!(
            paths,
            vec![
                Some("projects/alice-commons"),
                Some("projects/bob-commons"),
                Some("elsewhere/pinned"),
            ]
        );
    }

    #[test]
    fn test_malformed_descriptor_skips_only_that_artifact() {
        let temp = TempDir::new().unwrap();
        write_artifact(
            temp.path(),
            "jars",
            "good",
            r#"{"name": "good", "kind": "JAR", "hash": "1"}"#,
        );
        write_artifact(temp.path(), "jars", "bad", "{not json");

        let artifacts = discover_artifacts(temp.path(), ArtifactGroup::Jars).unwrap();
        let names: Vec<&str> = artifacts
            .iter()
            .map(|a| a.descriptor().name.as_str())
            .collect();
        assert_eq!(names, vec!["good"]);
    }

    #[test]
    fn test_missing_group_directory_is_empty() {
        let temp = TempDir::new().unwrap();
        let artifacts = discover_artifacts(temp.path(), ArtifactGroup::Projects).unwrap();
        assert!(artifacts.is_empty());
    }

    #[test]
    fn test_group_names() {
        assert_eq!(ArtifactGroup::Libraries.to_string(), "libraries");
        assert_eq!(
            ArtifactGroup::from_str("projects").ok(),
            Some(ArtifactGroup::Projects)
        );
    }
}
