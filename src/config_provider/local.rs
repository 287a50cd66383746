//! Local-filesystem config provider.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::{ConfigProvider, PresetDefinition, StudentProfile};
use crate::{MimeoError, Result};

const PRESETS_FILE: &str = "presets.json";
const VOICES_FILE: &str = "voices.json";
const STUDENTS_DIR: &str = "students";

const PRESETS_ENV: &str = "MIMEO_PRESETS_PATH";
const VOICES_ENV: &str = "MIMEO_VOICES_PATH";
const STUDENTS_ENV: &str = "MIMEO_STUDENTS_DIR";

/// Explicit path overrides for [`LocalConfigProvider`].
///
/// Any field left unset falls back to the provider's search order.
#[derive(Debug, Clone, Default)]
pub struct LocalConfigOptions {
    /// Path of the presets file.
    pub presets_path: Option<PathBuf>,

    /// Path of the voice-mapping file.
    pub voices_path: Option<PathBuf>,

    /// Directory of student profile files.
    pub students_dir: Option<PathBuf>,
}

/// A [`ConfigProvider`] reading from configured filesystem paths.
///
/// Each resource is resolved once at construction with a fallback search
/// order: explicit option, environment variable, `config/` under the
/// working directory, `config/` beside the executable, then the
/// repository-relative `config/` directory. The first existing candidate
/// wins. When no candidate exists for a resource, construction fails with
/// a configuration error naming every checked path.
#[derive(Debug, Clone)]
pub struct LocalConfigProvider {
    presets_path: PathBuf,
    voices_path: PathBuf,
    students_dir: PathBuf,
}

impl LocalConfigProvider {
    /// Resolves all three resources, failing fast on any missing one.
    pub fn new(options: LocalConfigOptions) -> Result<Self> {
        Ok(Self {
            presets_path: resolve_resource("presets", options.presets_path, PRESETS_ENV, PRESETS_FILE)?,
            voices_path: resolve_resource("voices", options.voices_path, VOICES_ENV, VOICES_FILE)?,
            students_dir: resolve_resource("students", options.students_dir, STUDENTS_ENV, STUDENTS_DIR)?,
        })
    }

    /// The resolved presets file path.
    pub fn presets_path(&self) -> &Path {
        &self.presets_path
    }

    /// The resolved students directory.
    pub fn students_dir(&self) -> &Path {
        &self.students_dir
    }
}

fn resolve_resource(
    resource: &str,
    explicit: Option<PathBuf>,
    env_var: &str,
    file_name: &str,
) -> Result<PathBuf> {
    let mut candidates: Vec<PathBuf> = Vec::new();

    if let Some(path) = explicit {
        candidates.push(path);
    }
    if let Ok(path) = std::env::var(env_var) {
        if !path.is_empty() {
            candidates.push(PathBuf::from(path));
        }
    }
    candidates.push(PathBuf::from("config").join(file_name));
    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            candidates.push(dir.join("config").join(file_name));
        }
    }
    candidates.push(Path::new(env!("CARGO_MANIFEST_DIR")).join("config").join(file_name));

    for candidate in &candidates {
        if candidate.exists() {
            return Ok(candidate.clone());
        }
    }

    let checked: Vec<String> = candidates
        .iter()
        .map(|c| c.display().to_string())
        .collect();
    Err(MimeoError::Config(format!(
        "{resource} resource not found; checked: {}",
        checked.join(", ")
    )))
}

#[async_trait]
impl ConfigProvider for LocalConfigProvider {
    async fn load_presets(&self) -> Result<HashMap<String, PresetDefinition>> {
        let bytes = tokio::fs::read(&self.presets_path).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn load_student_profiles(&self) -> Result<Vec<StudentProfile>> {
        let mut entries = tokio::fs::read_dir(&self.students_dir).await?;
        let mut paths: Vec<PathBuf> = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                paths.push(path);
            }
        }
        // Directory iteration order is not stable; sort for determinism.
        paths.sort();

        let mut profiles = Vec::with_capacity(paths.len());
        for path in paths {
            let bytes = tokio::fs::read(&path).await?;
            profiles.push(serde_json::from_slice(&bytes)?);
        }
        Ok(profiles)
    }

    async fn resolve_voices_path(&self) -> Result<Option<PathBuf>> {
        Ok(Some(self.voices_path.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seed_config(dir: &Path) -> LocalConfigOptions {
        let presets_path = dir.join("presets.json");
        let voices_path = dir.join("voices.json");
        let students_dir = dir.join("students");

        tokio::fs::write(
            &presets_path,
            br##"{"rainbow":{"description":"color by part of speech","nouns":"#f00"}}"##,
        )
        .await
        .unwrap();
        tokio::fs::write(&voices_path, br#"{"Teacher":"en-GB-anna"}"#)
            .await
            .unwrap();
        tokio::fs::create_dir_all(&students_dir).await.unwrap();
        tokio::fs::write(
            students_dir.join("anna.json"),
            br#"{"name":"Anna","databaseId":"db-7"}"#,
        )
        .await
        .unwrap();
        tokio::fs::write(students_dir.join("b2.json"), br#"{"name":"B2 group"}"#)
            .await
            .unwrap();
        tokio::fs::write(students_dir.join("notes.txt"), b"ignore me")
            .await
            .unwrap();

        LocalConfigOptions {
            presets_path: Some(presets_path),
            voices_path: Some(voices_path),
            students_dir: Some(students_dir),
        }
    }

    #[tokio::test]
    async fn test_explicit_options_win() {
        let dir = tempfile::tempdir().unwrap();
        let options = seed_config(dir.path()).await;
        let provider = LocalConfigProvider::new(options).unwrap();

        assert!(provider.presets_path().starts_with(dir.path()));
        assert!(provider.students_dir().starts_with(dir.path()));
    }

    #[tokio::test]
    async fn test_load_presets() {
        let dir = tempfile::tempdir().unwrap();
        let provider = LocalConfigProvider::new(seed_config(dir.path()).await).unwrap();

        let presets = provider.load_presets().await.unwrap();
        assert_eq!(presets.len(), 1);
        let rainbow = presets.get("rainbow").unwrap();
        assert_eq!(
            rainbow.description.as_deref(),
            Some("color by part of speech")
        );
    }

    #[tokio::test]
    async fn test_load_student_profiles_sorted_json_only() {
        let dir = tempfile::tempdir().unwrap();
        let provider = LocalConfigProvider::new(seed_config(dir.path()).await).unwrap();

        let profiles = provider.load_student_profiles().await.unwrap();
        assert_eq!(profiles.len(), 2);
        assert_eq!(profiles[0].name, "Anna");
        assert_eq!(profiles[1].name, "B2 group");
    }

    #[tokio::test]
    async fn test_resolve_voices_path_returns_resolved_file() {
        let dir = tempfile::tempdir().unwrap();
        let provider = LocalConfigProvider::new(seed_config(dir.path()).await).unwrap();

        let voices = provider.resolve_voices_path().await.unwrap();
        assert_eq!(voices, Some(dir.path().join("voices.json")));
    }

    #[test]
    fn test_missing_resource_lists_checked_paths() {
        let missing = PathBuf::from("/nonexistent/presets.json");
        let err = resolve_resource("presets", Some(missing.clone()), "MIMEO_TEST_UNSET", PRESETS_FILE)
            .unwrap_err();

        let message = err.to_string();
        assert!(message.contains("presets resource not found"));
        assert!(message.contains("checked:"));
        assert!(message.contains(&missing.display().to_string()));
    }
}
