//! Filesystem manifest store.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use super::{manifest_file_name, ManifestStore};
use crate::{AssignmentManifest, Result};

/// A [`ManifestStore`] that keeps each manifest next to its document.
///
/// The storage key for `/x/lesson.md` is `/x/lesson.manifest.json`: the
/// document's directory, its base name with the extension stripped, and a
/// fixed suffix.
///
/// # Example
///
/// ```
/// use mimeo::FsManifestStore;
/// use mimeo::ManifestStore;
/// use std::path::Path;
///
/// let store = FsManifestStore::new();
/// assert_eq!(
///     store.manifest_path_for(Path::new("/x/lesson.md")),
///     "/x/lesson.manifest.json"
/// );
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct FsManifestStore;

impl FsManifestStore {
    /// Creates a filesystem manifest store.
    pub fn new() -> Self {
        Self
    }

    fn manifest_path(&self, document: &Path) -> PathBuf {
        let file_name = manifest_file_name(document);
        match document.parent() {
            Some(parent) => parent.join(file_name),
            None => PathBuf::from(file_name),
        }
    }
}

#[async_trait]
impl ManifestStore for FsManifestStore {
    fn manifest_path_for(&self, document: &Path) -> String {
        self.manifest_path(document).display().to_string()
    }

    async fn write_manifest(
        &self,
        document: &Path,
        manifest: &AssignmentManifest,
    ) -> Result<String> {
        let path = self.manifest_path(document);
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let bytes = serde_json::to_vec_pretty(manifest)?;
        tokio::fs::write(&path, bytes).await?;
        Ok(path.display().to_string())
    }

    async fn read_manifest(&self, document: &Path) -> Result<Option<AssignmentManifest>> {
        let path = self.manifest_path(document);

        // Any read or parse failure means "no usable manifest": the
        // orchestrator must treat a corrupt record the same as a fresh
        // document.
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(_) => return Ok(None),
        };

        Ok(serde_json::from_slice(&bytes).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest() -> AssignmentManifest {
        let mut m = AssignmentManifest::new("hash-1");
        m.page_id = Some("page-1".to_string());
        m
    }

    #[test]
    fn test_manifest_path_for_is_pure() {
        let store = FsManifestStore::new();
        let a = store.manifest_path_for(Path::new("/x/lesson.md"));
        let b = store.manifest_path_for(Path::new("/x/lesson.md"));
        assert_eq!(a, b);
        assert_eq!(a, "/x/lesson.manifest.json");
    }

    #[test]
    fn test_manifest_path_for_bare_file_name() {
        let store = FsManifestStore::new();
        assert_eq!(
            store.manifest_path_for(Path::new("lesson.md")),
            "lesson.manifest.json"
        );
    }

    #[tokio::test]
    async fn test_write_then_read_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let doc = dir.path().join("lesson.md");
        let store = FsManifestStore::new();

        let written = manifest();
        let key = store.write_manifest(&doc, &written).await.unwrap();
        assert!(key.ends_with("lesson.manifest.json"));

        let read = store.read_manifest(&doc).await.unwrap();
        assert_eq!(read, Some(written));
    }

    #[tokio::test]
    async fn test_write_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let doc = dir.path().join("unit-3").join("week-2").join("lesson.md");
        let store = FsManifestStore::new();

        store.write_manifest(&doc, &manifest()).await.unwrap();

        let read = store.read_manifest(&doc).await.unwrap();
        assert!(read.is_some());
    }

    #[tokio::test]
    async fn test_read_missing_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let doc = dir.path().join("never-run.md");
        let store = FsManifestStore::new();

        let read = store.read_manifest(&doc).await.unwrap();
        assert!(read.is_none());
    }

    #[tokio::test]
    async fn test_read_corrupt_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let doc = dir.path().join("lesson.md");
        let store = FsManifestStore::new();

        let key = store.manifest_path_for(&doc);
        tokio::fs::write(&key, b"{ not json").await.unwrap();

        let read = store.read_manifest(&doc).await.unwrap();
        assert!(read.is_none());
    }

    #[tokio::test]
    async fn test_write_replaces_existing() {
        let dir = tempfile::tempdir().unwrap();
        let doc = dir.path().join("lesson.md");
        let store = FsManifestStore::new();

        store.write_manifest(&doc, &manifest()).await.unwrap();

        let mut updated = manifest();
        updated.md_hash = "hash-2".to_string();
        store.write_manifest(&doc, &updated).await.unwrap();

        let read = store.read_manifest(&doc).await.unwrap().unwrap();
        assert_eq!(read.md_hash, "hash-2");
    }
}
