//! Object-storage manifest store.

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

use super::{manifest_file_name, ManifestStore};
use crate::collaborators::ObjectStorage;
use crate::{AssignmentManifest, Result};

/// A [`ManifestStore`] backed by a bucket in object storage.
///
/// Keys collapse the document's directory: `/x/lesson.md` under bucket
/// `b` and prefix `p` is stored at `s3://b/p/lesson.manifest.json`. The
/// wire calls themselves go through an injected [`ObjectStorage`]
/// implementation; a `get` returning `None` is treated as "no manifest"
/// while every other storage failure propagates. Writes are full-object
/// replaces.
#[derive(Debug, Clone)]
pub struct ObjectManifestStore {
    storage: Arc<dyn ObjectStorage>,
    bucket: String,
    prefix: String,
}

impl ObjectManifestStore {
    /// Creates a store over the given bucket and key prefix.
    ///
    /// A trailing slash on the prefix is stripped so keys never contain
    /// doubled separators.
    pub fn new(
        storage: Arc<dyn ObjectStorage>,
        bucket: impl Into<String>,
        prefix: impl Into<String>,
    ) -> Self {
        let prefix = prefix.into();
        let prefix = prefix.strip_suffix('/').unwrap_or(&prefix).to_string();
        Self {
            storage,
            bucket: bucket.into(),
            prefix,
        }
    }

    /// The bucket this store writes into.
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    fn key_for(&self, document: &Path) -> String {
        let file_name = manifest_file_name(document);
        if self.prefix.is_empty() {
            file_name
        } else {
            format!("{}/{}", self.prefix, file_name)
        }
    }
}

#[async_trait]
impl ManifestStore for ObjectManifestStore {
    fn manifest_path_for(&self, document: &Path) -> String {
        format!("s3://{}/{}", self.bucket, self.key_for(document))
    }

    async fn write_manifest(
        &self,
        document: &Path,
        manifest: &AssignmentManifest,
    ) -> Result<String> {
        let key = self.key_for(document);
        let bytes = serde_json::to_vec_pretty(manifest)?;
        self.storage.put(&self.bucket, &key, &bytes).await?;
        Ok(format!("s3://{}/{}", self.bucket, key))
    }

    async fn read_manifest(&self, document: &Path) -> Result<Option<AssignmentManifest>> {
        let key = self.key_for(document);
        match self.storage.get(&self.bucket, &key).await? {
            // Unparseable content is normalized to absent, same as the
            // filesystem store.
            Some(bytes) => Ok(serde_json::from_slice(&bytes).ok()),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MimeoError;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory stand-in for a bucket.
    #[derive(Debug, Default)]
    struct FakeStorage {
        objects: Mutex<HashMap<String, Vec<u8>>>,
        fail: bool,
    }

    #[async_trait]
    impl ObjectStorage for FakeStorage {
        async fn get(&self, bucket: &str, key: &str) -> Result<Option<Vec<u8>>> {
            if self.fail {
                return Err(MimeoError::Collaborator("storage unavailable".to_string()));
            }
            let objects = self.objects.lock().unwrap();
            Ok(objects.get(&format!("{bucket}/{key}")).cloned())
        }

        async fn put(&self, bucket: &str, key: &str, bytes: &[u8]) -> Result<()> {
            let mut objects = self.objects.lock().unwrap();
            objects.insert(format!("{bucket}/{key}"), bytes.to_vec());
            Ok(())
        }
    }

    fn store_with(storage: Arc<FakeStorage>, prefix: &str) -> ObjectManifestStore {
        ObjectManifestStore::new(storage, "b", prefix)
    }

    #[test]
    fn test_manifest_path_for_drops_document_directory() {
        let store = store_with(Arc::new(FakeStorage::default()), "p");
        assert_eq!(
            store.manifest_path_for(Path::new("/x/lesson.md")),
            "s3://b/p/lesson.manifest.json"
        );
    }

    #[test]
    fn test_trailing_slash_prefix_is_normalized() {
        let store = store_with(Arc::new(FakeStorage::default()), "p/");
        assert_eq!(
            store.manifest_path_for(Path::new("lesson.md")),
            "s3://b/p/lesson.manifest.json"
        );
    }

    #[test]
    fn test_empty_prefix_omits_separator() {
        let store = store_with(Arc::new(FakeStorage::default()), "");
        assert_eq!(
            store.manifest_path_for(Path::new("lesson.md")),
            "s3://b/lesson.manifest.json"
        );
    }

    #[tokio::test]
    async fn test_write_then_read_round_trip() {
        let storage = Arc::new(FakeStorage::default());
        let store = store_with(storage, "p");
        let doc = Path::new("/x/lesson.md");

        let manifest = AssignmentManifest::new("hash-1");
        let key = store.write_manifest(doc, &manifest).await.unwrap();
        assert_eq!(key, "s3://b/p/lesson.manifest.json");

        let read = store.read_manifest(doc).await.unwrap();
        assert_eq!(read, Some(manifest));
    }

    #[tokio::test]
    async fn test_read_missing_returns_none() {
        let store = store_with(Arc::new(FakeStorage::default()), "p");
        let read = store.read_manifest(Path::new("lesson.md")).await.unwrap();
        assert!(read.is_none());
    }

    #[tokio::test]
    async fn test_read_corrupt_returns_none() {
        let storage = Arc::new(FakeStorage::default());
        storage
            .put("b", "p/lesson.manifest.json", b"{ not json")
            .await
            .unwrap();

        let store = store_with(storage, "p");
        let read = store.read_manifest(Path::new("lesson.md")).await.unwrap();
        assert!(read.is_none());
    }

    #[tokio::test]
    async fn test_storage_failure_propagates() {
        let storage = Arc::new(FakeStorage {
            fail: true,
            ..FakeStorage::default()
        });
        let store = store_with(storage, "p");

        let result = store.read_manifest(Path::new("lesson.md")).await;
        assert!(matches!(result, Err(MimeoError::Collaborator(_))));
    }

    #[tokio::test]
    async fn test_write_is_full_replace() {
        let storage = Arc::new(FakeStorage::default());
        let store = store_with(Arc::clone(&storage), "p");
        let doc = Path::new("lesson.md");

        let mut first = AssignmentManifest::new("hash-1");
        first.page_id = Some("page-1".to_string());
        store.write_manifest(doc, &first).await.unwrap();

        // Second write omits page_id; the stored record must not retain it.
        let second = AssignmentManifest::new("hash-2");
        store.write_manifest(doc, &second).await.unwrap();

        let read = store.read_manifest(doc).await.unwrap().unwrap();
        assert_eq!(read.md_hash, "hash-2");
        assert!(read.page_id.is_none());
    }
}
