//! Manifest persistence for the assignment pipeline.
//!
//! This module defines the [`ManifestStore`] trait for persisting and
//! retrieving the per-document run manifest, plus its two backends: the
//! local filesystem and object storage.

mod fs;
mod object;

pub use fs::FsManifestStore;
pub use object::ObjectManifestStore;

use async_trait::async_trait;
use std::path::Path;

use crate::{AssignmentManifest, Result};

/// Persists and retrieves one manifest per source document.
///
/// The storage key is a pure function of the document path, so repeated
/// runs against the same document always address the same record.
///
/// # Absent vs corrupt
///
/// `read_manifest` never errors on "not found": a missing record and a
/// record that fails to parse are both reported as `Ok(None)`. The
/// orchestrator deliberately treats "never run before" and "corrupt
/// state" identically as "run fresh". Backend failures that are neither
/// (network, auth) still propagate.
///
/// # Concurrency
///
/// Implementations must be safe for concurrent reads and writes across
/// independent document keys. Two concurrent runs against the *same*
/// document are not coordinated; the final manifest write is
/// last-writer-wins.
#[async_trait]
pub trait ManifestStore: Send + Sync {
    /// Returns the storage key for a document's manifest.
    fn manifest_path_for(&self, document: &Path) -> String;

    /// Writes the manifest, creating any missing parent location, and
    /// returns the storage key.
    async fn write_manifest(
        &self,
        document: &Path,
        manifest: &AssignmentManifest,
    ) -> Result<String>;

    /// Reads the manifest, or `None` when absent or unparseable.
    async fn read_manifest(&self, document: &Path) -> Result<Option<AssignmentManifest>>;
}

/// Suffix appended to a document's stem to form its manifest file name.
pub(crate) const MANIFEST_SUFFIX: &str = ".manifest.json";

/// Returns `<stem>.manifest.json` for a document path.
pub(crate) fn manifest_file_name(document: &Path) -> String {
    let stem = document
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("{stem}{MANIFEST_SUFFIX}")
}
