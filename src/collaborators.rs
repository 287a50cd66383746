//! Interfaces to the pipeline's external collaborators.
//!
//! The orchestrator never talks to the content-management service, the
//! speech synthesizer, or object storage directly. Each collaborator is a
//! narrow, object-safe async trait; implementations live with the caller
//! and are injected at pipeline construction.
//!
//! Collaborator errors propagate through the pipeline unchanged, with one
//! exception: a synthesizer returning
//! [`MimeoError::MissingSynthesisBinary`](crate::MimeoError::MissingSynthesisBinary)
//! is re-wrapped by the sequencer with remediation guidance.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::path::{Path, PathBuf};

use crate::config_provider::PresetDefinition;
use crate::manifest::VoiceAssignment;
use crate::Result;

/// Identifiers of a published page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRef {
    /// Identifier of the page in the content-management service.
    pub page_id: String,

    /// Public URL of the page, when the service exposes one.
    pub page_url: Option<String>,
}

/// Element counts reported by a colorize run.
///
/// Rendered into step records as `<updated>/<skipped>/<failed>`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ColorizeCounts {
    /// Elements the formatter restyled.
    pub updated: u32,
    /// Elements already matching the preset.
    pub skipped: u32,
    /// Elements the formatter could not restyle.
    pub failed: u32,
}

/// Options forwarded to the speech synthesizer.
#[derive(Debug, Clone, Default)]
pub struct SynthesisOptions {
    /// Synthesis mode.
    pub mode: Option<String>,

    /// Dialogue language.
    pub language: Option<String>,

    /// Dialogue stability.
    pub stability: Option<f32>,

    /// Dialogue seed for reproducible output.
    pub seed: Option<u64>,

    /// Bypass any synthesizer-internal cache.
    pub redo: bool,
}

/// Result of a synthesis run.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisOutput {
    /// Local path of the produced audio file.
    pub audio_path: PathBuf,

    /// Content hash of the produced audio.
    pub audio_hash: String,

    /// Per-speaker voice assignments chosen for this run.
    pub voices: Vec<VoiceAssignment>,
}

/// Parameters for one object upload.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    /// Target bucket.
    pub bucket: String,

    /// Object key within the bucket.
    pub key: String,

    /// Bucket region, when configured.
    pub region: Option<String>,

    /// Make the object publicly readable.
    pub public_read: bool,

    /// Presign the returned URL for this many seconds.
    pub presign_seconds: Option<u64>,
}

/// Validates and publishes authored documents.
#[async_trait]
pub trait Importer: Debug + Send + Sync {
    /// Checks the document's structure without publishing anything.
    async fn validate(&self, document: &Path) -> Result<()>;

    /// Publishes the document, creating or updating its page.
    ///
    /// `prior` carries the page identifiers from the document's last run,
    /// when known. `replace` requests a full page replacement rather than
    /// an in-place update.
    async fn import(
        &self,
        document: &Path,
        prior: Option<&PageRef>,
        replace: bool,
    ) -> Result<PageRef>;
}

/// Applies a visual formatting preset to a published page.
#[async_trait]
pub trait Colorizer: Debug + Send + Sync {
    /// Restyles the page according to the preset definition.
    async fn colorize(
        &self,
        page_id: &str,
        preset: &str,
        definition: &PresetDefinition,
    ) -> Result<ColorizeCounts>;
}

/// Synthesizes speech audio for a document.
#[async_trait]
pub trait SpeechSynthesizer: Debug + Send + Sync {
    /// Produces an audio file for the document.
    ///
    /// `voices` points at the voice-mapping resource resolved by the
    /// config provider, when one exists.
    ///
    /// Implementations that shell out to an external binary should return
    /// [`MimeoError::MissingSynthesisBinary`](crate::MimeoError::MissingSynthesisBinary)
    /// when that binary is absent, so the pipeline can surface an
    /// actionable error.
    async fn synthesize(
        &self,
        document: &Path,
        voices: Option<&Path>,
        options: &SynthesisOptions,
    ) -> Result<SynthesisOutput>;
}

/// Uploads audio files to object storage.
#[async_trait]
pub trait Uploader: Debug + Send + Sync {
    /// Uploads the file and returns its public or presigned URL.
    async fn upload(&self, file: &Path, request: &UploadRequest) -> Result<String>;
}

/// Attaches uploaded audio back to a published page.
#[async_trait]
pub trait AudioAttacher: Debug + Send + Sync {
    /// Records the audio URL on the page.
    async fn attach(&self, page_id: &str, audio_url: &str) -> Result<()>;
}

/// Minimal object-storage surface used by the object-backed manifest
/// store.
///
/// `get` returns `Ok(None)` for a missing key; only genuine failures
/// (network, auth, throttling) are errors. `put` is a full-object
/// replace.
#[async_trait]
pub trait ObjectStorage: Debug + Send + Sync {
    /// Fetches an object, or `None` if the key does not exist.
    async fn get(&self, bucket: &str, key: &str) -> Result<Option<Vec<u8>>>;

    /// Writes an object, replacing any existing content.
    async fn put(&self, bucket: &str, key: &str, bytes: &[u8]) -> Result<()>;
}
