//! The per-document run manifest.
//!
//! This module defines [`AssignmentManifest`], the persisted record of the
//! last pipeline run for one source document. The manifest seeds skip and
//! reuse decisions on later runs and drives drift detection against the
//! current document content.
//!
//! Serialized manifests use camelCase field names and omit unset optional
//! fields entirely rather than writing nulls, so records written by older
//! runs stay readable and records written by newer runs stay minimal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

use crate::Result;

/// The schema version written by this build.
pub const CURRENT_SCHEMA_VERSION: u32 = 2;

fn default_schema_version() -> u32 {
    CURRENT_SCHEMA_VERSION
}

/// Per-speaker voice assignment provenance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceAssignment {
    /// Speaker label as it appears in the document dialogue.
    pub speaker: String,

    /// Voice identifier that was assigned to the speaker.
    pub voice: String,
}

/// Record of the synthesized audio for a document.
///
/// Present on the manifest only once a synthesis stage has run at least
/// once. `path` existing on disk is not guaranteed by the manifest alone;
/// freshness is checked separately by
/// [`assignment_status`](crate::Pipeline::assignment_status).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioRecord {
    /// Local filesystem path of the synthesized audio file.
    pub path: PathBuf,

    /// Public or presigned URL of the uploaded audio, absent before the
    /// first upload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Content hash of the audio file.
    pub hash: String,

    /// Per-speaker voice assignments used for this synthesis.
    #[serde(default)]
    pub voices: Vec<VoiceAssignment>,
}

/// One persisted record per source document.
///
/// Exactly one manifest exists per document path; its storage key is a
/// pure function of that path. A manifest is only overwritten by a full
/// pipeline run or an explicit rerun; reads never mutate it beyond
/// defaulting `schema_version`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentManifest {
    /// Manifest schema version, defaulted to the current version when
    /// absent in stored records.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    /// SHA-256 hex digest of the source document at last successful run.
    pub md_hash: String,

    /// Identifier of the published page, absent before first import.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_id: Option<String>,

    /// URL of the published page, absent before first import.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_url: Option<String>,

    /// Synthesized audio record, absent until a synthesis stage has run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<AudioRecord>,

    /// Name of the formatting preset last applied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preset: Option<String>,

    /// Synthesis mode used for the last run, when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tts_mode: Option<String>,

    /// Dialogue language used for the last synthesis, when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dialogue_language: Option<String>,

    /// Dialogue stability used for the last synthesis, when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dialogue_stability: Option<f32>,

    /// Dialogue seed used for the last synthesis, when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dialogue_seed: Option<u64>,

    /// Time of the last manifest write.
    pub timestamp: DateTime<Utc>,
}

impl AssignmentManifest {
    /// Creates a manifest with the given content hash and the current
    /// schema version. All optional fields start unset.
    pub fn new(md_hash: impl Into<String>) -> Self {
        Self {
            schema_version: CURRENT_SCHEMA_VERSION,
            md_hash: md_hash.into(),
            page_id: None,
            page_url: None,
            audio: None,
            preset: None,
            tts_mode: None,
            dialogue_language: None,
            dialogue_stability: None,
            dialogue_seed: None,
            timestamp: Utc::now(),
        }
    }
}

/// Returns the lowercase SHA-256 hex digest of a byte slice.
pub fn hash_bytes(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Computes the content hash of a document on disk.
///
/// # Errors
///
/// Returns an I/O error if the document cannot be read.
pub async fn content_hash(document: &Path) -> Result<String> {
    let bytes = tokio::fs::read(document).await?;
    Ok(hash_bytes(&bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_manifest_has_current_schema_version() {
        let manifest = AssignmentManifest::new("abc");
        assert_eq!(manifest.schema_version, CURRENT_SCHEMA_VERSION);
        assert_eq!(manifest.md_hash, "abc");
        assert!(manifest.page_id.is_none());
        assert!(manifest.audio.is_none());
    }

    #[test]
    fn test_serialize_omits_unset_optionals() {
        let manifest = AssignmentManifest::new("abc");
        let json = serde_json::to_string(&manifest).unwrap();

        assert!(json.contains("\"mdHash\":\"abc\""));
        assert!(json.contains("\"schemaVersion\""));
        assert!(json.contains("\"timestamp\""));
        assert!(!json.contains("pageId"));
        assert!(!json.contains("pageUrl"));
        assert!(!json.contains("audio"));
        assert!(!json.contains("preset"));
        assert!(!json.contains("ttsMode"));
        assert!(!json.contains("null"));
    }

    #[test]
    fn test_serialize_includes_set_optionals() {
        let mut manifest = AssignmentManifest::new("abc");
        manifest.page_id = Some("page-1".to_string());
        manifest.preset = Some("rainbow".to_string());
        manifest.dialogue_seed = Some(7);

        let json = serde_json::to_string(&manifest).unwrap();
        assert!(json.contains("\"pageId\":\"page-1\""));
        assert!(json.contains("\"preset\":\"rainbow\""));
        assert!(json.contains("\"dialogueSeed\":7"));
    }

    #[test]
    fn test_deserialize_defaults_schema_version() {
        let json = r#"{"mdHash":"abc","timestamp":"2024-01-01T00:00:00Z"}"#;
        let manifest: AssignmentManifest = serde_json::from_str(json).unwrap();
        assert_eq!(manifest.schema_version, CURRENT_SCHEMA_VERSION);
    }

    #[test]
    fn test_deserialize_keeps_explicit_schema_version() {
        let json = r#"{"schemaVersion":1,"mdHash":"abc","timestamp":"2024-01-01T00:00:00Z"}"#;
        let manifest: AssignmentManifest = serde_json::from_str(json).unwrap();
        assert_eq!(manifest.schema_version, 1);
    }

    #[test]
    fn test_audio_record_round_trip() {
        let record = AudioRecord {
            path: PathBuf::from("/tmp/lesson.mp3"),
            url: Some("https://bucket.s3.amazonaws.com/audio/lesson.mp3".to_string()),
            hash: "deadbeef".to_string(),
            voices: vec![VoiceAssignment {
                speaker: "Teacher".to_string(),
                voice: "en-GB-anna".to_string(),
            }],
        };

        let json = serde_json::to_string(&record).unwrap();
        let parsed: AudioRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn test_audio_record_url_omitted_when_unset() {
        let record = AudioRecord {
            path: PathBuf::from("/tmp/lesson.mp3"),
            url: None,
            hash: "deadbeef".to_string(),
            voices: Vec::new(),
        };
        let json = serde_json::to_string(&record).unwrap();
        assert!(!json.contains("url"));
        assert!(!json.contains("null"));
    }

    #[test]
    fn test_audio_record_voices_default_on_read() {
        let json = r#"{"path":"/tmp/a.mp3","hash":"x"}"#;
        let record: AudioRecord = serde_json::from_str(json).unwrap();
        assert!(record.voices.is_empty());
        assert!(record.url.is_none());
    }

    #[test]
    fn test_hash_bytes_stable() {
        let a = hash_bytes(b"hello");
        let b = hash_bytes(b"hello");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert_eq!(
            a,
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn test_hash_bytes_differs_on_content_change() {
        assert_ne!(hash_bytes(b"hello"), hash_bytes(b"hello!"));
    }

    #[tokio::test]
    async fn test_content_hash_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lesson.md");
        tokio::fs::write(&path, b"# Lesson 1").await.unwrap();

        let hash = content_hash(&path).await.unwrap();
        assert_eq!(hash, hash_bytes(b"# Lesson 1"));
    }

    #[tokio::test]
    async fn test_content_hash_missing_file_errors() {
        let result = content_hash(Path::new("/nonexistent/lesson.md")).await;
        assert!(result.is_err());
    }
}
