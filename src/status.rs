//! Assignment status reporting.
//!
//! This module provides [`AssignmentStatus`] for inspecting the recorded
//! state of a document without running any pipeline stage.

use std::fmt;

use crate::AssignmentManifest;

/// Snapshot of a document's recorded pipeline state.
///
/// Returned by [`assignment_status`](crate::Pipeline::assignment_status).
/// The manifest alone does not guarantee freshness: `md_hash_matches`
/// compares the stored hash against the document's live content, and
/// `audio_file_exists` checks the recorded audio path on disk.
#[derive(Debug, Clone)]
pub struct AssignmentStatus {
    /// Storage key of the document's manifest.
    pub manifest_path: String,

    /// The stored manifest, or `None` when the document has never
    /// completed a run.
    pub manifest: Option<AssignmentManifest>,

    /// True only if a manifest exists, the document is readable, and its
    /// live content hash equals the stored hash.
    pub md_hash_matches: bool,

    /// True if the manifest's recorded audio path exists on disk. False
    /// when no audio was recorded or on any access error.
    pub audio_file_exists: bool,
}

impl AssignmentStatus {
    /// Returns true when a manifest exists for the document.
    pub fn has_manifest(&self) -> bool {
        self.manifest.is_some()
    }

    /// Returns true when the stored state is stale against the current
    /// document content.
    pub fn is_stale(&self) -> bool {
        self.has_manifest() && !self.md_hash_matches
    }
}

impl fmt::Display for AssignmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Manifest: {}", self.manifest_path)?;
        match &self.manifest {
            None => writeln!(f, "  (no recorded run)")?,
            Some(manifest) => {
                writeln!(
                    f,
                    "  last run: {}",
                    manifest.timestamp.format("%Y-%m-%d %H:%M:%S")
                )?;
                if let Some(page_id) = &manifest.page_id {
                    writeln!(f, "  page: {page_id}")?;
                }
                if let Some(preset) = &manifest.preset {
                    writeln!(f, "  preset: {preset}")?;
                }
                writeln!(
                    f,
                    "  content: {}",
                    if self.md_hash_matches {
                        "unchanged"
                    } else {
                        "drifted"
                    }
                )?;
                if let Some(audio) = &manifest.audio {
                    writeln!(
                        f,
                        "  audio: {} ({})",
                        audio.path.display(),
                        if self.audio_file_exists {
                            "present"
                        } else {
                            "missing"
                        }
                    )?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::AudioRecord;
    use std::path::PathBuf;

    fn status_with_manifest() -> AssignmentStatus {
        let mut manifest = AssignmentManifest::new("hash-1");
        manifest.page_id = Some("page-1".to_string());
        manifest.preset = Some("rainbow".to_string());
        manifest.audio = Some(AudioRecord {
            path: PathBuf::from("/tmp/lesson.mp3"),
            url: None,
            hash: "audio-hash".to_string(),
            voices: Vec::new(),
        });

        AssignmentStatus {
            manifest_path: "/x/lesson.manifest.json".to_string(),
            manifest: Some(manifest),
            md_hash_matches: true,
            audio_file_exists: false,
        }
    }

    #[test]
    fn test_has_manifest() {
        assert!(status_with_manifest().has_manifest());

        let absent = AssignmentStatus {
            manifest_path: "/x/lesson.manifest.json".to_string(),
            manifest: None,
            md_hash_matches: false,
            audio_file_exists: false,
        };
        assert!(!absent.has_manifest());
    }

    #[test]
    fn test_is_stale() {
        let mut status = status_with_manifest();
        assert!(!status.is_stale());

        status.md_hash_matches = false;
        assert!(status.is_stale());
    }

    #[test]
    fn test_is_stale_without_manifest() {
        let status = AssignmentStatus {
            manifest_path: "x".to_string(),
            manifest: None,
            md_hash_matches: false,
            audio_file_exists: false,
        };
        assert!(!status.is_stale());
    }

    #[test]
    fn test_display_with_manifest() {
        let rendered = status_with_manifest().to_string();
        assert!(rendered.contains("/x/lesson.manifest.json"));
        assert!(rendered.contains("page: page-1"));
        assert!(rendered.contains("preset: rainbow"));
        assert!(rendered.contains("content: unchanged"));
        assert!(rendered.contains("missing"));
    }

    #[test]
    fn test_display_without_manifest() {
        let status = AssignmentStatus {
            manifest_path: "/x/lesson.manifest.json".to_string(),
            manifest: None,
            md_hash_matches: false,
            audio_file_exists: false,
        };
        assert!(status.to_string().contains("no recorded run"));
    }
}
