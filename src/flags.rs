//! Run flags for pipeline invocations.
//!
//! These structs carry the per-invocation options a CLI or queue worker
//! resolves before calling into the pipeline. Argument parsing itself
//! lives with the caller; the pipeline only consumes the resolved values.

use std::path::PathBuf;

/// Supported upload targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum UploadTarget {
    /// S3-compatible object storage.
    S3,
}

/// Flags controlling a full pipeline run.
///
/// Only `md` is required. Skip flags reuse state from the document's
/// previous manifest; outside dry-run mode each skip requires the
/// corresponding cached value to exist.
#[derive(Debug, Clone)]
pub struct RunFlags {
    /// Path of the source document. Required.
    pub md: PathBuf,

    /// Formatting preset to apply. The colorize stage is skipped when
    /// unset.
    pub preset: Option<String>,

    /// Whether to synthesize speech audio.
    pub with_tts: bool,

    /// Upload target for the synthesized audio. Upload and add-audio are
    /// skipped when unset.
    pub upload: Option<UploadTarget>,

    /// Simulate side-effecting stages without calling external
    /// collaborators.
    pub dry_run: bool,

    /// Replace the published page rather than updating it in place.
    pub force: bool,

    /// Skip the import stage, reusing the manifest's published page.
    pub skip_import: bool,

    /// Skip synthesis, reusing the manifest's cached audio.
    pub skip_tts: bool,

    /// Skip the upload, reusing the manifest's cached audio URL.
    pub skip_upload: bool,

    /// Force re-synthesis even when the synthesizer has a cached result.
    pub redo_tts: bool,

    /// Object key prefix for uploads. Overrides the configured default.
    pub prefix: Option<String>,

    /// Make the uploaded object publicly readable.
    pub public_read: bool,

    /// Presign the uploaded object URL for this many seconds.
    pub presign: Option<u64>,

    /// Synthesis mode, recorded into the manifest when set.
    pub tts_mode: Option<String>,

    /// Dialogue language, recorded into the manifest when set.
    pub dialogue_language: Option<String>,

    /// Dialogue stability, recorded into the manifest when set.
    pub dialogue_stability: Option<f32>,

    /// Dialogue seed, recorded into the manifest when set.
    pub dialogue_seed: Option<u64>,
}

impl RunFlags {
    /// Creates flags for a plain run of the given document with every
    /// option off.
    pub fn new(md: impl Into<PathBuf>) -> Self {
        Self {
            md: md.into(),
            preset: None,
            with_tts: false,
            upload: None,
            dry_run: false,
            force: false,
            skip_import: false,
            skip_tts: false,
            skip_upload: false,
            redo_tts: false,
            prefix: None,
            public_read: false,
            presign: None,
            tts_mode: None,
            dialogue_language: None,
            dialogue_stability: None,
            dialogue_seed: None,
        }
    }
}

/// Which steps a rerun re-executes.
///
/// The default selection is upload and add-audio, matching the common
/// case of re-publishing already-synthesized audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RerunSteps {
    /// Re-synthesize audio.
    pub tts: bool,
    /// Re-upload the audio file.
    pub upload: bool,
    /// Re-attach the audio URL to the published page.
    pub add_audio: bool,
}

impl Default for RerunSteps {
    fn default() -> Self {
        Self {
            tts: false,
            upload: true,
            add_audio: true,
        }
    }
}

/// Flags controlling a rerun of the audio steps.
///
/// A rerun requires the document's manifest to already exist; it is an
/// error to rerun a document that has never completed a full pipeline.
#[derive(Debug, Clone)]
pub struct RerunFlags {
    /// Path of the source document. Required.
    pub md: PathBuf,

    /// Which steps to re-execute.
    pub steps: RerunSteps,

    /// Object key prefix for the re-upload. Overrides the configured
    /// default.
    pub prefix: Option<String>,

    /// Make the re-uploaded object publicly readable.
    pub public_read: bool,

    /// Presign the re-uploaded object URL for this many seconds.
    pub presign: Option<u64>,

    /// Force re-synthesis even when the synthesizer has a cached result.
    pub redo_tts: bool,
}

impl RerunFlags {
    /// Creates rerun flags for the given document with the default step
    /// selection.
    pub fn new(md: impl Into<PathBuf>) -> Self {
        Self {
            md: md.into(),
            steps: RerunSteps::default(),
            prefix: None,
            public_read: false,
            presign: None,
            redo_tts: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_flags_new_defaults() {
        let flags = RunFlags::new("lesson.md");
        assert_eq!(flags.md, PathBuf::from("lesson.md"));
        assert!(!flags.with_tts);
        assert!(!flags.dry_run);
        assert!(flags.preset.is_none());
        assert!(flags.upload.is_none());
        assert!(flags.presign.is_none());
    }

    #[test]
    fn test_rerun_steps_default_selection() {
        let steps = RerunSteps::default();
        assert!(!steps.tts);
        assert!(steps.upload);
        assert!(steps.add_audio);
    }

    #[test]
    fn test_rerun_flags_new() {
        let flags = RerunFlags::new("lesson.md");
        assert_eq!(flags.md, PathBuf::from("lesson.md"));
        assert_eq!(flags.steps, RerunSteps::default());
        assert!(!flags.redo_tts);
    }
}
