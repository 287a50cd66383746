//! Stage identifiers for the assignment pipeline.
//!
//! This module defines the closed set of stages a document passes through.
//! The set is an enum rather than strings so stage handling is exhaustive
//! at compile time.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One named unit of pipeline work.
///
/// Stages execute strictly in the order they are declared here. The
/// `manifest` stage always runs last and always writes, regardless of
/// which earlier stages were skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    /// Structural validation of the authored document.
    Validate,

    /// Publishing the document into the content-management service.
    Import,

    /// Applying a visual formatting preset to the published page.
    Colorize,

    /// Synthesizing speech audio for the document.
    Tts,

    /// Uploading the synthesized audio to object storage.
    Upload,

    /// Attaching the uploaded audio back to the published page.
    AddAudio,

    /// Writing the per-document run manifest.
    Manifest,
}

impl Stage {
    /// All stages in execution order.
    pub const ALL: [Stage; 7] = [
        Stage::Validate,
        Stage::Import,
        Stage::Colorize,
        Stage::Tts,
        Stage::Upload,
        Stage::AddAudio,
        Stage::Manifest,
    ];

    /// Returns the stable string form used in step records and telemetry
    /// tags.
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Validate => "validate",
            Stage::Import => "import",
            Stage::Colorize => "colorize",
            Stage::Tts => "tts",
            Stage::Upload => "upload",
            Stage::AddAudio => "add-audio",
            Stage::Manifest => "manifest",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
