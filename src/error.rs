//! Error types for the mimeo assignment pipeline.
//!
//! This module defines the error types used throughout the mimeo crate,
//! following the non-exhaustive enum pattern to allow future error variants
//! without breaking compatibility.

use thiserror::Error;

/// The main error type for mimeo operations.
///
/// This enum uses `#[non_exhaustive]` to allow adding new error variants
/// in the future without breaking backward compatibility.
///
/// Errors fall into four families:
///
/// - **Configuration**: a required resource or variable cannot be located.
///   Always fatal, always names every path or variable that was checked.
/// - **Precondition**: a skip flag or rerun was used without the
///   prerequisite manifest data. Names the missing prerequisite.
/// - **Collaborator failures**: errors surfaced by the importer,
///   colorizer, synthesizer, uploader, or attacher. Propagated unchanged,
///   except [`MimeoError::MissingSynthesisBinary`], which the sequencer
///   re-wraps as [`MimeoError::SynthesisDependency`] with remediation
///   guidance while preserving the original as the source.
/// - **Infrastructure**: serialization, I/O, and HTTP errors converted
///   via `#[from]`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum MimeoError {
    /// A required resource (presets, voices, students, bucket) or
    /// environment variable could not be located.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A skip flag or rerun was used without the prerequisite state.
    #[error("Precondition not met: {0}")]
    Precondition(String),

    /// Generic failure reported by an external collaborator.
    ///
    /// Collaborator implementations may also return any other variant;
    /// this one exists for failures with no more specific shape.
    #[error("Collaborator error: {0}")]
    Collaborator(String),

    /// The speech synthesizer could not find an external binary it needs.
    ///
    /// Synthesizer implementations return this variant so the sequencer
    /// can re-wrap it with actionable guidance.
    #[error("Missing synthesis binary: {binary}")]
    MissingSynthesisBinary {
        /// Name of the executable that was not found.
        binary: String,
    },

    /// A missing-binary synthesis error re-wrapped with remediation
    /// guidance. The original error is preserved as the source.
    #[error("{hint}")]
    SynthesisDependency {
        /// Actionable message telling the operator how to fix the setup.
        hint: String,
        /// The original synthesizer error.
        #[source]
        source: Box<MimeoError>,
    },

    /// Serialization or deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error from file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error from the remote config provider.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// A specialized `Result` type for mimeo operations.
///
/// This is a type alias for `std::result::Result<T, MimeoError>` to reduce
/// boilerplate in function signatures throughout the crate.
pub type Result<T> = std::result::Result<T, MimeoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_config() {
        let error = MimeoError::Config("presets not found".to_string());
        assert_eq!(error.to_string(), "Configuration error: presets not found");
    }

    #[test]
    fn test_error_display_precondition() {
        let error = MimeoError::Precondition("no cached page id".to_string());
        assert_eq!(error.to_string(), "Precondition not met: no cached page id");
    }

    #[test]
    fn test_error_display_collaborator() {
        let error = MimeoError::Collaborator("upload timed out".to_string());
        assert_eq!(error.to_string(), "Collaborator error: upload timed out");
    }

    #[test]
    fn test_error_display_missing_binary() {
        let error = MimeoError::MissingSynthesisBinary {
            binary: "ffmpeg".to_string(),
        };
        assert_eq!(error.to_string(), "Missing synthesis binary: ffmpeg");
    }

    #[test]
    fn test_synthesis_dependency_preserves_source() {
        use std::error::Error as _;

        let original = MimeoError::MissingSynthesisBinary {
            binary: "ffmpeg".to_string(),
        };
        let wrapped = MimeoError::SynthesisDependency {
            hint: "install ffmpeg and re-run".to_string(),
            source: Box::new(original),
        };

        assert_eq!(wrapped.to_string(), "install ffmpeg and re-run");
        let source = wrapped.source().expect("source should be preserved");
        assert_eq!(source.to_string(), "Missing synthesis binary: ffmpeg");
    }

    #[test]
    fn test_error_from_serde_json() {
        let json_error = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let mimeo_error: MimeoError = json_error.into();
        assert!(mimeo_error.to_string().contains("Serialization error"));
    }

    #[test]
    fn test_error_from_io() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let mimeo_error: MimeoError = io_error.into();
        assert!(mimeo_error.to_string().contains("I/O error"));
    }

    #[test]
    fn test_result_ok() {
        let result: Result<i32> = Ok(42);
        assert!(result.is_ok());
        assert_eq!(result.ok(), Some(42));
    }

    #[test]
    fn test_result_err() {
        let result: Result<i32> = Err(MimeoError::Config("test".to_string()));
        assert!(result.is_err());
    }

    #[test]
    fn test_error_debug_format() {
        let error = MimeoError::Precondition("debug test".to_string());
        let debug_output = format!("{:?}", error);
        assert!(debug_output.contains("Precondition"));
        assert!(debug_output.contains("debug test"));
    }
}
