//! # Mimeo
//!
//! A staged pipeline orchestrator for producing ESL homework assignments:
//! validating an authored document, publishing it into a content-management
//! service, applying visual formatting, optionally synthesizing speech
//! audio, uploading that audio to object storage, and attaching it back to
//! the published page.
//!
//! Mimeo's core is the **stage sequencer**: runs execute
//! `validate → import → colorize → tts → upload → add-audio → manifest`
//! strictly in order, persist a per-document manifest at the end, and use
//! that manifest on later runs to decide which stages to skip or reuse.
//! Persistence and configuration sit behind swappable backends:
//!
//! - [`ManifestStore`]: local filesystem or object storage
//! - [`ConfigProvider`]: local filesystem or remote HTTP
//!
//! The services the pipeline drives (CMS, formatter, synthesizer, object
//! storage) stay outside the crate behind narrow async traits in
//! [`collaborators`], injected at construction.
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use mimeo::{Pipeline, RunFlags, UploadTarget};
//!
//! let pipeline = Pipeline::builder()
//!     .collaborators(collaborators)
//!     .config_provider(provider)
//!     .upload_bucket("homework-audio")
//!     .build()?;
//!
//! let mut flags = RunFlags::new("lessons/unit-3/lesson.md");
//! flags.preset = Some("rainbow".to_string());
//! flags.with_tts = true;
//! flags.upload = Some(UploadTarget::S3);
//!
//! let report = pipeline.new_assignment(&flags).await?;
//! assert!(report.steps.contains(&"manifest".to_string()));
//! ```
//!
//! ## Design Philosophy
//!
//! The name comes from the **mimeograph** — the hand-cranked duplicator
//! teachers once used to run off homework sheets. Feed in one master,
//! crank the drum, and copies come out; a master that hasn't changed
//! needs no fresh stencil. Mimeo works the same way: the manifest records
//! what the last crank produced, and unchanged work is reused instead of
//! redone.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![forbid(unsafe_code)]

pub mod collaborators;
pub mod config_provider;
pub mod error;
pub mod event;
pub mod flags;
pub mod manifest;
pub mod manifest_store;
pub mod observe;
pub mod pipeline;
pub mod stage;
pub mod status;

pub use collaborators::{
    AudioAttacher, Colorizer, ColorizeCounts, Importer, ObjectStorage, PageRef,
    SpeechSynthesizer, SynthesisOptions, SynthesisOutput, UploadRequest, Uploader,
};
pub use config_provider::{
    ConfigProvider, LocalConfigOptions, LocalConfigProvider, PresetDefinition,
    RemoteConfigProvider, StudentProfile,
};
pub use error::{MimeoError, Result};
pub use event::PipelineEvent;
pub use flags::{RerunFlags, RerunSteps, RunFlags, UploadTarget};
pub use manifest::{AssignmentManifest, AudioRecord, VoiceAssignment, CURRENT_SCHEMA_VERSION};
pub use manifest_store::{FsManifestStore, ManifestStore, ObjectManifestStore};
pub use observe::{LogLevel, MetricsSink, NoopLogger, NoopMetrics, PipelineLogger, TracingLogger};
pub use pipeline::{Collaborators, Pipeline, PipelineBuilder, RunReport};
pub use stage::Stage;
pub use status::AssignmentStatus;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
