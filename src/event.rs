//! Pipeline execution events.
//!
//! This module provides [`PipelineEvent`] for observing pipeline execution.
//! Events are broadcast through a channel that can be subscribed to for
//! monitoring, logging, or building UIs.

use crate::Stage;
use std::time::Duration;

/// An event emitted during pipeline execution.
///
/// Stage-level events carry the document path as a `String` to keep the
/// event type simple and easy to serialize for logging or transmission.
/// There is no per-stage failure event: a stage error aborts the whole
/// run and is reported as [`PipelineEvent::PipelineFailed`].
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum PipelineEvent {
    /// A stage has started executing.
    StageStarted {
        /// The source document path.
        doc: String,
        /// The stage.
        stage: Stage,
    },

    /// A stage completed successfully.
    StageCompleted {
        /// The source document path.
        doc: String,
        /// The stage.
        stage: Stage,
        /// How long the stage took.
        elapsed: Duration,
    },

    /// A stage was skipped.
    StageSkipped {
        /// The source document path.
        doc: String,
        /// The stage.
        stage: Stage,
        /// Human-readable reason for the skip.
        reason: String,
    },

    /// The whole pipeline completed for a document.
    PipelineCompleted {
        /// The source document path.
        doc: String,
        /// Total run duration.
        elapsed: Duration,
    },

    /// The pipeline aborted with an error.
    PipelineFailed {
        /// The source document path.
        doc: String,
        /// Total run duration up to the failure.
        elapsed: Duration,
        /// Error message describing the failure.
        error: String,
    },
}

impl PipelineEvent {
    /// Returns the document path for this event.
    pub fn doc(&self) -> &str {
        match self {
            Self::StageStarted { doc, .. }
            | Self::StageCompleted { doc, .. }
            | Self::StageSkipped { doc, .. }
            | Self::PipelineCompleted { doc, .. }
            | Self::PipelineFailed { doc, .. } => doc,
        }
    }

    /// Returns the stage for this event, if it is stage-scoped.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::StageStarted { stage, .. }
            | Self::StageCompleted { stage, .. }
            | Self::StageSkipped { stage, .. } => Some(*stage),
            Self::PipelineCompleted { .. } | Self::PipelineFailed { .. } => None,
        }
    }

    /// Returns true if this is a failure event.
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::PipelineFailed { .. })
    }

    /// Returns true if this is a skip event.
    pub fn is_skip(&self) -> bool {
        matches!(self, Self::StageSkipped { .. })
    }
}
