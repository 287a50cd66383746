//! Observability interfaces for the pipeline.
//!
//! Two narrow traits, a structured logger and a metrics sink, both with
//! no-op defaults so the engine runs without telemetry wired in. The
//! stage sequencer is the only component that computes durations and
//! decides what gets logged or metered; collaborators emit nothing
//! themselves.

use serde_json::Value as JsonValue;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::Stage;

/// Severity of a structured log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Diagnostic detail.
    Debug,
    /// Normal progress.
    Info,
    /// Recoverable oddity.
    Warn,
    /// Run-aborting failure.
    Error,
}

/// Structured log emission.
pub trait PipelineLogger: Send + Sync {
    /// Emits one structured record.
    ///
    /// `correlation_id` ties all records of a single pipeline invocation
    /// together; `stage` is present for stage-scoped records; `detail`
    /// carries an optional structured payload such as a skip reason or an
    /// elapsed duration.
    fn log(
        &self,
        level: LogLevel,
        message: &str,
        correlation_id: &str,
        stage: Option<Stage>,
        detail: Option<&JsonValue>,
    );
}

/// Metric emission.
pub trait MetricsSink: Send + Sync {
    /// Records a duration measurement.
    fn timing(&self, name: &str, duration: Duration, tags: &[(&str, &str)]);

    /// Increments a counter.
    fn increment(&self, name: &str, value: u64, tags: &[(&str, &str)]);
}

/// Logger that discards every record.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLogger;

impl PipelineLogger for NoopLogger {
    fn log(
        &self,
        _level: LogLevel,
        _message: &str,
        _correlation_id: &str,
        _stage: Option<Stage>,
        _detail: Option<&JsonValue>,
    ) {
    }
}

/// Metrics sink that discards every measurement.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMetrics;

impl MetricsSink for NoopMetrics {
    fn timing(&self, _name: &str, _duration: Duration, _tags: &[(&str, &str)]) {}

    fn increment(&self, _name: &str, _value: u64, _tags: &[(&str, &str)]) {}
}

/// Logger that forwards records to the `tracing` subscriber.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl PipelineLogger for TracingLogger {
    fn log(
        &self,
        level: LogLevel,
        message: &str,
        correlation_id: &str,
        stage: Option<Stage>,
        detail: Option<&JsonValue>,
    ) {
        let stage = stage.map(|s| s.as_str()).unwrap_or("-");
        match level {
            LogLevel::Debug => {
                debug!(correlation = correlation_id, stage, detail = ?detail, "{}", message)
            }
            LogLevel::Info => {
                info!(correlation = correlation_id, stage, detail = ?detail, "{}", message)
            }
            LogLevel::Warn => {
                warn!(correlation = correlation_id, stage, detail = ?detail, "{}", message)
            }
            LogLevel::Error => {
                error!(correlation = correlation_id, stage, detail = ?detail, "{}", message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Default, Clone)]
    struct RecordingLogger {
        records: Arc<Mutex<Vec<(LogLevel, String, Option<Stage>)>>>,
    }

    impl PipelineLogger for RecordingLogger {
        fn log(
            &self,
            level: LogLevel,
            message: &str,
            _correlation_id: &str,
            stage: Option<Stage>,
            _detail: Option<&JsonValue>,
        ) {
            self.records
                .lock()
                .unwrap()
                .push((level, message.to_string(), stage));
        }
    }

    #[test]
    fn test_noop_logger_accepts_records() {
        let logger = NoopLogger;
        logger.log(LogLevel::Info, "hello", "run-1", Some(Stage::Validate), None);
    }

    #[test]
    fn test_noop_metrics_accepts_measurements() {
        let metrics = NoopMetrics;
        metrics.timing("stage.duration", Duration::from_millis(3), &[]);
        metrics.increment("stage.skipped", 1, &[("stage", "tts")]);
    }

    #[test]
    fn test_custom_logger_receives_records() {
        let logger = RecordingLogger::default();
        logger.log(
            LogLevel::Warn,
            "stage skipped",
            "run-1",
            Some(Stage::Upload),
            None,
        );

        let records = logger.records.lock().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].0, LogLevel::Warn);
        assert_eq!(records[0].1, "stage skipped");
        assert_eq!(records[0].2, Some(Stage::Upload));
    }

    #[test]
    fn test_logger_trait_object() {
        let logger: Arc<dyn PipelineLogger> = Arc::new(TracingLogger);
        logger.log(LogLevel::Debug, "trace me", "run-2", None, None);
    }
}
