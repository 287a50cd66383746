//! The assignment pipeline: facade and stage sequencer.
//!
//! This module provides [`Pipeline`] and [`PipelineBuilder`]. The builder
//! resolves backends once, from explicit options, then environment
//! variables, then filesystem defaults; the built pipeline exposes
//! [`new_assignment`](Pipeline::new_assignment),
//! [`rerun_assignment`](Pipeline::rerun_assignment), and
//! [`assignment_status`](Pipeline::assignment_status) with those
//! dependencies injected.
//!
//! Stages run strictly in order, each awaited before the next, because
//! later stages consume earlier outputs (page id, audio path, audio url).
//! The sequencer never retries; on any stage error it emits a
//! pipeline-level failure event with the total duration and rethrows the
//! error unchanged.

use chrono::Utc;
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::broadcast;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::collaborators::{
    AudioAttacher, Colorizer, ColorizeCounts, Importer, ObjectStorage, PageRef,
    SpeechSynthesizer, SynthesisOptions, UploadRequest, Uploader,
};
use crate::config_provider::{
    ConfigProvider, LocalConfigOptions, LocalConfigProvider, RemoteConfigProvider,
};
use crate::manifest::{self, AssignmentManifest, AudioRecord, CURRENT_SCHEMA_VERSION};
use crate::manifest_store::{FsManifestStore, ManifestStore, ObjectManifestStore};
use crate::observe::{LogLevel, MetricsSink, NoopLogger, NoopMetrics, PipelineLogger};
use crate::status::AssignmentStatus;
use crate::{MimeoError, PipelineEvent, RerunFlags, Result, RunFlags, Stage, UploadTarget};

/// Default channel capacity for pipeline events.
const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 256;

/// Selects the manifest store backend: `fs` (default) or `s3`.
pub const MANIFEST_STORE_ENV: &str = "MIMEO_MANIFEST_STORE";
/// Bucket for the object-backed manifest store.
pub const MANIFEST_BUCKET_ENV: &str = "MIMEO_MANIFEST_BUCKET";
/// Key prefix for the object-backed manifest store.
pub const MANIFEST_PREFIX_ENV: &str = "MIMEO_MANIFEST_PREFIX";
/// Region for the object-backed manifest store. Consumed by the injected
/// [`ObjectStorage`] client, not by the store itself.
pub const MANIFEST_REGION_ENV: &str = "MIMEO_MANIFEST_REGION";
/// Selects the config provider backend: `local` (default) or `remote`.
pub const CONFIG_PROVIDER_ENV: &str = "MIMEO_CONFIG_PROVIDER";
/// Base URL for the remote config provider.
pub const CONFIG_BASE_URL_ENV: &str = "MIMEO_CONFIG_BASE_URL";
/// Bearer token for the remote config provider.
pub const CONFIG_TOKEN_ENV: &str = "MIMEO_CONFIG_TOKEN";
/// Default upload bucket, used when flags omit one.
pub const UPLOAD_BUCKET_ENV: &str = "MIMEO_UPLOAD_BUCKET";
/// Default upload key prefix, used when flags omit one.
pub const UPLOAD_PREFIX_ENV: &str = "MIMEO_UPLOAD_PREFIX";
/// Default upload region, used when flags omit one.
pub const UPLOAD_REGION_ENV: &str = "MIMEO_UPLOAD_REGION";

/// The external collaborators a pipeline drives.
#[derive(Debug, Clone)]
pub struct Collaborators {
    /// Validates and publishes documents.
    pub importer: Arc<dyn Importer>,
    /// Applies formatting presets.
    pub colorizer: Arc<dyn Colorizer>,
    /// Synthesizes speech audio.
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
    /// Uploads audio to object storage.
    pub uploader: Arc<dyn Uploader>,
    /// Attaches audio to published pages.
    pub attacher: Arc<dyn AudioAttacher>,
}

/// Upload defaults resolved at pipeline construction.
#[derive(Debug, Clone, Default)]
struct UploadSettings {
    bucket: Option<String>,
    prefix: String,
    region: Option<String>,
}

/// Outcome of a pipeline run.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Step records in execution order, e.g. `["validate", "skip:import",
    /// "colorize:rainbow:3/1/0", "tts", "upload", "manifest"]`.
    pub steps: Vec<String>,

    /// Storage key the manifest was written to.
    pub manifest_path: String,

    /// The manifest as written.
    pub manifest: AssignmentManifest,
}

/// The assignment pipeline orchestrator.
///
/// Construct one per process or configuration with
/// [`Pipeline::builder()`], then invoke it once per document. Invocations
/// for different documents may run concurrently; two invocations against
/// the same document are not coordinated and race on the final manifest
/// write.
///
/// # Example
///
/// ```rust,ignore
/// let pipeline = Pipeline::builder()
///     .collaborators(collaborators)
///     .manifest_store(Arc::new(FsManifestStore::new()))
///     .config_provider(Arc::new(provider))
///     .upload_bucket("homework-audio")
///     .build()?;
///
/// let mut flags = RunFlags::new("lessons/unit-3/lesson.md");
/// flags.preset = Some("rainbow".to_string());
/// flags.with_tts = true;
/// flags.upload = Some(UploadTarget::S3);
///
/// let report = pipeline.new_assignment(&flags).await?;
/// println!("wrote {}", report.manifest_path);
/// ```
pub struct Pipeline {
    manifest_store: Arc<dyn ManifestStore>,
    config: Arc<dyn ConfigProvider>,
    collaborators: Collaborators,
    logger: Arc<dyn PipelineLogger>,
    metrics: Arc<dyn MetricsSink>,
    upload: UploadSettings,
    event_tx: broadcast::Sender<PipelineEvent>,
}

impl Pipeline {
    /// Creates a new pipeline builder.
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// Subscribes to pipeline execution events.
    ///
    /// Returns a receiver that will receive all events broadcast by this
    /// pipeline. Events are not persisted; if the receiver is too slow,
    /// events may be dropped.
    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.event_tx.subscribe()
    }

    /// Emits an event to all subscribers.
    ///
    /// Ignores send errors (no subscribers or channel full).
    fn emit(&self, event: PipelineEvent) {
        let _ = self.event_tx.send(event);
    }

    /// Runs the full pipeline for one document.
    ///
    /// Stages execute in order: validate, import, colorize, tts, upload,
    /// add-audio, manifest. Skip flags reuse state from the document's
    /// previous manifest; the manifest stage always runs last and always
    /// writes.
    ///
    /// # Errors
    ///
    /// Configuration and precondition errors, plus any collaborator
    /// failure, abort the run. The error is reported through a
    /// [`PipelineEvent::PipelineFailed`] event and then returned
    /// unchanged. No manifest is written on failure.
    pub async fn new_assignment(&self, flags: &RunFlags) -> Result<RunReport> {
        let correlation = Uuid::new_v4().to_string();
        let doc_display = flags.md.display().to_string();
        let started = Instant::now();

        let span = info_span!("assignment", doc = %doc_display);
        let result = self.run_new(flags, &correlation).instrument(span).await;
        self.finish_run(&doc_display, &correlation, started, result)
    }

    /// Re-executes a subset of the audio steps against an existing
    /// manifest.
    ///
    /// The manifest must already exist; rerunning a document that never
    /// completed a full pipeline is a precondition error and performs no
    /// collaborator calls. The merged manifest is written unconditionally
    /// at the end with `md_hash` refreshed against the current document
    /// content.
    pub async fn rerun_assignment(&self, flags: &RerunFlags) -> Result<RunReport> {
        let correlation = Uuid::new_v4().to_string();
        let doc_display = flags.md.display().to_string();
        let started = Instant::now();

        let span = info_span!("rerun", doc = %doc_display);
        let result = self.run_rerun(flags, &correlation).instrument(span).await;
        self.finish_run(&doc_display, &correlation, started, result)
    }

    /// Reports the recorded state of a document without running anything.
    ///
    /// # Errors
    ///
    /// Returns an error only for backend failures; a missing manifest,
    /// unreadable document, or missing audio file is reported in the
    /// status itself.
    pub async fn assignment_status(&self, document: &Path) -> Result<AssignmentStatus> {
        let manifest_path = self.manifest_store.manifest_path_for(document);
        let manifest = self.manifest_store.read_manifest(document).await?;

        let md_hash_matches = match &manifest {
            Some(m) => match tokio::fs::read(document).await {
                Ok(bytes) => manifest::hash_bytes(&bytes) == m.md_hash,
                Err(_) => false,
            },
            None => false,
        };

        let audio_file_exists = match manifest.as_ref().and_then(|m| m.audio.as_ref()) {
            Some(audio) => tokio::fs::metadata(&audio.path).await.is_ok(),
            None => false,
        };

        Ok(AssignmentStatus {
            manifest_path,
            manifest,
            md_hash_matches,
            audio_file_exists,
        })
    }

    /// Wraps a run result with pipeline-level telemetry, then passes the
    /// result through unchanged.
    fn finish_run(
        &self,
        doc: &str,
        correlation: &str,
        started: Instant,
        result: Result<RunReport>,
    ) -> Result<RunReport> {
        let elapsed = started.elapsed();
        match result {
            Ok(report) => {
                info!(elapsed_ms = elapsed.as_millis() as u64, "pipeline completed");
                self.logger.log(
                    LogLevel::Info,
                    "pipeline completed",
                    correlation,
                    None,
                    Some(&json!({
                        "elapsedMs": elapsed.as_millis() as u64,
                        "steps": &report.steps,
                    })),
                );
                self.metrics
                    .timing("pipeline.duration", elapsed, &[("outcome", "success")]);
                self.metrics.increment("pipeline.success", 1, &[]);
                self.emit(PipelineEvent::PipelineCompleted {
                    doc: doc.to_string(),
                    elapsed,
                });
                Ok(report)
            }
            Err(error) => {
                let message = error.to_string();
                warn!(
                    error = %message,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "pipeline failed"
                );
                self.logger.log(
                    LogLevel::Error,
                    "pipeline failed",
                    correlation,
                    None,
                    Some(&json!({
                        "elapsedMs": elapsed.as_millis() as u64,
                        "error": &message,
                    })),
                );
                self.metrics
                    .timing("pipeline.duration", elapsed, &[("outcome", "failure")]);
                self.metrics.increment("pipeline.failure", 1, &[]);
                self.emit(PipelineEvent::PipelineFailed {
                    doc: doc.to_string(),
                    elapsed,
                    error: message,
                });
                Err(error)
            }
        }
    }

    async fn run_new(&self, flags: &RunFlags, correlation: &str) -> Result<RunReport> {
        let doc = flags.md.as_path();
        let doc_display = flags.md.display().to_string();
        let mut steps: Vec<String> = Vec::new();

        let prior = self.manifest_store.read_manifest(doc).await?;
        let md_hash = manifest::content_hash(doc).await?;

        let prior_page = prior.as_ref().and_then(|m| {
            m.page_id.clone().map(|page_id| PageRef {
                page_id,
                page_url: m.page_url.clone(),
            })
        });

        // Skip preconditions are checked before any collaborator call so a
        // misconfigured skip fails without touching the importer.
        if flags.skip_import && !flags.dry_run && prior_page.is_none() {
            return Err(MimeoError::Precondition(
                "cannot skip import - run a full pipeline first".to_string(),
            ));
        }

        // validate: always runs; the check is local and read-only.
        let timer = self.stage_start(Stage::Validate, &doc_display, correlation);
        self.collaborators.importer.validate(doc).await?;
        self.stage_done(Stage::Validate, &doc_display, correlation, timer);
        steps.push("validate".to_string());

        // import
        let page = if flags.skip_import {
            self.stage_skip(
                Stage::Import,
                &doc_display,
                correlation,
                "skip-import flag set; reusing published page",
            );
            steps.push("skip:import".to_string());
            prior_page
        } else {
            let timer = self.stage_start(Stage::Import, &doc_display, correlation);
            let page = self
                .collaborators
                .importer
                .import(doc, prior_page.as_ref(), flags.force)
                .await?;
            self.stage_done(Stage::Import, &doc_display, correlation, timer);
            steps.push("import".to_string());
            Some(page)
        };

        // colorize
        match &flags.preset {
            None => {
                self.stage_skip(
                    Stage::Colorize,
                    &doc_display,
                    correlation,
                    "no preset requested",
                );
            }
            Some(preset) => {
                let timer = self.stage_start(Stage::Colorize, &doc_display, correlation);
                let counts = if flags.dry_run {
                    ColorizeCounts::default()
                } else {
                    let page_id = page.as_ref().map(|p| p.page_id.as_str()).ok_or_else(|| {
                        MimeoError::Precondition(
                            "colorize requires a published page id".to_string(),
                        )
                    })?;
                    let presets = self.config.load_presets().await?;
                    let definition = presets.get(preset).ok_or_else(|| {
                        let mut known: Vec<&str> = presets.keys().map(String::as_str).collect();
                        known.sort_unstable();
                        MimeoError::Config(format!(
                            "preset '{preset}' not found; known presets: {}",
                            known.join(", ")
                        ))
                    })?;
                    self.collaborators
                        .colorizer
                        .colorize(page_id, preset, definition)
                        .await?
                };
                self.stage_done(Stage::Colorize, &doc_display, correlation, timer);
                steps.push(format!(
                    "colorize:{preset}:{}/{}/{}",
                    counts.updated, counts.skipped, counts.failed
                ));
            }
        }

        // tts
        let mut audio: Option<AudioRecord> = None;
        if flags.with_tts {
            if flags.skip_tts {
                let cached = prior.as_ref().and_then(|m| m.audio.clone());
                if cached.is_none() && !flags.dry_run {
                    return Err(MimeoError::Precondition(
                        "cannot skip tts - no cached audio path in the manifest".to_string(),
                    ));
                }
                self.stage_skip(
                    Stage::Tts,
                    &doc_display,
                    correlation,
                    "skip-tts flag set; reusing cached audio",
                );
                steps.push("skip:tts".to_string());
                audio = cached;
            } else {
                let timer = self.stage_start(Stage::Tts, &doc_display, correlation);
                let voices = self.config.resolve_voices_path().await?;
                let options = SynthesisOptions {
                    mode: flags.tts_mode.clone(),
                    language: flags.dialogue_language.clone(),
                    stability: flags.dialogue_stability,
                    seed: flags.dialogue_seed,
                    redo: flags.redo_tts,
                };
                let output = self
                    .collaborators
                    .synthesizer
                    .synthesize(doc, voices.as_deref(), &options)
                    .await
                    .map_err(rewrap_missing_binary)?;

                if !flags.dry_run && tokio::fs::metadata(&output.audio_path).await.is_err() {
                    return Err(MimeoError::Config(format!(
                        "synthesis reported {} but no file exists there - check the \
                         synthesizer output location",
                        output.audio_path.display()
                    )));
                }

                self.stage_done(Stage::Tts, &doc_display, correlation, timer);
                steps.push("tts".to_string());
                audio = Some(AudioRecord {
                    path: output.audio_path,
                    url: None,
                    hash: output.audio_hash,
                    voices: output.voices,
                });
            }
        } else {
            self.stage_skip(Stage::Tts, &doc_display, correlation, "audio not requested");
        }

        // upload
        match flags.upload {
            Some(UploadTarget::S3) => {
                if flags.skip_upload {
                    let cached_url = prior
                        .as_ref()
                        .and_then(|m| m.audio.as_ref())
                        .and_then(|a| a.url.clone());
                    if cached_url.is_none() && !flags.dry_run {
                        return Err(MimeoError::Precondition(
                            "cannot skip upload - no cached audio url in the manifest"
                                .to_string(),
                        ));
                    }
                    self.stage_skip(
                        Stage::Upload,
                        &doc_display,
                        correlation,
                        "skip-upload flag set; reusing cached audio url",
                    );
                    steps.push("skip:upload".to_string());
                    if audio.is_none() {
                        audio = prior.as_ref().and_then(|m| m.audio.clone());
                    }
                    if let (Some(record), Some(url)) = (audio.as_mut(), cached_url) {
                        record.url = Some(url);
                    }
                } else {
                    match audio.as_mut() {
                        None if flags.dry_run => {
                            self.stage_skip(
                                Stage::Upload,
                                &doc_display,
                                correlation,
                                "no synthesized audio to upload",
                            );
                        }
                        None => {
                            return Err(MimeoError::Precondition(
                                "upload requires a synthesized audio path - run tts or \
                                 pass skip-tts with cached audio"
                                    .to_string(),
                            ));
                        }
                        Some(record) => {
                            if record.path.as_os_str().is_empty() {
                                return Err(MimeoError::Precondition(
                                    "upload requires a non-empty audio path".to_string(),
                                ));
                            }
                            let timer =
                                self.stage_start(Stage::Upload, &doc_display, correlation);
                            let bucket = self.upload.bucket.clone().ok_or_else(|| {
                                MimeoError::Config(format!(
                                    "upload bucket not configured - set {UPLOAD_BUCKET_ENV} \
                                     or PipelineBuilder::upload_bucket"
                                ))
                            })?;
                            let prefix = flags
                                .prefix
                                .clone()
                                .unwrap_or_else(|| self.upload.prefix.clone());
                            let key = object_key(&prefix, &record.path)?;

                            let url = if flags.dry_run {
                                preview_url(&bucket, &key)
                            } else {
                                let request = UploadRequest {
                                    bucket,
                                    key,
                                    region: self.upload.region.clone(),
                                    public_read: flags.public_read,
                                    presign_seconds: flags.presign,
                                };
                                self.collaborators
                                    .uploader
                                    .upload(&record.path, &request)
                                    .await?
                            };
                            record.url = Some(url);
                            self.stage_done(Stage::Upload, &doc_display, correlation, timer);
                            steps.push("upload".to_string());
                        }
                    }
                }
            }
            None => {
                if flags.with_tts {
                    self.stage_skip(
                        Stage::Upload,
                        &doc_display,
                        correlation,
                        "no upload target requested",
                    );
                }
            }
        }

        // add-audio
        if flags.upload.is_some() {
            if flags.dry_run {
                // Marked successful without calling the attacher; the step
                // list records only real attaches.
                let timer = self.stage_start(Stage::AddAudio, &doc_display, correlation);
                self.stage_done(Stage::AddAudio, &doc_display, correlation, timer);
            } else {
                let audio_url = audio.as_ref().and_then(|a| a.url.clone());
                let page_id = page.as_ref().map(|p| p.page_id.clone());
                match (audio_url, page_id) {
                    (Some(url), Some(page_id)) => {
                        let timer =
                            self.stage_start(Stage::AddAudio, &doc_display, correlation);
                        self.collaborators.attacher.attach(&page_id, &url).await?;
                        self.stage_done(Stage::AddAudio, &doc_display, correlation, timer);
                        steps.push("add-audio".to_string());
                    }
                    (None, _) => {
                        return Err(MimeoError::Precondition(
                            "add-audio requires an uploaded audio url".to_string(),
                        ));
                    }
                    (_, None) => {
                        return Err(MimeoError::Precondition(
                            "add-audio requires a published page id".to_string(),
                        ));
                    }
                }
            }
        } else if flags.with_tts {
            self.stage_skip(
                Stage::AddAudio,
                &doc_display,
                correlation,
                "no upload target requested",
            );
        }

        // manifest: always runs last, always writes.
        let timer = self.stage_start(Stage::Manifest, &doc_display, correlation);
        let mut record = AssignmentManifest::new(md_hash);
        record.page_id = page.as_ref().map(|p| p.page_id.clone());
        record.page_url = page.as_ref().and_then(|p| p.page_url.clone());
        record.audio = audio.or_else(|| prior.as_ref().and_then(|m| m.audio.clone()));
        record.preset = flags
            .preset
            .clone()
            .or_else(|| prior.as_ref().and_then(|m| m.preset.clone()));
        record.tts_mode = flags
            .tts_mode
            .clone()
            .or_else(|| prior.as_ref().and_then(|m| m.tts_mode.clone()));
        record.dialogue_language = flags
            .dialogue_language
            .clone()
            .or_else(|| prior.as_ref().and_then(|m| m.dialogue_language.clone()));
        record.dialogue_stability = flags
            .dialogue_stability
            .or_else(|| prior.as_ref().and_then(|m| m.dialogue_stability));
        record.dialogue_seed = flags
            .dialogue_seed
            .or_else(|| prior.as_ref().and_then(|m| m.dialogue_seed));

        let manifest_path = self.manifest_store.write_manifest(doc, &record).await?;
        self.stage_done(Stage::Manifest, &doc_display, correlation, timer);
        steps.push("manifest".to_string());

        Ok(RunReport {
            steps,
            manifest_path,
            manifest: record,
        })
    }

    async fn run_rerun(&self, flags: &RerunFlags, correlation: &str) -> Result<RunReport> {
        let doc = flags.md.as_path();
        let doc_display = flags.md.display().to_string();
        let mut steps: Vec<String> = Vec::new();

        let prior = self
            .manifest_store
            .read_manifest(doc)
            .await?
            .ok_or_else(|| {
                MimeoError::Precondition(format!(
                    "no manifest for {} - run the full pipeline first",
                    doc.display()
                ))
            })?;

        let mut audio = prior.audio.clone();

        if flags.steps.tts {
            let timer = self.stage_start(Stage::Tts, &doc_display, correlation);
            let voices = self.config.resolve_voices_path().await?;
            // Reproducibility settings come from the manifest so a rerun
            // matches the recorded synthesis.
            let options = SynthesisOptions {
                mode: prior.tts_mode.clone(),
                language: prior.dialogue_language.clone(),
                stability: prior.dialogue_stability,
                seed: prior.dialogue_seed,
                redo: flags.redo_tts,
            };
            let output = self
                .collaborators
                .synthesizer
                .synthesize(doc, voices.as_deref(), &options)
                .await
                .map_err(rewrap_missing_binary)?;

            if tokio::fs::metadata(&output.audio_path).await.is_err() {
                return Err(MimeoError::Config(format!(
                    "synthesis reported {} but no file exists there - check the \
                     synthesizer output location",
                    output.audio_path.display()
                )));
            }

            self.stage_done(Stage::Tts, &doc_display, correlation, timer);
            steps.push("tts".to_string());
            let prior_url = audio.as_ref().and_then(|a| a.url.clone());
            audio = Some(AudioRecord {
                path: output.audio_path,
                url: prior_url,
                hash: output.audio_hash,
                voices: output.voices,
            });
        }

        if flags.steps.upload {
            let record = audio.as_mut().ok_or_else(|| {
                MimeoError::Precondition(
                    "upload requires an audio path - rerun tts or run the full pipeline first"
                        .to_string(),
                )
            })?;
            let bucket = self.upload.bucket.clone().ok_or_else(|| {
                MimeoError::Config(format!(
                    "upload bucket not configured - set {UPLOAD_BUCKET_ENV} or \
                     PipelineBuilder::upload_bucket"
                ))
            })?;
            let prefix = flags
                .prefix
                .clone()
                .unwrap_or_else(|| self.upload.prefix.clone());
            let key = object_key(&prefix, &record.path)?;
            let request = UploadRequest {
                bucket,
                key,
                region: self.upload.region.clone(),
                public_read: flags.public_read,
                presign_seconds: flags.presign,
            };

            let timer = self.stage_start(Stage::Upload, &doc_display, correlation);
            let url = self
                .collaborators
                .uploader
                .upload(&record.path, &request)
                .await?;
            record.url = Some(url);
            self.stage_done(Stage::Upload, &doc_display, correlation, timer);
            steps.push("upload".to_string());
        }

        if flags.steps.add_audio {
            let url = audio
                .as_ref()
                .and_then(|a| a.url.clone())
                .ok_or_else(|| {
                    MimeoError::Precondition(
                        "add-audio requires an uploaded audio url".to_string(),
                    )
                })?;
            let page_id = prior.page_id.clone().ok_or_else(|| {
                MimeoError::Precondition(
                    "add-audio requires a published page id - run the full pipeline first"
                        .to_string(),
                )
            })?;

            let timer = self.stage_start(Stage::AddAudio, &doc_display, correlation);
            self.collaborators.attacher.attach(&page_id, &url).await?;
            self.stage_done(Stage::AddAudio, &doc_display, correlation, timer);
            steps.push("add-audio".to_string());
        }

        // The merged manifest is written unconditionally, with the hash
        // refreshed so drift detection reflects the current source.
        let timer = self.stage_start(Stage::Manifest, &doc_display, correlation);
        let md_hash = manifest::content_hash(doc).await?;
        let mut merged = prior;
        merged.schema_version = CURRENT_SCHEMA_VERSION;
        merged.md_hash = md_hash;
        merged.audio = audio;
        merged.timestamp = Utc::now();

        let manifest_path = self.manifest_store.write_manifest(doc, &merged).await?;
        self.stage_done(Stage::Manifest, &doc_display, correlation, timer);
        steps.push("manifest".to_string());

        Ok(RunReport {
            steps,
            manifest_path,
            manifest: merged,
        })
    }

    fn stage_start(&self, stage: Stage, doc: &str, correlation: &str) -> Instant {
        debug!(stage = stage.as_str(), "stage started");
        self.logger
            .log(LogLevel::Info, "stage started", correlation, Some(stage), None);
        self.emit(PipelineEvent::StageStarted {
            doc: doc.to_string(),
            stage,
        });
        Instant::now()
    }

    fn stage_done(&self, stage: Stage, doc: &str, correlation: &str, started: Instant) {
        let elapsed = started.elapsed();
        debug!(
            stage = stage.as_str(),
            elapsed_ms = elapsed.as_millis() as u64,
            "stage completed"
        );
        self.logger.log(
            LogLevel::Info,
            "stage completed",
            correlation,
            Some(stage),
            Some(&json!({ "elapsedMs": elapsed.as_millis() as u64 })),
        );
        self.metrics
            .timing("stage.duration", elapsed, &[("stage", stage.as_str())]);
        self.emit(PipelineEvent::StageCompleted {
            doc: doc.to_string(),
            stage,
            elapsed,
        });
    }

    fn stage_skip(&self, stage: Stage, doc: &str, correlation: &str, reason: &str) {
        debug!(stage = stage.as_str(), reason, "stage skipped");
        self.logger.log(
            LogLevel::Info,
            "stage skipped",
            correlation,
            Some(stage),
            Some(&json!({ "reason": reason })),
        );
        self.metrics
            .increment("stage.skipped", 1, &[("stage", stage.as_str())]);
        self.emit(PipelineEvent::StageSkipped {
            doc: doc.to_string(),
            stage,
            reason: reason.to_string(),
        });
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("upload", &self.upload)
            .finish_non_exhaustive()
    }
}

/// Re-wraps a missing-binary synthesis error with remediation guidance,
/// preserving the original as the source. Every other error passes
/// through unchanged.
fn rewrap_missing_binary(error: MimeoError) -> MimeoError {
    match error {
        MimeoError::MissingSynthesisBinary { binary } => {
            let hint = format!(
                "speech synthesis requires the '{}' executable on PATH; \
                 install it and re-run",
                binary
            );
            MimeoError::SynthesisDependency {
                hint,
                source: Box::new(MimeoError::MissingSynthesisBinary { binary }),
            }
        }
        other => other,
    }
}

/// Joins the upload prefix with the audio file's base name, stripping any
/// trailing slash from the prefix.
fn object_key(prefix: &str, file: &Path) -> Result<String> {
    let name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| {
            MimeoError::Precondition(format!(
                "audio path {} has no file name",
                file.display()
            ))
        })?;

    let prefix = prefix.strip_suffix('/').unwrap_or(prefix);
    if prefix.is_empty() {
        Ok(name)
    } else {
        Ok(format!("{prefix}/{name}"))
    }
}

/// Deterministic preview URL for dry-run uploads.
fn preview_url(bucket: &str, key: &str) -> String {
    format!("https://{bucket}.s3.amazonaws.com/{key}")
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}

/// Builder for [`Pipeline`] instances.
///
/// Backends resolve in a fixed order: explicit builder options, then
/// environment variables, then filesystem defaults. Resolution happens
/// exactly once, in [`build`](Self::build); the constructed pipeline
/// never re-resolves a backend per call.
pub struct PipelineBuilder {
    collaborators: Option<Collaborators>,
    object_storage: Option<Arc<dyn ObjectStorage>>,
    manifest_store: Option<Arc<dyn ManifestStore>>,
    config_provider: Option<Arc<dyn ConfigProvider>>,
    logger: Option<Arc<dyn PipelineLogger>>,
    metrics: Option<Arc<dyn MetricsSink>>,
    local_config: LocalConfigOptions,
    upload_bucket: Option<String>,
    upload_prefix: Option<String>,
    upload_region: Option<String>,
}

impl PipelineBuilder {
    fn new() -> Self {
        Self {
            collaborators: None,
            object_storage: None,
            manifest_store: None,
            config_provider: None,
            logger: None,
            metrics: None,
            local_config: LocalConfigOptions::default(),
            upload_bucket: None,
            upload_prefix: None,
            upload_region: None,
        }
    }

    /// Sets the external collaborators. Required.
    pub fn collaborators(mut self, collaborators: Collaborators) -> Self {
        self.collaborators = Some(collaborators);
        self
    }

    /// Injects the object-storage client used when the manifest store is
    /// backed by object storage.
    pub fn object_storage(mut self, storage: Arc<dyn ObjectStorage>) -> Self {
        self.object_storage = Some(storage);
        self
    }

    /// Uses an explicit manifest store, bypassing environment selection.
    pub fn manifest_store(mut self, store: Arc<dyn ManifestStore>) -> Self {
        self.manifest_store = Some(store);
        self
    }

    /// Uses an explicit config provider, bypassing environment selection.
    pub fn config_provider(mut self, provider: Arc<dyn ConfigProvider>) -> Self {
        self.config_provider = Some(provider);
        self
    }

    /// Path overrides for the default local config provider.
    pub fn local_config(mut self, options: LocalConfigOptions) -> Self {
        self.local_config = options;
        self
    }

    /// Sets the structured logger. Defaults to a no-op.
    pub fn logger(mut self, logger: Arc<dyn PipelineLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Sets the metrics sink. Defaults to a no-op.
    pub fn metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Default bucket for audio uploads.
    pub fn upload_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.upload_bucket = Some(bucket.into());
        self
    }

    /// Default key prefix for audio uploads.
    pub fn upload_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.upload_prefix = Some(prefix.into());
        self
    }

    /// Default region for audio uploads.
    pub fn upload_region(mut self, region: impl Into<String>) -> Self {
        self.upload_region = Some(region.into());
        self
    }

    /// Resolves all backends and constructs the pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`MimeoError::Config`] when a required piece is missing:
    /// collaborators, the bucket for an object-backed manifest store, the
    /// base URL or token for a remote config provider, or any local
    /// config resource (which reports every checked path).
    pub fn build(self) -> Result<Pipeline> {
        let collaborators = self.collaborators.ok_or_else(|| {
            MimeoError::Config(
                "no collaborators configured - pass PipelineBuilder::collaborators".to_string(),
            )
        })?;

        let manifest_store: Arc<dyn ManifestStore> = match self.manifest_store {
            Some(store) => store,
            None => match env_var(MANIFEST_STORE_ENV).as_deref() {
                Some("s3") => {
                    let storage = self.object_storage.clone().ok_or_else(|| {
                        MimeoError::Config(format!(
                            "{MANIFEST_STORE_ENV}=s3 requires an object-storage client - \
                             pass PipelineBuilder::object_storage"
                        ))
                    })?;
                    let bucket = env_var(MANIFEST_BUCKET_ENV).ok_or_else(|| {
                        MimeoError::Config(format!(
                            "{MANIFEST_STORE_ENV}=s3 requires {MANIFEST_BUCKET_ENV}"
                        ))
                    })?;
                    let prefix = env_var(MANIFEST_PREFIX_ENV).unwrap_or_default();
                    Arc::new(ObjectManifestStore::new(storage, bucket, prefix))
                }
                Some("fs") | None => Arc::new(FsManifestStore::new()),
                Some(other) => {
                    return Err(MimeoError::Config(format!(
                        "unknown {MANIFEST_STORE_ENV} value '{other}' (expected 'fs' or 's3')"
                    )));
                }
            },
        };

        let config: Arc<dyn ConfigProvider> = match self.config_provider {
            Some(provider) => provider,
            None => match env_var(CONFIG_PROVIDER_ENV).as_deref() {
                Some("remote") => {
                    let base_url = env_var(CONFIG_BASE_URL_ENV).ok_or_else(|| {
                        MimeoError::Config(format!(
                            "{CONFIG_PROVIDER_ENV}=remote requires {CONFIG_BASE_URL_ENV}"
                        ))
                    })?;
                    let token = env_var(CONFIG_TOKEN_ENV).ok_or_else(|| {
                        MimeoError::Config(format!(
                            "{CONFIG_PROVIDER_ENV}=remote requires {CONFIG_TOKEN_ENV}"
                        ))
                    })?;
                    Arc::new(RemoteConfigProvider::new(base_url, token)?)
                }
                Some("local") | None => {
                    Arc::new(LocalConfigProvider::new(self.local_config)?)
                }
                Some(other) => {
                    return Err(MimeoError::Config(format!(
                        "unknown {CONFIG_PROVIDER_ENV} value '{other}' \
                         (expected 'local' or 'remote')"
                    )));
                }
            },
        };

        let upload = UploadSettings {
            bucket: self.upload_bucket.or_else(|| env_var(UPLOAD_BUCKET_ENV)),
            prefix: self
                .upload_prefix
                .or_else(|| env_var(UPLOAD_PREFIX_ENV))
                .unwrap_or_default(),
            region: self.upload_region.or_else(|| env_var(UPLOAD_REGION_ENV)),
        };

        let (event_tx, _) = broadcast::channel(DEFAULT_EVENT_CHANNEL_CAPACITY);

        Ok(Pipeline {
            manifest_store,
            config,
            collaborators,
            logger: self.logger.unwrap_or_else(|| Arc::new(NoopLogger)),
            metrics: self.metrics.unwrap_or_else(|| Arc::new(NoopMetrics)),
            upload,
            event_tx,
        })
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
