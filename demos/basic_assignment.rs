//! Basic mimeo pipeline example.
//!
//! This example demonstrates:
//! - Wiring collaborators into a pipeline
//! - Running a full assignment for one document
//! - Checking assignment status and content drift
//! - Rerunning the audio steps against the recorded manifest
//! - Observing pipeline events
//!
//! The collaborators here are stand-ins that print what a real CMS,
//! formatter, synthesizer, and uploader would do.
//!
//! Run with: `cargo run --example basic_assignment`

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use mimeo::{
    AudioAttacher, Collaborators, ColorizeCounts, Colorizer, ConfigProvider, FsManifestStore,
    Importer, PageRef, Pipeline, PipelineEvent, PresetDefinition, RerunFlags, Result, RunFlags,
    SpeechSynthesizer, StudentProfile, SynthesisOptions, SynthesisOutput, UploadRequest,
    UploadTarget, Uploader, VoiceAssignment,
};

/// Pretends to be the content-management service.
#[derive(Debug)]
struct DemoImporter;

#[async_trait]
impl Importer for DemoImporter {
    async fn validate(&self, document: &Path) -> Result<()> {
        println!("  📄 Validating '{}'", document.display());
        Ok(())
    }

    async fn import(
        &self,
        document: &Path,
        prior: Option<&PageRef>,
        _replace: bool,
    ) -> Result<PageRef> {
        match prior {
            Some(page) => println!("  📤 Updating page {} from '{}'", page.page_id, document.display()),
            None => println!("  📤 Publishing '{}' as a new page", document.display()),
        }
        Ok(PageRef {
            page_id: "page-demo-1".to_string(),
            page_url: Some("https://cms.example/p/page-demo-1".to_string()),
        })
    }
}

/// Pretends to restyle the published page.
#[derive(Debug)]
struct DemoColorizer;

#[async_trait]
impl Colorizer for DemoColorizer {
    async fn colorize(
        &self,
        page_id: &str,
        preset: &str,
        _definition: &PresetDefinition,
    ) -> Result<ColorizeCounts> {
        println!("  🎨 Applying preset '{preset}' to page {page_id}");
        Ok(ColorizeCounts {
            updated: 4,
            skipped: 2,
            failed: 0,
        })
    }
}

/// Pretends to synthesize speech, writing a placeholder audio file.
#[derive(Debug)]
struct DemoSynthesizer {
    output_dir: PathBuf,
}

#[async_trait]
impl SpeechSynthesizer for DemoSynthesizer {
    async fn synthesize(
        &self,
        document: &Path,
        _voices: Option<&Path>,
        _options: &SynthesisOptions,
    ) -> Result<SynthesisOutput> {
        println!("  🔊 Synthesizing audio for '{}'", document.display());
        let audio_path = self.output_dir.join("lesson-audio.mp3");
        tokio::fs::write(&audio_path, b"demo audio bytes").await?;
        Ok(SynthesisOutput {
            audio_path,
            audio_hash: "demo-audio-hash".to_string(),
            voices: vec![
                VoiceAssignment {
                    speaker: "Teacher".to_string(),
                    voice: "en-GB-anna".to_string(),
                },
                VoiceAssignment {
                    speaker: "Student".to_string(),
                    voice: "en-US-ben".to_string(),
                },
            ],
        })
    }
}

/// Pretends to upload to object storage.
#[derive(Debug)]
struct DemoUploader;

#[async_trait]
impl Uploader for DemoUploader {
    async fn upload(&self, file: &Path, request: &UploadRequest) -> Result<String> {
        println!(
            "  ☁️  Uploading '{}' to s3://{}/{}",
            file.display(),
            request.bucket,
            request.key
        );
        Ok(format!(
            "https://{}.s3.amazonaws.com/{}",
            request.bucket, request.key
        ))
    }
}

/// Pretends to attach the audio URL back to the page.
#[derive(Debug)]
struct DemoAttacher;

#[async_trait]
impl AudioAttacher for DemoAttacher {
    async fn attach(&self, page_id: &str, audio_url: &str) -> Result<()> {
        println!("  🔗 Attaching {audio_url} to page {page_id}");
        Ok(())
    }
}

/// In-memory config so the demo needs no config files on disk.
#[derive(Debug)]
struct DemoConfig;

#[async_trait]
impl ConfigProvider for DemoConfig {
    async fn load_presets(&self) -> Result<HashMap<String, PresetDefinition>> {
        let mut presets = HashMap::new();
        presets.insert("rainbow".to_string(), PresetDefinition::default());
        Ok(presets)
    }

    async fn load_student_profiles(&self) -> Result<Vec<StudentProfile>> {
        Ok(Vec::new())
    }

    async fn resolve_voices_path(&self) -> Result<Option<PathBuf>> {
        Ok(None)
    }
}

fn drain_events(events: &mut tokio::sync::broadcast::Receiver<PipelineEvent>) {
    while let Ok(event) = events.try_recv() {
        match event {
            PipelineEvent::StageSkipped { stage, reason, .. } => {
                println!("     ⏭  {stage} skipped ({reason})");
            }
            PipelineEvent::PipelineCompleted { elapsed, .. } => {
                println!("     ✓ pipeline completed in {elapsed:?}");
            }
            PipelineEvent::PipelineFailed { error, .. } => {
                println!("     ✗ pipeline failed: {error}");
            }
            _ => {}
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let dir = std::env::temp_dir().join("mimeo-demo");
    tokio::fs::create_dir_all(&dir).await?;
    let doc = dir.join("lesson.md");
    tokio::fs::write(
        &doc,
        "# Unit 3: At the Market\n\nTeacher: What would you like today?\nStudent: Two apples, please.\n",
    )
    .await?;

    let collaborators = Collaborators {
        importer: Arc::new(DemoImporter),
        colorizer: Arc::new(DemoColorizer),
        synthesizer: Arc::new(DemoSynthesizer {
            output_dir: dir.clone(),
        }),
        uploader: Arc::new(DemoUploader),
        attacher: Arc::new(DemoAttacher),
    };

    let pipeline = Pipeline::builder()
        .collaborators(collaborators)
        .manifest_store(Arc::new(FsManifestStore::new()))
        .config_provider(Arc::new(DemoConfig))
        .upload_bucket("homework-audio")
        .upload_prefix("assignments")
        .build()?;

    let mut events = pipeline.subscribe();

    println!("=== Full assignment run ===");
    let mut flags = RunFlags::new(&doc);
    flags.preset = Some("rainbow".to_string());
    flags.with_tts = true;
    flags.upload = Some(UploadTarget::S3);

    let report = pipeline.new_assignment(&flags).await?;
    drain_events(&mut events);
    println!("steps: {:?}", report.steps);
    println!("manifest: {}", report.manifest_path);

    println!("\n=== Assignment status ===");
    let status = pipeline.assignment_status(&doc).await?;
    print!("{status}");

    println!("\n=== Rerun: re-upload and re-attach ===");
    let rerun = pipeline.rerun_assignment(&RerunFlags::new(&doc)).await?;
    drain_events(&mut events);
    println!("steps: {:?}", rerun.steps);

    println!("\n=== Edit the document, then check for drift ===");
    tokio::fs::write(&doc, "# Unit 3: At the Market (revised)\n").await?;
    let status = pipeline.assignment_status(&doc).await?;
    println!(
        "content drifted: {}",
        if status.is_stale() { "yes" } else { "no" }
    );

    Ok(())
}
