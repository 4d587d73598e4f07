//! Long-Video Assembler.
//!
//! Turns a task directory holding `script.txt` into `final.mp4`: the script
//! is narrated segment by segment, local materials are cut and normalized to
//! 1920x1080, and the title is shown over the first two seconds.

pub mod narration;
pub mod script;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::cli::LongArgs;
use crate::common::paths::{Storage, expand_path};
use crate::config::AppConfig;
use crate::tts::{self, TtsProvider, VoiceSettings};
use crate::ui::prelude::{Level, emit};
use crate::video::compose::{Composition, VideoComposer};
use crate::video::ffmpeg::{
    FfmpegRunner, FfprobeProbe, MediaProbe, SystemFfmpegRunner, ensure_tools_available,
};
use crate::video::materials::collect_materials;
use crate::video::music::MusicResolver;
use crate::video::params::{MaterialInfo, VideoParams};
use crate::video::title_card::TitleCard;
use crate::voice::resolve_voice;

pub const FINAL_VIDEO: &str = "final.mp4";
pub const RESULT_FILE: &str = "result.json";
pub const BATCH_RESULTS_FILE: &str = "long_video_results.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LongVideoResult {
    pub title: String,
    pub task_path: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(default)]
    pub segments: usize,
    #[serde(default)]
    pub materials: usize,
    #[serde(default)]
    pub duration: f64,
    #[serde(default)]
    pub voice_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Local>,
}

impl LongVideoResult {
    fn failed(job: &LongVideoJob<'_>, err: &anyhow::Error) -> Self {
        Self {
            title: job.title.to_string(),
            task_path: job.task_path.display().to_string(),
            success: false,
            output: None,
            segments: 0,
            materials: 0,
            duration: 0.0,
            voice_name: String::new(),
            error: Some(format!("{err:#}")),
            created_at: Local::now(),
        }
    }
}

/// Everything one assembly run needs besides configuration.
pub struct LongVideoJob<'a> {
    pub task_path: &'a Path,
    pub title: &'a str,
    pub materials_dir: PathBuf,
}

/// Collaborators that touch the outside world.
pub struct Services<'a> {
    pub tts: &'a dyn TtsProvider,
    pub ffmpeg: &'a dyn FfmpegRunner,
    pub probe: &'a dyn MediaProbe,
}

pub async fn handle_long_command(args: &LongArgs, config: &AppConfig) -> Result<()> {
    let task_path = expand_path(&args.task_path);
    script::read_script(&task_path)?;
    ensure_tools_available()?;

    let storage = Storage::from_config(config);
    let materials_dir = args
        .materials
        .as_deref()
        .map(expand_path)
        .unwrap_or_else(|| storage.long_materials_dir());

    let voice_name = resolve_voice(None, config)?;
    let provider = tts::create_provider(&voice_name, config)?;
    let runner = SystemFfmpegRunner;
    let probe = FfprobeProbe;

    let job = LongVideoJob {
        task_path: &task_path,
        title: &args.title,
        materials_dir,
    };
    let services = Services {
        tts: provider.as_ref(),
        ffmpeg: &runner,
        probe: &probe,
    };
    assemble(&job, config, &storage, &services).await?;
    Ok(())
}

/// Build `final.mp4` for `job`. Once the script is readable, the outcome is
/// recorded in `long_video_results.json` whether or not assembly succeeds.
pub async fn assemble(
    job: &LongVideoJob<'_>,
    config: &AppConfig,
    storage: &Storage,
    services: &Services<'_>,
) -> Result<LongVideoResult> {
    let script = script::read_script(job.task_path)?;

    match build(job, script, config, storage, services).await {
        Ok(result) => {
            write_task_result(&result, job.task_path)?;
            write_summary(&result, storage)?;
            Ok(result)
        }
        Err(err) => {
            if let Err(write_err) = write_summary(&LongVideoResult::failed(job, &err), storage) {
                emit(
                    Level::Warn,
                    "long.results.unwritten",
                    &format!("Could not record the failure: {write_err:#}"),
                    None,
                );
            }
            Err(err)
        }
    }
}

async fn build(
    job: &LongVideoJob<'_>,
    script: String,
    config: &AppConfig,
    storage: &Storage,
    services: &Services<'_>,
) -> Result<LongVideoResult> {
    let materials = collect_materials(&job.materials_dir, services.probe)
        .with_context(|| format!("collecting materials from {}", job.materials_dir.display()))?;
    let material_infos = materials
        .iter()
        .map(|material| MaterialInfo {
            duration: material.duration.round() as u32,
            ..MaterialInfo::local(material.path.display().to_string())
        })
        .collect();

    let voice_name = resolve_voice(None, config)?;
    let mut params = VideoParams::long_form(job.title, material_infos, &config.ui);
    params.video_script = script.clone();
    params.voice_name = voice_name.clone();
    let settings = VoiceSettings::new(voice_name, params.voice_rate, params.voice_volume);

    let segments = script::split_script(&script, script::MAX_SEGMENT_CHARS);
    emit(
        Level::Info,
        "long.start",
        &format!(
            "Assembling \"{}\": {} segments, {} materials",
            job.title,
            segments.len(),
            materials.len()
        ),
        Some(json!({
            "task_path": job.task_path.display().to_string(),
            "segments": segments.len(),
            "materials": materials.len(),
            "voice": settings.voice_name,
        })),
    );

    let audio_files =
        narration::synthesize_segments(services.tts, &segments, &settings, job.task_path).await?;
    let narration_path = job.task_path.join(narration::NARRATION_FILE);
    narration::concat_narration(services.ffmpeg, &audio_files, &narration_path)?;
    let narration_duration = services
        .probe
        .duration_seconds(&narration_path)
        .with_context(|| format!("probing {}", narration_path.display()))?;

    let bgm = MusicResolver::new(&storage.song_dir()).resolve(&params.bgm_type, &params.bgm_file)?;
    if bgm.is_none() {
        emit(
            Level::Debug,
            "long.bgm.none",
            &format!("No background music in {}", storage.song_dir().display()),
            None,
        );
    }
    let title = TitleCard::new(job.title, params.title_duration, &config.ui, storage);

    // Narration volume is already applied by the provider
    let mut compose_params = params.clone();
    compose_params.voice_volume = 1.0;

    let output = job.task_path.join(FINAL_VIDEO);
    VideoComposer::new(services.ffmpeg, job.task_path).compose(&Composition {
        materials: &materials,
        narration: &narration_path,
        narration_duration,
        params: &compose_params,
        title: &title,
        bgm: bgm.as_deref(),
        output: &output,
    })?;

    let result = LongVideoResult {
        title: job.title.to_string(),
        task_path: job.task_path.display().to_string(),
        success: true,
        output: Some(output.display().to_string()),
        segments: audio_files.len(),
        materials: materials.len(),
        duration: narration_duration,
        voice_name: settings.voice_name.clone(),
        error: None,
        created_at: Local::now(),
    };

    emit(
        Level::Success,
        "long.done",
        &format!("Long video ready: {} ({:.1}s)", output.display(), narration_duration),
        Some(json!({ "output": result.output, "duration": narration_duration })),
    );

    Ok(result)
}

fn write_task_result(result: &LongVideoResult, task_path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(result).context("serializing long video result")?;
    let task_result = task_path.join(RESULT_FILE);
    fs::write(&task_result, json).with_context(|| format!("writing {}", task_result.display()))
}

fn write_summary(result: &LongVideoResult, storage: &Storage) -> Result<()> {
    let batch_dir = storage.batch_dir();
    Storage::ensure_dir(&batch_dir)?;
    let summary_path = batch_dir.join(BATCH_RESULTS_FILE);
    let summary =
        serde_json::to_string_pretty(&[result]).context("serializing long video results")?;
    fs::write(&summary_path, summary)
        .with_context(|| format!("writing {}", summary_path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MakerError;
    use crate::tts::fakes::FakeTts;
    use crate::video::compose::fakes::RecordingRunner;
    use crate::video::materials::fakes::FakeProbe;
    use tempfile::tempdir;

    struct Fixture {
        _temp: tempfile::TempDir,
        task_path: PathBuf,
        materials_dir: PathBuf,
        storage: Storage,
        config: AppConfig,
    }

    fn fixture(script: Option<&str>) -> Fixture {
        let temp = tempdir().unwrap();
        let task_path = temp.path().join("task");
        let materials_dir = temp.path().join("materials");
        fs::create_dir_all(&task_path).unwrap();
        fs::create_dir_all(&materials_dir).unwrap();
        for name in ["one.mp4", "two.mov", "tiny.mp4"] {
            fs::write(materials_dir.join(name), b"video").unwrap();
        }
        if let Some(script) = script {
            fs::write(task_path.join(script::SCRIPT_FILE), script).unwrap();
        }
        let mut config = AppConfig::default();
        config.azure.speech_key = "key".into();
        config.azure.speech_region = "eastasia".into();
        Fixture {
            storage: Storage::new(temp.path().join("storage")),
            task_path,
            materials_dir,
            config,
            _temp: temp,
        }
    }

    fn probe() -> FakeProbe {
        FakeProbe::default()
            .with("one.mp4", (1920, 1080), 30.0)
            .with("two.mov", (1280, 720), 12.0)
            .with("tiny.mp4", (320, 240), 30.0)
            .with(narration::NARRATION_FILE, (0, 0), 18.0)
    }

    #[tokio::test]
    async fn assembles_final_video_and_records_results() {
        let fx = fixture(Some("第一句。第二句。"));
        let tts = FakeTts::default();
        let runner = RecordingRunner::default();
        let probe = probe();
        let job = LongVideoJob {
            task_path: &fx.task_path,
            title: "第一集",
            materials_dir: fx.materials_dir.clone(),
        };
        let services = Services {
            tts: &tts,
            ffmpeg: &runner,
            probe: &probe,
        };

        let result = assemble(&job, &fx.config, &fx.storage, &services).await.unwrap();

        assert!(result.success);
        assert_eq!(result.materials, 2);
        assert_eq!(result.segments, 1);
        assert_eq!(result.duration, 18.0);
        assert_eq!(result.voice_name, tts::AZURE_DEFAULT_VOICE);
        assert!(fx.task_path.join(FINAL_VIDEO).exists());
        assert!(fx.task_path.join("audio-1.mp3").exists());

        let calls = runner.calls.borrow();
        let clip_calls: Vec<_> = calls
            .iter()
            .filter(|args| args.iter().any(|a| a.starts_with("scale=1920:1080")))
            .collect();
        // Sequential mode: one clip per usable material
        assert_eq!(clip_calls.len(), 2);
        assert!(clip_calls[1].iter().any(|a| a.contains("fade=t=in")));
        let last = calls.last().unwrap();
        assert!(last.iter().any(|a| a.contains("enable='between(t,0,2)'")));

        let saved: LongVideoResult =
            serde_json::from_str(&fs::read_to_string(fx.task_path.join(RESULT_FILE)).unwrap())
                .unwrap();
        assert_eq!(saved, result);
        let summary: Vec<LongVideoResult> = serde_json::from_str(
            &fs::read_to_string(fx.storage.batch_dir().join(BATCH_RESULTS_FILE)).unwrap(),
        )
        .unwrap();
        assert_eq!(summary, vec![result]);
    }

    #[tokio::test]
    async fn missing_script_writes_nothing() {
        let fx = fixture(None);
        let tts = FakeTts::default();
        let runner = RecordingRunner::default();
        let probe = probe();
        let job = LongVideoJob {
            task_path: &fx.task_path,
            title: "第一集",
            materials_dir: fx.materials_dir.clone(),
        };
        let services = Services {
            tts: &tts,
            ffmpeg: &runner,
            probe: &probe,
        };

        let err = assemble(&job, &fx.config, &fx.storage, &services).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<MakerError>(),
            Some(MakerError::MissingInput(_))
        ));
        assert_eq!(tts.call_count(), 0);
        assert!(runner.calls.borrow().is_empty());
        assert!(!fx.task_path.join(FINAL_VIDEO).exists());
        assert!(!fx.storage.batch_dir().join(BATCH_RESULTS_FILE).exists());
    }

    #[tokio::test]
    async fn no_usable_materials_is_missing_input() {
        let fx = fixture(Some("内容。"));
        let tts = FakeTts::default();
        let runner = RecordingRunner::default();
        let probe = FakeProbe::default().with("tiny.mp4", (320, 240), 30.0);
        let job = LongVideoJob {
            task_path: &fx.task_path,
            title: "第一集",
            materials_dir: fx.materials_dir.clone(),
        };
        let services = Services {
            tts: &tts,
            ffmpeg: &runner,
            probe: &probe,
        };

        let err = assemble(&job, &fx.config, &fx.storage, &services).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<MakerError>(),
            Some(MakerError::MissingInput(_))
        ));
        assert_eq!(tts.call_count(), 0);
        assert!(!fx.task_path.join(RESULT_FILE).exists());

        let summary: Vec<LongVideoResult> = serde_json::from_str(
            &fs::read_to_string(fx.storage.batch_dir().join(BATCH_RESULTS_FILE)).unwrap(),
        )
        .unwrap();
        assert_eq!(summary.len(), 1);
        assert!(!summary[0].success);
        assert!(summary[0].output.is_none());
        assert!(summary[0].error.as_deref().unwrap().contains("materials"));
    }
}
