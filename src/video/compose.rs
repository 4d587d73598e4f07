use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rand::Rng;
use rand::seq::SliceRandom;
use serde_json::json;

use super::ffmpeg::{FfmpegRunOptions, FfmpegRunner};
use super::materials::Material;
use super::params::{ConcatMode, TransitionMode, VideoParams};
use super::title_card::{TitleCard, format_seconds};
use crate::ui::prelude::{Level, emit};

const OUTPUT_FPS: u32 = 30;
const FADE_SECONDS: f64 = 1.0;
const BGM_FADE_OUT_SECONDS: f64 = 3.0;

/// One cut from a material: `duration` seconds starting at `start`.
#[derive(Debug, Clone, PartialEq)]
pub struct ClipPlan {
    pub source: PathBuf,
    pub start: f64,
    pub duration: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClipEffect {
    pub fade_in: bool,
    pub fade_out: bool,
}

/// Cut materials into clips of at most `clip_duration` seconds.
///
/// Sequential mode keeps material order and only the first clip of each
/// material. Random mode uses every clip in shuffled order.
pub fn plan_clips<R: Rng>(
    materials: &[Material],
    clip_duration: f64,
    mode: ConcatMode,
    rng: &mut R,
) -> Vec<ClipPlan> {
    let clip_duration = if clip_duration > 0.0 { clip_duration } else { 5.0 };
    let mut clips = Vec::new();

    for material in materials {
        let mut start = 0.0;
        while start < material.duration {
            let duration = clip_duration.min(material.duration - start);
            // Drop slivers shorter than a frame
            if duration < 1.0 / OUTPUT_FPS as f64 {
                break;
            }
            clips.push(ClipPlan {
                source: material.path.clone(),
                start,
                duration,
            });
            if mode == ConcatMode::Sequential {
                break;
            }
            start += clip_duration;
        }
    }

    if mode == ConcatMode::Random {
        clips.shuffle(rng);
    }

    clips
}

/// Keep clips until their total covers `target` seconds.
pub fn limit_to_duration(clips: Vec<ClipPlan>, target: f64) -> Vec<ClipPlan> {
    let mut total = 0.0;
    let mut kept = Vec::new();
    for clip in clips {
        if total >= target && !kept.is_empty() {
            break;
        }
        total += clip.duration;
        kept.push(clip);
    }
    kept
}

pub fn plan_transitions<R: Rng>(
    mode: Option<TransitionMode>,
    count: usize,
    rng: &mut R,
) -> Vec<ClipEffect> {
    let mode = match mode {
        Some(TransitionMode::SlideIn) | Some(TransitionMode::SlideOut) => {
            emit(
                Level::Warn,
                "video.compose.transition_fallback",
                "Slide transitions are not rendered locally; using FadeIn",
                None,
            );
            Some(TransitionMode::FadeIn)
        }
        other => other,
    };

    (0..count)
        .map(|index| {
            let first = index == 0;
            let last = index + 1 == count;
            match mode {
                Some(TransitionMode::FadeIn) => ClipEffect {
                    fade_in: !first,
                    fade_out: false,
                },
                Some(TransitionMode::FadeOut) => ClipEffect {
                    fade_in: false,
                    fade_out: !last,
                },
                Some(TransitionMode::Shuffle) => {
                    if rng.gen_bool(0.5) {
                        ClipEffect {
                            fade_in: !first,
                            fade_out: false,
                        }
                    } else {
                        ClipEffect {
                            fade_in: false,
                            fade_out: !last,
                        }
                    }
                }
                _ => ClipEffect::default(),
            }
        })
        .collect()
}

pub fn normalize_args(
    clip: &ClipPlan,
    effect: ClipEffect,
    resolution: (u32, u32),
    output: &Path,
) -> Vec<String> {
    let (width, height) = resolution;
    let mut filters = vec![
        format!("scale={width}:{height}:force_original_aspect_ratio=decrease"),
        format!("pad={width}:{height}:(ow-iw)/2:(oh-ih)/2:color=black"),
        "setsar=1".to_string(),
        format!("fps={OUTPUT_FPS}"),
    ];

    let fade = FADE_SECONDS.min(clip.duration / 2.0);
    if effect.fade_in {
        filters.push(format!("fade=t=in:st=0:d={}", format_seconds(fade)));
    }
    if effect.fade_out {
        filters.push(format!(
            "fade=t=out:st={}:d={}",
            format_seconds(clip.duration - fade),
            format_seconds(fade)
        ));
    }

    vec![
        "-y".into(),
        "-ss".into(),
        format_seconds(clip.start),
        "-t".into(),
        format_seconds(clip.duration),
        "-i".into(),
        clip.source.to_string_lossy().into_owned(),
        "-vf".into(),
        filters.join(","),
        "-an".into(),
        "-c:v".into(),
        "libx264".into(),
        "-preset".into(),
        "ultrafast".into(),
        "-pix_fmt".into(),
        "yuv420p".into(),
        output.to_string_lossy().into_owned(),
    ]
}

/// Entries for the concat demuxer, one `file '...'` line per clip.
pub fn concat_list(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|path| {
            let escaped = path.to_string_lossy().replace('\'', "'\\''");
            format!("file '{escaped}'\n")
        })
        .collect()
}

pub fn concat_args(list_file: &Path, output: &Path, stream_copy: bool) -> Vec<String> {
    let mut args: Vec<String> = vec![
        "-y".into(),
        "-f".into(),
        "concat".into(),
        "-safe".into(),
        "0".into(),
        "-i".into(),
        list_file.to_string_lossy().into_owned(),
    ];
    if stream_copy {
        args.extend(["-c".into(), "copy".into()]);
    } else {
        args.extend(["-c:a".into(), "libmp3lame".into(), "-q:a".into(), "2".into()]);
    }
    args.push(output.to_string_lossy().into_owned());
    args
}

pub struct FinalPass<'a> {
    pub merged_video: &'a Path,
    pub narration: &'a Path,
    pub narration_duration: f64,
    pub bgm: Option<&'a Path>,
    pub title: &'a TitleCard,
    pub params: &'a VideoParams,
    pub output: &'a Path,
}

impl FinalPass<'_> {
    pub fn filter_complex(&self) -> String {
        let mut graph = Vec::new();

        if self.title.is_visible() {
            graph.push(format!(
                "[0:v]{},format=yuv420p[v]",
                self.title.drawtext_filter()
            ));
        } else {
            graph.push("[0:v]format=yuv420p[v]".to_string());
        }

        let voice_volume = format!("{:.2}", self.params.voice_volume);
        match self.bgm {
            Some(_) => {
                let fade_start = (self.narration_duration - BGM_FADE_OUT_SECONDS).max(0.0);
                graph.push(format!("[1:a]volume={voice_volume}[voice]"));
                graph.push(format!(
                    "[2:a]volume={:.2},afade=t=out:st={}:d={}[bgm]",
                    self.params.bgm_volume,
                    format_seconds(fade_start),
                    format_seconds(BGM_FADE_OUT_SECONDS)
                ));
                graph.push(
                    "[voice][bgm]amix=inputs=2:duration=first:dropout_transition=0:normalize=0[a]"
                        .to_string(),
                );
            }
            None => graph.push(format!("[1:a]volume={voice_volume}[a]")),
        }

        graph.join(";")
    }

    pub fn args(&self) -> Vec<String> {
        let mut args: Vec<String> = vec![
            "-y".into(),
            "-stream_loop".into(),
            "-1".into(),
            "-i".into(),
            self.merged_video.to_string_lossy().into_owned(),
            "-i".into(),
            self.narration.to_string_lossy().into_owned(),
        ];
        if let Some(bgm) = self.bgm {
            args.extend([
                "-stream_loop".into(),
                "-1".into(),
                "-i".into(),
                bgm.to_string_lossy().into_owned(),
            ]);
        }
        args.extend([
            "-filter_complex".into(),
            self.filter_complex(),
            "-map".into(),
            "[v]".into(),
            "-map".into(),
            "[a]".into(),
            "-t".into(),
            format_seconds(self.narration_duration),
            "-r".into(),
            OUTPUT_FPS.to_string(),
            "-c:v".into(),
            "libx264".into(),
            "-preset".into(),
            "medium".into(),
            "-c:a".into(),
            "aac".into(),
            "-b:a".into(),
            "192k".into(),
            "-threads".into(),
            self.params.n_threads.max(1).to_string(),
            "-movflags".into(),
            "+faststart".into(),
            self.output.to_string_lossy().into_owned(),
        ]);
        args
    }
}

/// Inputs for one local composition.
pub struct Composition<'a> {
    pub materials: &'a [Material],
    pub narration: &'a Path,
    pub narration_duration: f64,
    pub params: &'a VideoParams,
    pub title: &'a TitleCard,
    pub bgm: Option<&'a Path>,
    pub output: &'a Path,
}

pub struct VideoComposer<'a> {
    runner: &'a dyn FfmpegRunner,
    work_dir: PathBuf,
}

impl<'a> VideoComposer<'a> {
    pub fn new(runner: &'a dyn FfmpegRunner, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            work_dir: work_dir.into(),
        }
    }

    pub fn compose(&self, job: &Composition<'_>) -> Result<()> {
        let clips_dir = self.work_dir.join("clips");
        fs::create_dir_all(&clips_dir)
            .with_context(|| format!("creating clip directory {}", clips_dir.display()))?;

        let mut rng = rand::thread_rng();
        let clips = plan_clips(
            job.materials,
            job.params.video_clip_duration as f64,
            job.params.video_concat_mode,
            &mut rng,
        );
        let clips = limit_to_duration(clips, job.narration_duration);
        let effects = plan_transitions(job.params.video_transition_mode, clips.len(), &mut rng);
        let resolution = job.params.resolution();

        emit(
            Level::Info,
            "video.compose.plan",
            &format!(
                "Rendering {} clips at {}x{}",
                clips.len(),
                resolution.0,
                resolution.1
            ),
            Some(json!({
                "clips": clips.len(),
                "width": resolution.0,
                "height": resolution.1,
                "narration_seconds": job.narration_duration,
            })),
        );

        let mut rendered = Vec::with_capacity(clips.len());
        for (index, (clip, effect)) in clips.iter().zip(effects).enumerate() {
            let output = clips_dir.join(format!("clip-{:03}.mp4", index + 1));
            let args = normalize_args(clip, effect, resolution, &output);
            self.runner
                .run(
                    &args,
                    FfmpegRunOptions::new(
                        Some(clip.duration),
                        format!("clip {}/{}", index + 1, clips.len()),
                    ),
                )
                .with_context(|| format!("normalizing clip from {}", clip.source.display()))?;
            rendered.push(output);
        }

        let merged = self.work_dir.join("merged.mp4");
        let mut list = tempfile::Builder::new()
            .prefix("clips-")
            .suffix(".txt")
            .tempfile_in(&self.work_dir)
            .context("creating concat list")?;
        list.write_all(concat_list(&rendered).as_bytes())
            .context("writing concat list")?;
        list.flush().context("writing concat list")?;

        self.runner
            .run(
                &concat_args(list.path(), &merged, true),
                FfmpegRunOptions::new(None, "merging clips"),
            )
            .context("merging clips")?;

        let final_pass = FinalPass {
            merged_video: &merged,
            narration: job.narration,
            narration_duration: job.narration_duration,
            bgm: job.bgm,
            title: job.title,
            params: job.params,
            output: job.output,
        };
        self.runner
            .run(
                &final_pass.args(),
                FfmpegRunOptions::new(Some(job.narration_duration), "rendering final video"),
            )
            .with_context(|| format!("rendering {}", job.output.display()))?;

        emit(
            Level::Success,
            "video.compose.done",
            &format!("Wrote {}", job.output.display()),
            Some(json!({ "output": job.output.display().to_string() })),
        );

        Ok(())
    }
}
