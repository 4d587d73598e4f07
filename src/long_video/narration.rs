use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::json;
use sha2::{Digest, Sha256};

use crate::error::MakerError;
use crate::tts::{TtsProvider, VoiceSettings};
use crate::ui::prelude::{Level, emit};
use crate::video::compose::{concat_args, concat_list};
use crate::video::ffmpeg::{FfmpegRunOptions, FfmpegRunner};

pub const NARRATION_FILE: &str = "narration.mp3";

pub fn segment_audio_path(task_path: &Path, index: usize) -> PathBuf {
    task_path.join(format!("audio-{}.mp3", index + 1))
}

fn cache_key_path(audio_path: &Path) -> PathBuf {
    audio_path.with_extension("sha256")
}

/// Identifies a synthesized segment; audio is reused while this is unchanged.
pub fn segment_cache_key(text: &str, settings: &VoiceSettings) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hasher.update([0u8]);
    hasher.update(settings.voice_name.as_bytes());
    hasher.update(settings.rate.to_le_bytes());
    hasher.update(settings.volume.to_le_bytes());
    format!("{:x}", hasher.finalize())
}

fn is_cached(audio_path: &Path, key: &str) -> bool {
    audio_path.is_file()
        && fs::read_to_string(cache_key_path(audio_path))
            .map(|stored| stored.trim() == key)
            .unwrap_or(false)
}

/// Synthesize each segment into `audio-<n>.mp3`, skipping the ones that fail.
pub async fn synthesize_segments(
    provider: &dyn TtsProvider,
    segments: &[String],
    settings: &VoiceSettings,
    task_path: &Path,
) -> Result<Vec<PathBuf>> {
    let mut written = Vec::with_capacity(segments.len());

    for (index, text) in segments.iter().enumerate() {
        let audio_path = segment_audio_path(task_path, index);
        let key = segment_cache_key(text, settings);

        if is_cached(&audio_path, &key) {
            emit(
                Level::Debug,
                "long.narration.cached",
                &format!("Reusing {}", audio_path.display()),
                None,
            );
            written.push(audio_path);
            continue;
        }

        emit(
            Level::Info,
            "long.narration.segment",
            &format!(
                "Synthesizing segment {}/{} ({} characters)",
                index + 1,
                segments.len(),
                text.chars().count()
            ),
            Some(json!({ "segment": index + 1, "chars": text.chars().count() })),
        );

        match provider.synthesize(text, settings).await {
            Ok(audio) => {
                fs::write(&audio_path, &audio)
                    .with_context(|| format!("writing {}", audio_path.display()))?;
                fs::write(cache_key_path(&audio_path), &key).with_context(|| {
                    format!("writing cache key for {}", audio_path.display())
                })?;
                written.push(audio_path);
            }
            Err(err) => {
                emit(
                    Level::Warn,
                    "long.narration.segment_failed",
                    &format!("Segment {} skipped: {err:#}", index + 1),
                    Some(json!({ "segment": index + 1 })),
                );
            }
        }
    }

    if written.is_empty() {
        return Err(MakerError::provider(
            provider.name(),
            format!("all {} script segments failed to synthesize", segments.len()),
        )
        .into());
    }

    Ok(written)
}

/// Join segment audio into one narration track.
pub fn concat_narration(
    runner: &dyn FfmpegRunner,
    segments: &[PathBuf],
    output: &Path,
) -> Result<()> {
    if let [single] = segments {
        fs::copy(single, output)
            .with_context(|| format!("copying {} to {}", single.display(), output.display()))?;
        return Ok(());
    }

    let work_dir = output.parent().unwrap_or_else(|| Path::new("."));
    let mut list = tempfile::Builder::new()
        .prefix("narration-")
        .suffix(".txt")
        .tempfile_in(work_dir)
        .context("creating narration concat list")?;
    list.write_all(concat_list(segments).as_bytes())
        .context("writing narration concat list")?;
    list.flush().context("writing narration concat list")?;

    runner
        .run(
            &concat_args(list.path(), output, false),
            FfmpegRunOptions::new(None, "joining narration"),
        )
        .context("joining narration audio")
}
