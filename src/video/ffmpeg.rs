use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use indicatif::{ProgressBar, ProgressStyle};

use crate::error::MakerError;
use crate::ui::prelude::{Level, OutputFormat, emit, get_output_format, is_debug_enabled};

/// Runs one ffmpeg invocation to completion.
pub trait FfmpegRunner {
    fn run(&self, args: &[String], options: FfmpegRunOptions) -> Result<()>;
}

/// Duration and dimension lookups, normally answered by ffprobe.
pub trait MediaProbe {
    fn duration_seconds(&self, path: &Path) -> Result<f64>;
    fn dimensions(&self, path: &Path) -> Result<(u32, u32)>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemFfmpegRunner;

#[derive(Debug, Default, Clone, Copy)]
pub struct FfprobeProbe;

#[derive(Debug, Clone, Default)]
pub struct FfmpegRunOptions {
    /// Expected output length; enables the progress bar.
    pub total_duration: Option<f64>,
    pub label: Option<String>,
}

impl FfmpegRunOptions {
    pub fn new(total_duration: Option<f64>, label: impl Into<String>) -> Self {
        Self {
            total_duration,
            label: Some(label.into()),
        }
    }
}

const STDERR_TAIL: usize = 12;

/// Fails early with a readable message when ffmpeg or ffprobe is missing.
pub fn ensure_tools_available() -> Result<()> {
    let missing: Vec<&str> = ["ffmpeg", "ffprobe"]
        .into_iter()
        .filter(|tool| which::which(tool).is_err())
        .collect();
    if missing.is_empty() {
        return Ok(());
    }
    Err(MakerError::MissingInput(format!(
        "{} not found in PATH; install ffmpeg to compose videos",
        missing.join(" and ")
    ))
    .into())
}

impl FfmpegRunner for SystemFfmpegRunner {
    fn run(&self, args: &[String], options: FfmpegRunOptions) -> Result<()> {
        let label = options.label.as_deref().unwrap_or("ffmpeg");
        emit(
            Level::Debug,
            "video.ffmpeg.command",
            &format!("{label}: ffmpeg {}", shell_words::join(args)),
            None,
        );

        let mut child = Command::new("ffmpeg")
            .args(["-hide_banner", "-nostdin"])
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .context("starting ffmpeg")?;
        let stderr = child.stderr.take().context("ffmpeg stderr was not captured")?;

        let bar = options
            .total_duration
            .filter(|_| matches!(get_output_format(), OutputFormat::Text))
            .map(|seconds| render_bar(seconds, label));

        let tail = follow_stderr(stderr, bar.as_ref());
        let status = child.wait().context("waiting for ffmpeg")?;
        if let Some(bar) = &bar {
            bar.finish_and_clear();
        }
        let tail = tail?;

        if status.success() {
            return Ok(());
        }
        Err(anyhow!(
            "ffmpeg ({label}) exited with {}: {}",
            status
                .code()
                .map_or_else(|| "a signal".to_string(), |code| format!("status {code}")),
            tail.join("\n")
        ))
    }
}

fn render_bar(seconds: f64, label: &str) -> ProgressBar {
    let bar = ProgressBar::new((seconds * 1000.0).max(1.0) as u64);
    if let Ok(style) =
        ProgressStyle::with_template("{spinner:.green} {msg} [{bar:36.cyan/blue}] {percent:>3}% ({eta})")
    {
        bar.set_style(style.progress_chars("█▉▊▋▌▍▎▏ "));
    }
    bar.set_message(label.to_string());
    bar.enable_steady_tick(Duration::from_millis(120));
    bar
}

/// Drive the progress bar from `time=` stats and keep the last stderr lines for errors.
fn follow_stderr<R: Read>(stderr: R, bar: Option<&ProgressBar>) -> Result<Vec<String>> {
    let echo = is_debug_enabled();
    let mut tail: Vec<String> = Vec::with_capacity(STDERR_TAIL);
    let mut reader = BufReader::new(stderr);
    let mut chunk = Vec::new();

    // ffmpeg rewrites its stats line with '\r'
    while reader.read_until(b'\r', &mut chunk).context("reading ffmpeg output")? > 0 {
        let text = String::from_utf8_lossy(&chunk).into_owned();
        chunk.clear();
        for line in text.split('\n').map(str::trim).filter(|line| !line.is_empty()) {
            if echo {
                eprintln!("{line}");
            }
            if let Some(seconds) = progress_seconds(line) {
                if let Some(bar) = bar {
                    bar.set_position((seconds * 1000.0) as u64);
                }
                continue;
            }
            if tail.len() == STDERR_TAIL {
                tail.remove(0);
            }
            tail.push(line.to_string());
        }
    }
    Ok(tail)
}

fn progress_seconds(line: &str) -> Option<f64> {
    let stamp = line.split_once("time=")?.1.split_whitespace().next()?;
    let mut seconds = 0.0;
    let mut fields = 0;
    for field in stamp.split(':') {
        seconds = seconds * 60.0 + field.parse::<f64>().ok()?;
        fields += 1;
    }
    (fields == 3).then_some(seconds)
}

impl MediaProbe for FfprobeProbe {
    fn duration_seconds(&self, path: &Path) -> Result<f64> {
        probe_duration_seconds(path)
    }

    fn dimensions(&self, path: &Path) -> Result<(u32, u32)> {
        probe_video_dimensions(path)
    }
}

fn ffprobe(path: &Path, query: &[&str]) -> Result<String> {
    let output = Command::new("ffprobe")
        .args(["-v", "error"])
        .args(query)
        .arg(path)
        .output()
        .with_context(|| format!("running ffprobe on {}", path.display()))?;
    if !output.status.success() {
        return Err(anyhow!(
            "ffprobe could not read {}: {}",
            path.display(),
            String::from_utf8_lossy(&output.stderr).trim()
        ));
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

pub fn probe_duration_seconds(path: &Path) -> Result<f64> {
    let raw = ffprobe(
        path,
        &["-show_entries", "format=duration", "-of", "default=noprint_wrappers=1:nokey=1"],
    )?;
    raw.parse()
        .with_context(|| format!("unexpected duration {raw:?} for {}", path.display()))
}

pub fn probe_video_dimensions(path: &Path) -> Result<(u32, u32)> {
    let raw = ffprobe(
        path,
        &["-select_streams", "v:0", "-show_entries", "stream=width,height", "-of", "csv=s=x:p=0"],
    )?;
    parse_dimensions(&raw)
        .with_context(|| format!("unexpected dimensions {raw:?} for {}", path.display()))
}

fn parse_dimensions(value: &str) -> Result<(u32, u32)> {
    // Some containers report a trailing `x` or several streams; take the first pair
    let first = value.lines().next().unwrap_or_default();
    let mut parts = first.split('x').filter(|part| !part.is_empty());
    let width: u32 = parts.next().context("missing width")?.parse()?;
    let height: u32 = parts.next().context("missing height")?.parse()?;
    Ok((width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_progress_time_from_stats_line() {
        let line = "frame=  240 fps= 60 q=28.0 size=    512kB time=00:01:02.50 bitrate= 67.1kbits/s speed=2.01x";
        assert_eq!(progress_seconds(line), Some(62.5));
    }

    #[test]
    fn ignores_lines_without_time() {
        assert_eq!(progress_seconds("Input #0, mov,mp4"), None);
        assert_eq!(progress_seconds("time=N/A bitrate=N/A"), None);
    }

    #[test]
    fn stderr_tail_keeps_last_lines_and_skips_stats() {
        let mut input = String::new();
        for n in 0..20 {
            input.push_str(&format!("line {n}\n"));
        }
        input.push_str("frame=1 time=00:00:01.00 bitrate=1k\r");
        input.push_str("Conversion failed!\n");

        let tail = follow_stderr(input.as_bytes(), None).unwrap();
        assert_eq!(tail.len(), STDERR_TAIL);
        assert_eq!(tail.last().map(String::as_str), Some("Conversion failed!"));
        assert!(tail.iter().all(|line| !line.contains("time=")));
    }

    #[test]
    fn parses_dimension_pairs() {
        assert_eq!(parse_dimensions("1920x1080").unwrap(), (1920, 1080));
        assert_eq!(parse_dimensions("1280x720x\n640x480").unwrap(), (1280, 720));
        assert!(parse_dimensions("").is_err());
    }
}
