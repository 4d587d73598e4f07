//! Voice Maker: one text in, one mp3 out.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::json;

use crate::cli::VoiceArgs;
use crate::common::progress::create_spinner;
use crate::config::AppConfig;
use crate::error::MakerError;
use crate::tts::{self, TtsProvider, VoiceSettings};
use crate::ui::prelude::{Level, emit};
use crate::video::ffmpeg::{FfprobeProbe, MediaProbe};

pub const RATE_RANGE: (f32, f32) = (0.25, 4.0);
pub const VOLUME_RANGE: (f32, f32) = (0.6, 5.0);
const DEFAULT_OUTPUT: &str = "output.mp3";

#[derive(Debug, Clone, PartialEq)]
pub enum TextSource {
    Literal(String),
    File(PathBuf),
}

#[derive(Debug, Clone)]
pub struct VoiceRequest {
    pub source: TextSource,
    pub voice_name: Option<String>,
    pub rate: f32,
    pub volume: f32,
    pub output: Option<PathBuf>,
}

/// Validated text, voice and destination, ready to hand to a provider.
#[derive(Debug, Clone)]
pub struct PreparedVoice {
    pub text: String,
    pub settings: VoiceSettings,
    pub output: PathBuf,
}

#[derive(Debug, Clone)]
pub struct VoiceOutcome {
    pub output: PathBuf,
    pub settings: VoiceSettings,
    pub duration: Option<f64>,
}

impl VoiceRequest {
    pub fn from_args(args: &VoiceArgs) -> Result<Self> {
        let source = match (&args.input.text, &args.input.file) {
            (Some(text), None) => TextSource::Literal(text.clone()),
            (None, Some(file)) => TextSource::File(file.clone()),
            (Some(_), Some(_)) => {
                return Err(MakerError::Validation(
                    "--text and --file cannot be used together".to_string(),
                )
                .into());
            }
            (None, None) => {
                return Err(
                    MakerError::Validation("one of --text or --file is required".to_string())
                        .into(),
                );
            }
        };

        Ok(Self {
            source,
            voice_name: args.voice_name.clone(),
            rate: args.voice_rate,
            volume: args.voice_volume,
            output: args.output.clone(),
        })
    }

    /// Bounds check on rate and volume; nothing is read or written before this passes.
    pub fn validate(&self) -> Result<()> {
        check_range("voice rate", self.rate, RATE_RANGE)?;
        check_range("voice volume", self.volume, VOLUME_RANGE)
    }

    pub fn read_text(&self) -> Result<String> {
        let text = match &self.source {
            TextSource::Literal(text) => text.trim().to_string(),
            TextSource::File(path) => {
                if !path.exists() {
                    return Err(MakerError::FileNotFound(path.clone()).into());
                }
                fs::read_to_string(path)
                    .with_context(|| format!("reading text from {}", path.display()))?
                    .trim()
                    .to_string()
            }
        };

        if text.is_empty() {
            return Err(MakerError::Validation("text to synthesize is empty".to_string()).into());
        }
        Ok(text)
    }

    /// Check bounds, read the text, then pick the voice; input problems win over
    /// missing credentials.
    pub fn prepare(&self, config: &AppConfig) -> Result<PreparedVoice> {
        self.validate()?;
        let text = self.read_text()?;
        let voice_name = resolve_voice(self.voice_name.as_deref(), config)?;
        Ok(PreparedVoice {
            text,
            settings: VoiceSettings::new(voice_name, self.rate, self.volume),
            output: self.output_path(),
        })
    }

    pub fn output_path(&self) -> PathBuf {
        match &self.output {
            Some(path) => path.clone(),
            None => default_output_path(&self.source),
        }
    }
}

fn check_range(label: &str, value: f32, (min, max): (f32, f32)) -> Result<()> {
    if !value.is_finite() || value < min || value > max {
        return Err(MakerError::Validation(format!(
            "{label} {value} is outside the allowed range {min}-{max}"
        ))
        .into());
    }
    Ok(())
}

/// `<dir>/<stem>.mp3` for file input, `output.mp3` otherwise.
pub fn default_output_path(source: &TextSource) -> PathBuf {
    match source {
        TextSource::File(path) => {
            let stem = path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_else(|| "output".to_string());
            path.parent()
                .unwrap_or_else(|| Path::new(""))
                .join(format!("{stem}.mp3"))
        }
        TextSource::Literal(_) => PathBuf::from(DEFAULT_OUTPUT),
    }
}

/// Command line > `[ui].voice_name` > default for whichever provider has credentials.
pub fn resolve_voice(requested: Option<&str>, config: &AppConfig) -> Result<String> {
    if let Some(name) = requested.map(str::trim).filter(|name| !name.is_empty()) {
        return Ok(name.to_string());
    }
    if let Some(name) = config.ui.voice_name() {
        return Ok(name.to_string());
    }
    tts::default_voice(config)
        .map(str::to_string)
        .ok_or_else(|| {
            MakerError::Validation(
                "no voice given and no Azure or SiliconFlow credentials configured".to_string(),
            )
            .into()
        })
}

pub async fn handle_voice_command(args: &VoiceArgs, config: &AppConfig) -> Result<()> {
    let prepared = VoiceRequest::from_args(args)?.prepare(config)?;
    let provider = tts::create_provider(&prepared.settings.voice_name, config)?;
    make_voice(prepared, provider.as_ref(), &FfprobeProbe).await?;
    Ok(())
}

pub async fn make_voice(
    prepared: PreparedVoice,
    provider: &dyn TtsProvider,
    probe: &dyn MediaProbe,
) -> Result<VoiceOutcome> {
    let PreparedVoice {
        text,
        settings,
        output,
    } = prepared;

    emit(
        Level::Info,
        "voice.synthesize.start",
        &format!(
            "Synthesizing {} characters with {} ({})",
            text.chars().count(),
            settings.voice_name,
            provider.name()
        ),
        Some(json!({
            "voice": settings.voice_name,
            "rate": settings.rate,
            "volume": settings.volume,
            "provider": provider.name(),
        })),
    );

    let spinner = create_spinner(format!("Synthesizing with {}...", provider.name()));
    let audio = provider.synthesize(&text, &settings).await;
    spinner.finish_and_clear();
    let audio = audio.with_context(|| format!("synthesizing speech with {}", provider.name()))?;

    write_audio(&output, &audio)?;

    let duration = match probe.duration_seconds(&output) {
        Ok(duration) => Some(duration),
        Err(err) => {
            emit(
                Level::Warn,
                "voice.duration.unavailable",
                &format!("Could not read audio duration: {err:#}"),
                None,
            );
            None
        }
    };

    let message = match duration {
        Some(duration) => format!("Wrote {} ({duration:.2}s)", output.display()),
        None => format!("Wrote {}", output.display()),
    };
    emit(
        Level::Success,
        "voice.synthesize.done",
        &message,
        Some(json!({
            "output": output.display().to_string(),
            "duration": duration,
            "bytes": audio.len(),
        })),
    );

    Ok(VoiceOutcome {
        output,
        settings,
        duration,
    })
}

pub(crate) fn write_audio(output: &Path, audio: &[u8]) -> Result<()> {
    if let Some(parent) = output.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating output directory {}", parent.display()))?;
    }
    fs::write(output, audio).with_context(|| format!("writing audio to {}", output.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tts::fakes::FakeTts;
    use crate::video::materials::fakes::FakeProbe;
    use tempfile::tempdir;

    fn request(source: TextSource, output: Option<PathBuf>) -> VoiceRequest {
        VoiceRequest {
            source,
            voice_name: Some("zh-CN-YunxiNeural-Male".into()),
            rate: 1.0,
            volume: 1.0,
            output,
        }
    }

    #[test]
    fn rate_and_volume_bounds_are_enforced() {
        let mut req = request(TextSource::Literal("hi".into()), None);
        req.rate = 5.0;
        assert!(req.validate().is_err());
        req.rate = 0.25;
        req.volume = 0.5;
        assert!(req.validate().is_err());
        req.volume = 5.0;
        assert!(req.validate().is_ok());
    }

    #[test]
    fn voice_precedence() {
        let mut config = AppConfig::default();
        config.azure.speech_key = "k".into();
        config.azure.speech_region = "eastasia".into();
        assert_eq!(
            resolve_voice(None, &config).unwrap(),
            tts::AZURE_DEFAULT_VOICE
        );

        config.ui.voice_name = "zh-CN-YunjianNeural-Male".into();
        assert_eq!(resolve_voice(None, &config).unwrap(), "zh-CN-YunjianNeural-Male");
        assert_eq!(
            resolve_voice(Some("en-US-JennyNeural-Female"), &config).unwrap(),
            "en-US-JennyNeural-Female"
        );
    }

    #[test]
    fn no_voice_and_no_credentials_is_rejected() {
        let err = resolve_voice(None, &AppConfig::default()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<MakerError>(),
            Some(MakerError::Validation(_))
        ));
    }

    #[test]
    fn default_output_follows_input_file() {
        let source = TextSource::File(PathBuf::from("/tmp/scripts/chapter1.txt"));
        assert_eq!(
            default_output_path(&source),
            PathBuf::from("/tmp/scripts/chapter1.mp3")
        );
        assert_eq!(
            default_output_path(&TextSource::Literal("hi".into())),
            PathBuf::from("output.mp3")
        );
    }

    #[test]
    fn missing_text_file_is_file_not_found() {
        let req = request(TextSource::File(PathBuf::from("/nonexistent/t.txt")), None);
        let err = req.read_text().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<MakerError>(),
            Some(MakerError::FileNotFound(_))
        ));
    }

    #[test]
    fn blank_text_is_rejected() {
        let req = request(TextSource::Literal("   \n".into()), None);
        assert!(req.read_text().is_err());
    }

    #[tokio::test]
    async fn writes_audio_and_creates_parent_directories() {
        let temp = tempdir().unwrap();
        let text_file = temp.path().join("input.txt");
        fs::write(&text_file, "  你好，世界。\n").unwrap();
        let output = temp.path().join("out").join("nested").join("speech.mp3");

        let provider = FakeTts::default();
        let probe = FakeProbe::default().with("speech.mp3", (0, 0), 1.5);
        let prepared = request(TextSource::File(text_file), Some(output.clone()))
            .prepare(&AppConfig::default())
            .unwrap();
        let outcome = make_voice(prepared, &provider, &probe)
        .await
        .unwrap();

        assert_eq!(outcome.output, output);
        assert_eq!(outcome.duration, Some(1.5));
        assert_eq!(fs::read_to_string(&output).unwrap(), "mp3:你好，世界。");
        let calls = provider.calls.lock().unwrap();
        assert_eq!(calls[0].1.voice_name, "zh-CN-YunxiNeural-Male");
    }

    #[tokio::test]
    async fn probe_failure_is_only_a_warning() {
        let temp = tempdir().unwrap();
        let output = temp.path().join("speech.mp3");
        let prepared = request(TextSource::Literal("hello".into()), Some(output.clone()))
            .prepare(&AppConfig::default())
            .unwrap();
        let outcome = make_voice(prepared, &FakeTts::default(), &FakeProbe::default())
            .await
            .unwrap();
        assert!(outcome.duration.is_none());
        assert!(output.exists());
    }

    #[test]
    fn invalid_rate_fails_before_reading_text() {
        let mut req = request(TextSource::File(PathBuf::from("/nonexistent/t.txt")), None);
        req.rate = 5.0;
        let err = req.prepare(&AppConfig::default()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<MakerError>(),
            Some(MakerError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn missing_file_is_reported_before_missing_credentials() {
        let args = VoiceArgs {
            input: crate::cli::VoiceInput {
                text: None,
                file: Some(PathBuf::from("/nonexistent/chapter.txt")),
            },
            voice_name: None,
            voice_rate: 1.0,
            voice_volume: 1.0,
            output: None,
        };

        let err = handle_voice_command(&args, &AppConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<MakerError>(),
            Some(MakerError::FileNotFound(_))
        ));
    }
}
