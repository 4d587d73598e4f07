use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use bytes::Bytes;
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::Client;
use reqwest::header::AUTHORIZATION;
use serde::Serialize;

use super::types::{TtsProvider, VoiceSettings};
use super::{SILICONFLOW_PREFIX, request_timeout};
use crate::error::MakerError;
use crate::ui::prelude::{Level, emit};

const SPEECH_URL: &str = "https://api.siliconflow.cn/v1/audio/speech";
const SAMPLE_RATE: u32 = 32000;

/// Model and voice parsed from a `siliconflow:` voice name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiliconFlowVoice {
    pub model: String,
    pub voice: String,
}

lazy_static! {
    // siliconflow:<model>:<voice>-<Gender>
    static ref VOICE_NAME: Result<Regex, regex::Error> =
        Regex::new(r"^siliconflow:([^:]+):(.+?)(?:-(?:Male|Female))?$");
}

pub fn parse_voice_name(voice_name: &str) -> Result<SiliconFlowVoice> {
    let re = VOICE_NAME
        .as_ref()
        .map_err(|err| anyhow!("compiling voice name pattern: {err}"))?;
    let caps = re.captures(voice_name.trim()).ok_or_else(|| {
        MakerError::Validation(format!(
            "SiliconFlow voice `{voice_name}` must look like {SILICONFLOW_PREFIX}<model>:<voice>-<Gender>"
        ))
    })?;
    let model = caps[1].to_string();
    let voice = format!("{}:{}", model, &caps[2]);
    Ok(SiliconFlowVoice { model, voice })
}

/// Linear volume as decibels, clamped to what the API accepts.
pub fn gain_db(volume: f32) -> f32 {
    if volume <= 0.0 {
        return -10.0;
    }
    (20.0 * volume.log10()).clamp(-10.0, 10.0)
}

#[derive(Debug, Serialize)]
pub struct SpeechRequest<'a> {
    pub model: &'a str,
    pub input: &'a str,
    pub voice: &'a str,
    pub response_format: &'static str,
    pub sample_rate: u32,
    pub stream: bool,
    pub speed: f32,
    pub gain: f32,
}

pub struct SiliconFlowTts {
    client: Client,
    api_key: String,
}

impl SiliconFlowTts {
    pub fn new(api_key: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(request_timeout())
            .build()
            .context("building HTTP client for SiliconFlow")?;
        Ok(Self {
            client,
            api_key: api_key.to_string(),
        })
    }
}

#[async_trait]
impl TtsProvider for SiliconFlowTts {
    async fn synthesize(&self, text: &str, settings: &VoiceSettings) -> Result<Bytes> {
        let voice = parse_voice_name(&settings.voice_name)?;
        let request = SpeechRequest {
            model: &voice.model,
            input: text,
            voice: &voice.voice,
            response_format: "mp3",
            sample_rate: SAMPLE_RATE,
            stream: false,
            speed: settings.rate,
            gain: gain_db(settings.volume),
        };

        emit(
            Level::Debug,
            "tts.siliconflow.request",
            &format!(
                "POST {SPEECH_URL} model={} voice={} speed={} gain={:.1}",
                request.model, request.voice, request.speed, request.gain
            ),
            None,
        );

        let resp = self
            .client
            .post(SPEECH_URL)
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .context("Failed to connect to SiliconFlow")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(MakerError::provider(self.name(), format!("HTTP {status}: {body}")).into());
        }

        resp.bytes()
            .await
            .context("Failed to read SiliconFlow audio")
    }

    fn name(&self) -> &'static str {
        "siliconflow"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn voice_name_splits_into_model_and_voice() {
        let voice = parse_voice_name("siliconflow:FunAudioLLM/CosyVoice2-0.5B:alex-Male").unwrap();
        assert_eq!(voice.model, "FunAudioLLM/CosyVoice2-0.5B");
        assert_eq!(voice.voice, "FunAudioLLM/CosyVoice2-0.5B:alex");
    }

    #[test]
    fn gender_suffix_is_optional() {
        let voice = parse_voice_name("siliconflow:FunAudioLLM/CosyVoice2-0.5B:bella").unwrap();
        assert_eq!(voice.voice, "FunAudioLLM/CosyVoice2-0.5B:bella");
    }

    #[test]
    fn repeated_parses_share_the_pattern() {
        for voice in ["alex-Male", "bella-Female", "claire"] {
            let name = format!("siliconflow:FunAudioLLM/CosyVoice2-0.5B:{voice}");
            let parsed = parse_voice_name(&name).unwrap();
            assert_eq!(parsed.model, "FunAudioLLM/CosyVoice2-0.5B");
            assert!(parsed.voice.ends_with(voice.trim_end_matches("-Male").trim_end_matches("-Female")));
        }
        assert!(parse_voice_name("siliconflow:").is_err());
    }

    #[test]
    fn malformed_voice_name_is_rejected() {
        let err = parse_voice_name("siliconflow:only-model").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<MakerError>(),
            Some(MakerError::Validation(_))
        ));
    }

    #[test]
    fn volume_maps_to_clamped_decibels() {
        assert_eq!(gain_db(1.0), 0.0);
        assert!((gain_db(2.0) - 6.0206).abs() < 0.01);
        assert_eq!(gain_db(5.0), 10.0);
        assert!((gain_db(0.6) - (-4.437)).abs() < 0.01);
    }

    #[test]
    fn request_body_has_service_fields() {
        let request = SpeechRequest {
            model: "m",
            input: "hello",
            voice: "m:alex",
            response_format: "mp3",
            sample_rate: SAMPLE_RATE,
            stream: false,
            speed: 1.25,
            gain: 0.0,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["sample_rate"], 32000);
        assert_eq!(json["stream"], false);
        assert_eq!(json["response_format"], "mp3");
        assert_eq!(json["speed"], 1.25);
    }
}
