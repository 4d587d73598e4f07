use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;

use super::types::{TtsProvider, VoiceSettings};
use super::{request_timeout, strip_gender_suffix};
use crate::error::MakerError;
use crate::ui::prelude::{Level, emit};

const OUTPUT_FORMAT: &str = "audio-24khz-48kbitrate-mono-mp3";

pub struct AzureTts {
    client: Client,
    speech_key: String,
    region: String,
}

impl AzureTts {
    pub fn new(speech_key: &str, region: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(request_timeout())
            .build()
            .context("building HTTP client for Azure Speech")?;
        Ok(Self {
            client,
            speech_key: speech_key.to_string(),
            region: region.to_string(),
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "https://{}.tts.speech.microsoft.com/cognitiveservices/v1",
            self.region
        )
    }
}

#[async_trait]
impl TtsProvider for AzureTts {
    async fn synthesize(&self, text: &str, settings: &VoiceSettings) -> Result<Bytes> {
        let ssml = build_ssml(text, settings);
        emit(
            Level::Debug,
            "tts.azure.request",
            &format!("POST {} ({} bytes of SSML)", self.endpoint(), ssml.len()),
            None,
        );

        let resp = self
            .client
            .post(self.endpoint())
            .header("Ocp-Apim-Subscription-Key", &self.speech_key)
            .header(CONTENT_TYPE, "application/ssml+xml")
            .header("X-Microsoft-OutputFormat", OUTPUT_FORMAT)
            .header("User-Agent", concat!("vidmaker/", env!("CARGO_PKG_VERSION")))
            .body(ssml)
            .send()
            .await
            .context("Failed to connect to Azure Speech")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(MakerError::provider(self.name(), format!("HTTP {status}: {body}")).into());
        }

        resp.bytes()
            .await
            .context("Failed to read Azure Speech audio")
    }

    fn name(&self) -> &'static str {
        "azure"
    }
}

/// SSML document for one request.
pub fn build_ssml(text: &str, settings: &VoiceSettings) -> String {
    let voice = strip_gender_suffix(&settings.voice_name);
    format!(
        "<speak version=\"1.0\" xmlns=\"http://www.w3.org/2001/10/synthesis\" xml:lang=\"{lang}\">\
<voice name=\"{voice}\"><prosody rate=\"{rate}\" volume=\"{volume}\">{text}</prosody></voice></speak>",
        lang = language_of(voice),
        voice = escape_xml(voice),
        rate = relative_percent(settings.rate),
        volume = relative_percent(settings.volume),
        text = escape_xml(text),
    )
}

/// `zh-CN-XiaoyiNeural` -> `zh-CN`
fn language_of(voice: &str) -> String {
    let parts: Vec<&str> = voice.split('-').take(2).collect();
    if parts.len() == 2 {
        parts.join("-")
    } else {
        "en-US".to_string()
    }
}

/// 1.0 -> `+0%`, 1.5 -> `+50%`, 0.8 -> `-20%`
fn relative_percent(value: f32) -> String {
    let percent = ((value - 1.0) * 100.0).round() as i32;
    format!("{percent:+}%")
}

fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
