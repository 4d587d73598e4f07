use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;

/// Resolved voice, rate and volume for one synthesis request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VoiceSettings {
    pub voice_name: String,
    pub rate: f32,
    pub volume: f32,
}

impl VoiceSettings {
    pub fn new(voice_name: impl Into<String>, rate: f32, volume: f32) -> Self {
        Self {
            voice_name: voice_name.into(),
            rate,
            volume,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Azure,
    SiliconFlow,
}

/// Text-to-speech backend returning mp3 bytes
#[async_trait]
pub trait TtsProvider: Send + Sync {
    async fn synthesize(&self, text: &str, settings: &VoiceSettings) -> Result<Bytes>;

    /// Short name used in logs and error messages
    fn name(&self) -> &'static str;
}
