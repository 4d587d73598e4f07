//! Text-to-speech backends.
//!
//! The backend is chosen from the voice name: names starting with
//! `siliconflow:` go to SiliconFlow, everything else to Azure Speech.

pub mod azure;
pub mod siliconflow;
mod types;

use std::time::Duration;

use anyhow::Result;

pub use types::{ProviderKind, TtsProvider, VoiceSettings};

use crate::config::AppConfig;
use crate::error::MakerError;

pub const SILICONFLOW_PREFIX: &str = "siliconflow:";
pub const AZURE_DEFAULT_VOICE: &str = "zh-CN-XiaoyiNeural-Female";
pub const SILICONFLOW_DEFAULT_VOICE: &str = "siliconflow:FunAudioLLM/CosyVoice2-0.5B:alex-Male";

pub(crate) fn request_timeout() -> Duration {
    Duration::from_secs(120)
}

pub fn provider_kind(voice_name: &str) -> ProviderKind {
    if voice_name.trim_start().starts_with(SILICONFLOW_PREFIX) {
        ProviderKind::SiliconFlow
    } else {
        ProviderKind::Azure
    }
}

/// `zh-CN-XiaoyiNeural-Female` -> `zh-CN-XiaoyiNeural`
pub fn strip_gender_suffix(voice_name: &str) -> &str {
    let trimmed = voice_name.trim();
    trimmed
        .strip_suffix("-Female")
        .or_else(|| trimmed.strip_suffix("-Male"))
        .unwrap_or(trimmed)
}

/// Voice used when neither the command line nor `[ui].voice_name` names one.
pub fn default_voice(config: &AppConfig) -> Option<&'static str> {
    if config.azure.credentials().is_some() {
        Some(AZURE_DEFAULT_VOICE)
    } else if config.siliconflow.api_key().is_some() {
        Some(SILICONFLOW_DEFAULT_VOICE)
    } else {
        None
    }
}

/// Build the backend for `voice_name` from configured credentials.
pub fn create_provider(voice_name: &str, config: &AppConfig) -> Result<Box<dyn TtsProvider>> {
    match provider_kind(voice_name) {
        ProviderKind::Azure => {
            let (key, region) = config.azure.credentials().ok_or_else(|| {
                MakerError::Config(
                    "Azure voices need [azure].speech_key and [azure].speech_region".to_string(),
                )
            })?;
            Ok(Box::new(azure::AzureTts::new(key, region)?))
        }
        ProviderKind::SiliconFlow => {
            let key = config.siliconflow.api_key().ok_or_else(|| {
                MakerError::Config("SiliconFlow voices need [siliconflow].api_key".to_string())
            })?;
            siliconflow::parse_voice_name(voice_name)?;
            Ok(Box::new(siliconflow::SiliconFlowTts::new(key)?))
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_selects_siliconflow() {
        assert_eq!(provider_kind(SILICONFLOW_DEFAULT_VOICE), ProviderKind::SiliconFlow);
        assert_eq!(provider_kind(AZURE_DEFAULT_VOICE), ProviderKind::Azure);
        assert_eq!(provider_kind("en-US-JennyNeural-Female"), ProviderKind::Azure);
    }

    #[test]
    fn gender_suffix_is_stripped() {
        assert_eq!(strip_gender_suffix("zh-CN-YunxiNeural-Male"), "zh-CN-YunxiNeural");
        assert_eq!(strip_gender_suffix("zh-CN-XiaoyiNeural"), "zh-CN-XiaoyiNeural");
    }

    #[test]
    fn default_voice_prefers_azure_credentials() {
        let mut config = AppConfig::default();
        assert_eq!(default_voice(&config), None);

        config.siliconflow.api_key = "sk".into();
        assert_eq!(default_voice(&config), Some(SILICONFLOW_DEFAULT_VOICE));

        config.azure.speech_key = "key".into();
        config.azure.speech_region = "eastasia".into();
        assert_eq!(default_voice(&config), Some(AZURE_DEFAULT_VOICE));
    }

    #[test]
    fn missing_credentials_are_config_errors() {
        let config = AppConfig::default();
        for voice in [AZURE_DEFAULT_VOICE, SILICONFLOW_DEFAULT_VOICE] {
            let err = create_provider(voice, &config).err().unwrap();
            assert!(matches!(
                err.downcast_ref::<MakerError>(),
                Some(MakerError::Config(_))
            ));
        }
    }

    #[test]
    fn configured_provider_reports_its_name() {
        let mut config = AppConfig::default();
        config.siliconflow.api_key = "sk".into();
        let provider = create_provider(SILICONFLOW_DEFAULT_VOICE, &config).unwrap();
        assert_eq!(provider.name(), "siliconflow");
    }
}
