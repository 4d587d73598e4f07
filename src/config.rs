use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::common::paths;

pub const CONFIG_ENV_VAR: &str = "VIDMAKER_CONFIG";
const CONFIG_FILE_NAME: &str = "config.toml";

/// Settings shared by every command, loaded once at startup.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub ui: UiSection,
    pub azure: AzureSection,
    pub siliconflow: SiliconFlowSection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppSection {
    /// Root for task directories, batch results, music and fonts
    pub storage_dir: String,
    /// Sent as `x-api-key` to the generation service
    pub api_key: String,
    pub generator_endpoint: String,
    pub generator_timeout_secs: u64,
    pub poll_interval_secs: u64,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            storage_dir: "storage".to_string(),
            api_key: String::new(),
            generator_endpoint: "http://127.0.0.1:8080".to_string(),
            generator_timeout_secs: 1800,
            poll_interval_secs: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UiSection {
    pub voice_name: String,
    pub voice_rate: f32,
    pub voice_volume: f32,
    pub font_name: String,
    pub font_size: u32,
    pub text_fore_color: String,
    pub subtitle_position: String,
    pub custom_position: f32,
    pub video_language: String,
    pub paragraph_number: u32,
}

impl Default for UiSection {
    fn default() -> Self {
        Self {
            voice_name: String::new(),
            voice_rate: 1.0,
            voice_volume: 1.0,
            font_name: "STHeitiMedium.ttc".to_string(),
            font_size: 60,
            text_fore_color: "#FFFFFF".to_string(),
            subtitle_position: "bottom".to_string(),
            custom_position: 70.0,
            video_language: String::new(),
            paragraph_number: 1,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AzureSection {
    pub speech_key: String,
    pub speech_region: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SiliconFlowSection {
    pub api_key: String,
}

fn non_empty(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

impl UiSection {
    pub fn voice_name(&self) -> Option<&str> {
        non_empty(&self.voice_name)
    }

    /// Rate from the config file, falling back to 1.0 for unusable values.
    pub fn voice_rate(&self) -> f32 {
        if self.voice_rate.is_finite() && self.voice_rate > 0.0 {
            self.voice_rate
        } else {
            1.0
        }
    }

    pub fn voice_volume(&self) -> f32 {
        if self.voice_volume.is_finite() && self.voice_volume > 0.0 {
            self.voice_volume
        } else {
            1.0
        }
    }
}

impl AzureSection {
    /// Key and region, only when both are set.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        Some((non_empty(&self.speech_key)?, non_empty(&self.speech_region)?))
    }
}

impl SiliconFlowSection {
    pub fn api_key(&self) -> Option<&str> {
        non_empty(&self.api_key)
    }
}

impl AppSection {
    pub fn api_key(&self) -> Option<&str> {
        non_empty(&self.api_key)
    }
}

impl AppConfig {
    /// Load from an explicit path or the first existing default location.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match resolve_config_path(explicit)? {
            Some(path) => Self::load_from_path(&path),
            None => Ok(Self::default()),
        }
    }

    /// Missing files yield defaults; a file that exists must parse.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        Self::from_toml_str(&contents)
            .with_context(|| format!("parsing config file {}", path.display()))
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents).context("parsing config")?;
        Ok(config)
    }
}

/// `--config` > `VIDMAKER_CONFIG` > `./config.toml` > user config dir.
fn resolve_config_path(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
    if let Some(path) = explicit {
        return Ok(Some(paths::expand_path(path)));
    }

    if let Some(value) = std::env::var_os(CONFIG_ENV_VAR)
        && !value.is_empty()
    {
        return Ok(Some(paths::expand_path(Path::new(&value))));
    }

    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.exists() {
        return Ok(Some(local));
    }

    let user = paths::user_config_dir()?.join(CONFIG_FILE_NAME);
    if user.exists() {
        return Ok(Some(user));
    }

    Ok(None)
}
