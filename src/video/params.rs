use serde::{Deserialize, Serialize};

use crate::config::UiSection;
use crate::tts::AZURE_DEFAULT_VOICE;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum VideoAspect {
    #[default]
    #[serde(rename = "9:16")]
    Portrait,
    #[serde(rename = "16:9")]
    Landscape,
    #[serde(rename = "1:1")]
    Square,
}

impl VideoAspect {
    pub fn resolution(self) -> (u32, u32) {
        match self {
            VideoAspect::Portrait => (1080, 1920),
            VideoAspect::Landscape => (1920, 1080),
            VideoAspect::Square => (1080, 1080),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConcatMode {
    #[default]
    Random,
    Sequential,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TransitionMode {
    #[serde(rename = "None")]
    None,
    FadeIn,
    FadeOut,
    SlideIn,
    SlideOut,
    Shuffle,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MaterialInfo {
    pub provider: String,
    pub url: String,
    pub duration: u32,
}

impl MaterialInfo {
    pub fn local(url: impl Into<String>) -> Self {
        Self {
            provider: "local".to_string(),
            url: url.into(),
            duration: 0,
        }
    }
}

/// Parameters for one video, in the shape the generation service expects.
///
/// The long-video assembler reads the same struct for local composition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoParams {
    pub video_subject: String,
    pub video_script: String,
    pub video_aspect: VideoAspect,
    pub video_concat_mode: ConcatMode,
    pub video_transition_mode: Option<TransitionMode>,
    pub video_clip_duration: u32,
    pub video_count: u32,
    pub video_source: String,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub video_materials: Vec<MaterialInfo>,
    pub video_language: String,
    pub voice_name: String,
    pub voice_volume: f32,
    pub voice_rate: f32,
    pub bgm_type: String,
    pub bgm_file: String,
    pub bgm_volume: f32,
    pub subtitle_enabled: bool,
    pub subtitle_position: String,
    pub custom_position: f32,
    pub font_name: String,
    pub text_fore_color: String,
    pub font_size: u32,
    pub stroke_color: String,
    pub stroke_width: f32,
    pub n_threads: u32,
    pub paragraph_number: u32,
    #[serde(skip)]
    pub title_duration: f64,
}

impl VideoParams {
    /// Portrait short video for one title; script writing is left to the service.
    pub fn short_form(subject: &str, ui: &UiSection) -> Self {
        Self {
            video_subject: subject.to_string(),
            video_script: String::new(),
            video_aspect: VideoAspect::Portrait,
            video_concat_mode: ConcatMode::Random,
            video_transition_mode: None,
            video_clip_duration: 5,
            video_count: 1,
            video_source: "pexels".to_string(),
            video_materials: Vec::new(),
            video_language: ui.video_language.clone(),
            voice_name: ui.voice_name().unwrap_or(AZURE_DEFAULT_VOICE).to_string(),
            voice_volume: ui.voice_volume(),
            voice_rate: ui.voice_rate(),
            bgm_type: "random".to_string(),
            bgm_file: String::new(),
            bgm_volume: 0.2,
            subtitle_enabled: true,
            subtitle_position: ui.subtitle_position.clone(),
            custom_position: ui.custom_position,
            font_name: ui.font_name.clone(),
            text_fore_color: ui.text_fore_color.clone(),
            font_size: ui.font_size,
            stroke_color: "#000000".to_string(),
            stroke_width: 1.5,
            n_threads: 2,
            paragraph_number: ui.paragraph_number.max(1),
            title_duration: 0.0,
        }
    }

    /// Landscape long video assembled from local materials.
    pub fn long_form(subject: &str, materials: Vec<MaterialInfo>, ui: &UiSection) -> Self {
        Self {
            video_aspect: VideoAspect::Landscape,
            video_concat_mode: ConcatMode::Sequential,
            video_transition_mode: Some(TransitionMode::FadeIn),
            video_clip_duration: 10,
            video_source: "local".to_string(),
            video_materials: materials,
            bgm_volume: 0.1,
            n_threads: 8,
            title_duration: 2.0,
            ..Self::short_form(subject, ui)
        }
    }

    pub fn resolution(&self) -> (u32, u32) {
        self.video_aspect.resolution()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_form_uses_fixed_landscape_parameters() {
        let params = VideoParams::long_form("标题", Vec::new(), &UiSection::default());
        assert_eq!(params.resolution(), (1920, 1080));
        assert_eq!(params.video_clip_duration, 10);
        assert_eq!(params.video_transition_mode, Some(TransitionMode::FadeIn));
        assert_eq!(params.video_concat_mode, ConcatMode::Sequential);
        assert_eq!(params.title_duration, 2.0);
        assert_eq!(params.bgm_volume, 0.1);
    }

    #[test]
    fn short_form_falls_back_to_default_voice() {
        let params = VideoParams::short_form("A", &UiSection::default());
        assert_eq!(params.voice_name, AZURE_DEFAULT_VOICE);
        assert_eq!(params.video_subject, "A");
    }

    #[test]
    fn serializes_service_field_names() {
        let params = VideoParams::short_form("A", &UiSection::default());
        let json = serde_json::to_value(&params).unwrap();
        assert_eq!(json["video_aspect"], "9:16");
        assert_eq!(json["video_concat_mode"], "random");
        assert!(json["video_transition_mode"].is_null());
        assert!(json.get("video_materials").is_none());
        assert!(json.get("title_duration").is_none());
    }

    #[test]
    fn transition_names_match_service() {
        let json = serde_json::to_string(&TransitionMode::FadeIn).unwrap();
        assert_eq!(json, "\"FadeIn\"");
    }
}
