use std::path::{Path, PathBuf};

use crate::common::paths::Storage;
use crate::config::UiSection;

/// Title text drawn over the opening seconds of a composed video.
#[derive(Debug, Clone)]
pub struct TitleCard {
    pub text: String,
    pub duration: f64,
    pub font_file: Option<PathBuf>,
    pub font_size: u32,
    pub color: String,
}

impl TitleCard {
    pub fn new(text: &str, duration: f64, ui: &UiSection, storage: &Storage) -> Self {
        Self {
            text: text.trim().to_string(),
            duration,
            font_file: resolve_font(&storage.font_dir(), &ui.font_name),
            font_size: ui.font_size.max(1),
            color: ffmpeg_color(&ui.text_fore_color),
        }
    }

    pub fn is_visible(&self) -> bool {
        !self.text.is_empty() && self.duration > 0.0
    }

    /// `drawtext` filter centering the title in a dark box for `duration` seconds.
    pub fn drawtext_filter(&self) -> String {
        let mut parts = Vec::new();
        if let Some(font) = &self.font_file {
            parts.push(format!("fontfile='{}'", escape_filter_path(font)));
        }
        parts.push(format!("text='{}'", escape_drawtext(&self.text)));
        parts.push(format!("fontsize={}", self.font_size));
        parts.push(format!("fontcolor={}", self.color));
        parts.push("box=1".to_string());
        parts.push("boxcolor=black@0.5".to_string());
        parts.push("boxborderw=20".to_string());
        parts.push("x=(w-text_w)/2".to_string());
        parts.push("y=(h-text_h)/2".to_string());
        parts.push(format!("enable='between(t,0,{})'", format_seconds(self.duration)));
        format!("drawtext={}", parts.join(":"))
    }
}

fn resolve_font(font_dir: &Path, font_name: &str) -> Option<PathBuf> {
    let name = font_name.trim();
    if name.is_empty() {
        return None;
    }
    let candidate = font_dir.join(name);
    candidate.is_file().then_some(candidate)
}

/// `#RRGGBB` becomes `0xRRGGBB`; named colors pass through.
fn ffmpeg_color(value: &str) -> String {
    let trimmed = value.trim();
    match trimmed.strip_prefix('#') {
        Some(hex) if hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit()) => {
            format!("0x{}", hex.to_ascii_uppercase())
        }
        _ if trimmed.is_empty() => "white".to_string(),
        _ => trimmed.to_string(),
    }
}

/// Escape for the three levels drawtext text goes through: filter graph,
/// option value and text expansion.
fn escape_drawtext(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' => escaped.push_str("\\\\\\\\"),
            '\'' => escaped.push('\u{2019}'),
            ':' => escaped.push_str("\\:"),
            '%' => escaped.push_str("\\\\%"),
            '\n' | '\r' => escaped.push(' '),
            _ => escaped.push(ch),
        }
    }
    escaped
}

fn escape_filter_path(path: &Path) -> String {
    path.to_string_lossy()
        .replace('\\', "/")
        .replace(':', "\\:")
        .replace('\'', "")
}

pub(crate) fn format_seconds(value: f64) -> String {
    let formatted = format!("{value:.3}");
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    trimmed.to_string()
}
