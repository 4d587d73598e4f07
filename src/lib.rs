//! Command-line tools for producing videos and narration:
//! batch short videos through a generation service, long landscape videos
//! assembled locally with ffmpeg, and text-to-speech through Azure or
//! SiliconFlow.

pub mod app;
pub mod batch;
pub mod cli;
pub mod common;
pub mod completions;
pub mod config;
pub mod error;
pub mod generator;
pub mod long_video;
pub mod tts;
pub mod ui;
pub mod video;
pub mod voice;

pub use config::AppConfig;
pub use error::MakerError;
