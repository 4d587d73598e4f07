//! Client side of the short-video generation service.

pub mod api;

use std::path::{Path, PathBuf};

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;

pub use api::ApiVideoGenerator;

use crate::video::params::VideoParams;

#[derive(Debug, Clone, Serialize)]
pub struct GeneratedVideo {
    pub task_id: String,
    pub videos: Vec<PathBuf>,
}

#[async_trait]
pub trait VideoGenerator: Send + Sync {
    /// Produce the videos for `params` inside `output_dir`.
    async fn generate(
        &self,
        task_id: &str,
        params: &VideoParams,
        output_dir: &Path,
    ) -> Result<GeneratedVideo>;
}
