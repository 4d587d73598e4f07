use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::AppConfig;

/// Expand `~` and environment variables in a user supplied path.
pub fn expand_path(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    match shellexpand::full(&raw) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(_) => path.to_path_buf(),
    }
}

/// Directory holding the per-user config file
pub fn user_config_dir() -> Result<PathBuf> {
    Ok(dirs::config_dir()
        .context("Unable to determine user config directory")?
        .join("vidmaker"))
}

/// Layout of the storage directory shared by all commands.
#[derive(Debug, Clone)]
pub struct Storage {
    root: PathBuf,
}

impl Storage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(expand_path(Path::new(&config.app.storage_dir)))
    }

    pub fn task_dir(&self, task_id: &str) -> PathBuf {
        self.root.join("tasks").join(task_id)
    }

    pub fn batch_dir(&self) -> PathBuf {
        self.root.join("batch")
    }

    pub fn long_materials_dir(&self) -> PathBuf {
        self.root.join("long").join("video_materials")
    }

    pub fn song_dir(&self) -> PathBuf {
        self.root.join("songs")
    }

    pub fn font_dir(&self) -> PathBuf {
        self.root.join("fonts")
    }

    pub fn ensure_dir(path: &Path) -> Result<()> {
        fs::create_dir_all(path)
            .with_context(|| format!("creating directory {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_is_rooted_at_storage_dir() {
        let storage = Storage::new("/data/storage");
        assert_eq!(
            storage.task_dir("20250101-000000-abcd"),
            PathBuf::from("/data/storage/tasks/20250101-000000-abcd")
        );
        assert_eq!(
            storage.long_materials_dir(),
            PathBuf::from("/data/storage/long/video_materials")
        );
        assert_eq!(storage.batch_dir(), PathBuf::from("/data/storage/batch"));
    }

    #[test]
    fn tilde_expands_to_home() {
        let expanded = expand_path(Path::new("~/videos"));
        assert!(!expanded.to_string_lossy().starts_with('~'));
        assert!(expanded.ends_with("videos"));
    }

    #[test]
    fn plain_paths_are_untouched() {
        assert_eq!(expand_path(Path::new("tasks/t1")), PathBuf::from("tasks/t1"));
    }
}
