use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use rand::seq::SliceRandom;

use crate::common::paths::expand_path;

/// Picks the background track for a composition.
pub struct MusicResolver {
    song_dir: PathBuf,
}

impl MusicResolver {
    pub fn new(song_dir: &Path) -> Self {
        Self {
            song_dir: song_dir.to_path_buf(),
        }
    }

    /// `bgm_type` is `""` (no music), `"random"` (any mp3 in the song
    /// directory) or anything else, in which case `bgm_file` must exist.
    pub fn resolve(&self, bgm_type: &str, bgm_file: &str) -> Result<Option<PathBuf>> {
        match bgm_type.trim() {
            "" => Ok(None),
            "random" => self.random_song(),
            _ => {
                let trimmed = bgm_file.trim();
                if trimmed.is_empty() {
                    bail!("Background music type `{bgm_type}` requires a bgm file");
                }
                let path = expand_path(Path::new(trimmed));
                if !path.exists() {
                    bail!("Music file {} does not exist", path.display());
                }
                Ok(Some(path))
            }
        }
    }

    pub fn available_songs(&self) -> Result<Vec<PathBuf>> {
        let pattern = self.song_dir.join("*.mp3");
        let pattern = pattern.to_string_lossy();
        let mut songs = glob::glob(&pattern)
            .with_context(|| format!("Invalid music pattern {pattern}"))?
            .filter_map(|entry| entry.ok())
            .filter(|path| path.is_file())
            .collect::<Vec<_>>();
        songs.sort();
        Ok(songs)
    }

    fn random_song(&self) -> Result<Option<PathBuf>> {
        let songs = self.available_songs()?;
        Ok(songs.choose(&mut rand::thread_rng()).cloned())
    }
}
