use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Scratch working directory with its own config and storage.
pub struct TestEnvironment {
    temp_dir: TempDir,
}

impl TestEnvironment {
    pub fn new() -> Result<Self> {
        let env = Self {
            temp_dir: tempfile::tempdir()?,
        };
        env.write_config("")?;
        Ok(env)
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn config_path(&self) -> PathBuf {
        self.path().join("vidmaker.toml")
    }

    pub fn storage(&self) -> PathBuf {
        self.path().join("storage")
    }

    /// Config with storage inside the temp dir plus any extra TOML.
    pub fn write_config(&self, extra: &str) -> Result<()> {
        let storage = self.storage().to_string_lossy().replace('\\', "/");
        let contents = format!("[app]\nstorage_dir = \"{storage}\"\n\n{extra}");
        fs::write(self.config_path(), contents)?;
        Ok(())
    }

    pub fn write_file(&self, relative: &str, contents: &str) -> Result<PathBuf> {
        let path = self.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, contents)?;
        Ok(path)
    }
}
