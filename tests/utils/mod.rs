use anyhow::Result;
use std::process::Command;

use super::common::TestEnvironment;

pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

pub enum Binary {
    Vidmaker,
    BatchVideoMaker,
    LongVideoMaker,
    VoiceMaker,
}

impl Binary {
    fn path(&self) -> &'static str {
        match self {
            Binary::Vidmaker => env!("CARGO_BIN_EXE_vidmaker"),
            Binary::BatchVideoMaker => env!("CARGO_BIN_EXE_batch_video_maker"),
            Binary::LongVideoMaker => env!("CARGO_BIN_EXE_long_video_maker"),
            Binary::VoiceMaker => env!("CARGO_BIN_EXE_voice_maker"),
        }
    }
}

/// Run a binary inside the test environment with its config file.
pub fn run_command(env: &TestEnvironment, binary: Binary, args: &[&str]) -> Result<CommandOutput> {
    let config = env.config_path();
    let output = Command::new(binary.path())
        .args(args)
        .arg("--config")
        .arg(&config)
        .current_dir(env.path())
        .env_remove("VIDMAKER_CONFIG")
        .env("NO_COLOR", "1")
        .output()?;

    Ok(CommandOutput {
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        exit_code: output.status.code().unwrap_or(-1),
    })
}
