use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Command, CommandFactory, ValueEnum};
use clap_complete::Shell;

use crate::cli::{BatchArgs, GlobalArgs, LongArgs, VidmakerCli, VoiceArgs};
use crate::error::MakerError;

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum SupportedShell {
    Bash,
    Zsh,
    Fish,
}

/// Binaries shipped by this package.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, ValueEnum)]
pub enum Tool {
    #[default]
    Vidmaker,
    BatchVideoMaker,
    LongVideoMaker,
    VoiceMaker,
}

impl Tool {
    pub fn bin_name(self) -> &'static str {
        match self {
            Tool::Vidmaker => "vidmaker",
            Tool::BatchVideoMaker => "batch_video_maker",
            Tool::LongVideoMaker => "long_video_maker",
            Tool::VoiceMaker => "voice_maker",
        }
    }

    fn command(self) -> Command {
        let standalone = |args: fn(Command) -> Command| {
            args(GlobalArgs::augment_args(Command::new(self.bin_name())))
        };
        match self {
            Tool::Vidmaker => VidmakerCli::command(),
            Tool::BatchVideoMaker => standalone(BatchArgs::augment_args),
            Tool::LongVideoMaker => standalone(LongArgs::augment_args),
            Tool::VoiceMaker => standalone(VoiceArgs::augment_args),
        }
    }
}

impl SupportedShell {
    fn clap_shell(self) -> Shell {
        match self {
            SupportedShell::Bash => Shell::Bash,
            SupportedShell::Zsh => Shell::Zsh,
            SupportedShell::Fish => Shell::Fish,
        }
    }

    fn script_name(self, tool: Tool) -> String {
        match self {
            SupportedShell::Bash => format!("{}.bash", tool.bin_name()),
            SupportedShell::Zsh => format!("_{}", tool.bin_name()),
            SupportedShell::Fish => format!("{}.fish", tool.bin_name()),
        }
    }
}

impl fmt::Display for SupportedShell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SupportedShell::Bash => "bash",
            SupportedShell::Zsh => "zsh",
            SupportedShell::Fish => "fish",
        };
        f.write_str(name)
    }
}

#[derive(clap::Subcommand, Debug, Clone)]
pub enum CompletionCommands {
    /// Print the completion script to stdout
    Generate {
        #[arg(value_enum)]
        shell: SupportedShell,
        /// Binary to complete
        #[arg(long, value_enum, default_value_t = Tool::Vidmaker)]
        tool: Tool,
    },
    /// Write the completion script to the user data directory
    Install {
        #[arg(value_enum)]
        shell: SupportedShell,
        /// Binary to complete
        #[arg(long, value_enum, default_value_t = Tool::Vidmaker)]
        tool: Tool,
        /// Write here instead of the data directory
        #[arg(long)]
        output: Option<PathBuf>,
        /// Replace an existing script
        #[arg(long)]
        force: bool,
    },
}

pub fn generate(shell: SupportedShell, tool: Tool) -> Result<String> {
    let mut command = tool.command();
    let mut script = Vec::new();
    clap_complete::generate(shell.clap_shell(), &mut command, tool.bin_name(), &mut script);
    String::from_utf8(script).context("completion script is not UTF-8")
}

fn default_install_dir() -> PathBuf {
    dirs::data_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".local").join("share")))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("vidmaker")
        .join("completions")
}

pub fn install(
    shell: SupportedShell,
    tool: Tool,
    output: Option<PathBuf>,
    force: bool,
) -> Result<PathBuf> {
    let target = output.unwrap_or_else(|| default_install_dir().join(shell.script_name(tool)));
    if target.exists() && !force {
        return Err(MakerError::Validation(format!(
            "{} already exists; pass --force to replace it",
            target.display()
        ))
        .into());
    }

    let script = generate(shell, tool)?;
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    fs::write(&target, script).with_context(|| format!("writing {}", target.display()))?;
    Ok(target)
}

/// How to load an installed script into the shell.
pub fn instructions(shell: SupportedShell, installed: &Path) -> String {
    match shell {
        SupportedShell::Bash => format!(
            "Load it from ~/.bashrc:\n  source \"{}\"",
            installed.display()
        ),
        SupportedShell::Zsh => {
            let dir = installed.parent().unwrap_or(installed);
            format!(
                "Add the directory to fpath in ~/.zshrc before compinit:\n  fpath=(\"{}\" $fpath)",
                dir.display()
            )
        }
        SupportedShell::Fish => format!(
            "Link it into fish's completion directory:\n  ln -s \"{}\" ~/.config/fish/completions/",
            installed.display()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn umbrella_script_mentions_subcommands() {
        let script = generate(SupportedShell::Bash, Tool::Vidmaker).unwrap();
        assert!(script.contains("vidmaker"));
        assert!(script.contains("voice"));
    }

    #[test]
    fn standalone_tool_scripts_complete_their_flags() {
        let script = generate(SupportedShell::Fish, Tool::VoiceMaker).unwrap();
        assert!(script.contains("voice_maker"));
        assert!(script.contains("voice-rate"));

        let script = generate(SupportedShell::Zsh, Tool::LongVideoMaker).unwrap();
        assert!(script.contains("task-path"));
    }

    #[test]
    fn script_names_follow_shell_conventions() {
        assert_eq!(SupportedShell::Zsh.script_name(Tool::BatchVideoMaker), "_batch_video_maker");
        assert_eq!(SupportedShell::Bash.script_name(Tool::Vidmaker), "vidmaker.bash");
    }

    #[test]
    fn install_refuses_to_overwrite_without_force() {
        let temp = tempdir().unwrap();
        let target = temp.path().join("nested").join("_vidmaker");
        install(SupportedShell::Zsh, Tool::Vidmaker, Some(target.clone()), false).unwrap();
        assert!(install(SupportedShell::Zsh, Tool::Vidmaker, Some(target.clone()), false).is_err());
        assert!(install(SupportedShell::Zsh, Tool::Vidmaker, Some(target), true).is_ok());
    }
}
