use std::io::IsTerminal;
use std::process::ExitCode;

use anyhow::{Context, Result};

use crate::cli::{Commands, GlobalArgs};
use crate::completions::{self, CompletionCommands};
use crate::config::AppConfig;
use crate::error::exit_code_for;
use crate::ui::{self, prelude::*};

/// Entry point shared by every binary: set up output, load config once, dispatch.
pub async fn run(command: Commands, global: GlobalArgs) -> ExitCode {
    ui::init(global.format, std::io::stdout().is_terminal());
    ui::set_debug_mode(global.debug);

    match dispatch(command, &global).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            emit(Level::Error, "vidmaker.error", &format!("{err:#}"), None);
            ExitCode::from(exit_code_for(&err) as u8)
        }
    }
}

async fn dispatch(command: Commands, global: &GlobalArgs) -> Result<()> {
    if let Commands::Completions { command } = command {
        return handle_completions(command);
    }

    let config = AppConfig::load(global.config.as_deref()).context("loading configuration")?;
    emit(
        Level::Debug,
        "vidmaker.config",
        &format!("Storage directory: {}", config.app.storage_dir),
        None,
    );

    match command {
        Commands::Batch(args) => crate::batch::handle_batch_command(&args, &config)
            .await
            .with_context(|| format!("processing titles from {}", args.file.display())),
        Commands::Long(args) => crate::long_video::handle_long_command(&args, &config)
            .await
            .with_context(|| format!("assembling long video in {}", args.task_path.display())),
        Commands::Voice(args) => crate::voice::handle_voice_command(&args, &config).await,
        Commands::Completions { .. } => Ok(()),
    }
}

fn handle_completions(command: CompletionCommands) -> Result<()> {
    match command {
        CompletionCommands::Generate { shell, tool } => {
            print!("{}", completions::generate(shell, tool)?);
        }
        CompletionCommands::Install {
            shell,
            tool,
            output,
            force,
        } => {
            let path = completions::install(shell, tool, output, force)?;
            emit(
                Level::Success,
                "completions.installed",
                &format!(
                    "Installed {shell} completions for {} to {}",
                    tool.bin_name(),
                    path.display()
                ),
                None,
            );
            emit(
                Level::Info,
                "completions.instructions",
                &completions::instructions(shell, &path),
                None,
            );
        }
    }
    Ok(())
}
