use std::process::ExitCode;

use clap::Parser;

use vidmaker::cli::{Commands, GlobalArgs, VoiceArgs};

/// Convert text to speech with Azure or SiliconFlow voices
#[derive(Parser, Debug)]
#[command(name = "voice_maker", version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(flatten)]
    args: VoiceArgs,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    vidmaker::app::run(Commands::Voice(cli.args), cli.global).await
}
