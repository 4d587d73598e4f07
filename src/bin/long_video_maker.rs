use std::process::ExitCode;

use clap::Parser;

use vidmaker::cli::{Commands, GlobalArgs, LongArgs};

/// Assemble a 1920x1080 video from a task directory's script and local materials
#[derive(Parser, Debug)]
#[command(name = "long_video_maker", version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(flatten)]
    args: LongArgs,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    vidmaker::app::run(Commands::Long(cli.args), cli.global).await
}
