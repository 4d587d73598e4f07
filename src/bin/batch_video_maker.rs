use std::process::ExitCode;

use clap::Parser;

use vidmaker::cli::{BatchArgs, Commands, GlobalArgs};

/// Generate one short video per title in a text file
#[derive(Parser, Debug)]
#[command(name = "batch_video_maker", version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(flatten)]
    args: BatchArgs,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    vidmaker::app::run(Commands::Batch(cli.args), cli.global).await
}
