use std::process::ExitCode;

use clap::Parser;

use vidmaker::cli::VidmakerCli;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = VidmakerCli::parse();
    vidmaker::app::run(cli.command, cli.global).await
}
