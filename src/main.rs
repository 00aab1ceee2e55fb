use clap::{CommandFactory, FromArgMatches};
use idefetch::cli::{Cli, CommandHandler};
use std::process;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli =
        Cli::from_arg_matches(&Cli::command().get_matches()).expect("Failed to parse arguments");

    let handler = match CommandHandler::new() {
        Ok(handler) => handler,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };

    if let Err(e) = handler.handle_command(cli.command, cli.json).await {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
