//! Tether CLI binary entry point.

use clap::Parser;
use tether::cli::{handle_chat, handle_skills, load_config, Cli, Commands};
use tether::logging::init_tracing;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };
    init_tracing(&config.logging);

    let result = match cli.command {
        Commands::Chat(args) => handle_chat(&config, args).await,
        Commands::Skills => handle_skills(&config),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
