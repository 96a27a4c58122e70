mod cli;
mod commands;
mod report;

use anyhow::{Context as _, Result};
use clap::Parser;
use tabata_config::ConfigLoader;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use commands::Context;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_dir = cli
        .config_dir
        .clone()
        .unwrap_or_else(ConfigLoader::default_config_dir);
    let config = ConfigLoader::new(&config_dir)
        .load()
        .with_context(|| format!("failed to load config from {}", config_dir.display()))?;

    let level = cli.log_level.as_deref().unwrap_or(&config.log.level);
    init_tracing(level, config.log.json);

    let ctx = Context { config_dir, config };
    match &cli.command {
        Commands::Migrate(args) => commands::migrate(&ctx, args),
        Commands::Status(args) => commands::status(&ctx, args),
        Commands::Sessions(command) => commands::sessions(&ctx, command),
        Commands::History(command) => commands::history(&ctx, command),
        Commands::Progress(command) => commands::progress(&ctx, *command),
    }
}

/// RUST_LOG, when set, takes precedence over `level`.
fn init_tracing(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
