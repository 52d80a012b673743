//! Lumen CLI - Lighting Profile Manager
//!
//! Command-line interface for the profiles of a lighting context.

use anyhow::Context;
use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use lumen::cli::{commands, Cli, Commands};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    debug!("Lumen v{}", env!("CARGO_PKG_VERSION"));

    let config = cli
        .context_config()
        .context("invalid context configuration")?;
    let context_id = config.id.clone();

    handle_command(cli.command, config)
        .with_context(|| format!("command failed for context '{}'", context_id))
}

fn handle_command(cmd: Commands, config: lumen::ContextConfig) -> lumen::Result<()> {
    match cmd {
        Commands::List => commands::list(config),
        Commands::Show { profile } => commands::show(config, &profile),
        Commands::Add { name } => commands::add(config, &name),
        Commands::Delete { profile } => commands::delete(config, &profile),
        Commands::Switch { profile } => commands::switch(config, &profile),
        Commands::Reset { profile } => commands::reset(config, &profile),
        Commands::AddLayer {
            profile,
            tag,
            overlay,
            name,
        } => commands::add_layer(config, &profile, &tag, overlay, name.as_deref()),
        Commands::Import { path } => commands::import(config, &path),
        Commands::Tags => commands::tags(config),
        Commands::Check => commands::check(config),
    }
}
