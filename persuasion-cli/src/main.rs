use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod cli;
mod commands;
mod config;
mod context;
mod output;

use cli::{Cli, Commands, LogFormat};
use context::Context;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_format);

    let ctx = Context::new(&cli)?;

    match cli.command {
        Commands::Analyze(args) => commands::analyze::execute(&ctx, args),
        Commands::Blocks(args) => commands::blocks::execute(&ctx, args),
        Commands::Medians(args) => commands::medians::execute(&ctx, args),
        Commands::Regression(args) => commands::regression::execute(&ctx, args),
    }
}

/// Logs go to stderr; `RUST_LOG` replaces the default filter.
fn init_tracing(verbose: bool, format: LogFormat) {
    let default_filter = if verbose { "persuasion=debug" } else { "persuasion=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into());

    let (text, json) = match format {
        LogFormat::Text => (
            Some(tracing_subscriber::fmt::layer().with_writer(std::io::stderr)),
            None,
        ),
        LogFormat::Json => (
            None,
            Some(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr)),
        ),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(text)
        .with(json)
        .init();
}
