use anyhow::{Context, Result};
use clap::Parser;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod config;
mod context;
mod engine;
mod models;
mod store;
mod utils;

use cli::{Cli, Commands};
use config::{Config, LoggingConfig};
use context::AppContext;

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
/// The returned guard flushes the file writer on drop.
fn init_logging(logging: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .with_context(|| format!("Invalid log level: {}", logging.level))?;

    match &logging.file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| std::path::Path::new("."));
            let file_name = path
                .file_name()
                .with_context(|| format!("Log file path has no file name: {:?}", path))?;
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory: {:?}", dir))?;

            let appender = tracing_appender::rolling::never(dir, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .init();
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
            Ok(None)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.clone())?;
    let _log_guard = init_logging(&config.logging)?;

    let ctx = AppContext::open(config).await?;

    match cli.command {
        Commands::Init(args) => commands::init::execute(&ctx, cli.config, args).await,
        Commands::Experts(args) => commands::experts::execute(&ctx, args).await,
        Commands::Expert(command) => commands::expert::execute(&ctx, command).await,
        Commands::Check(args) => commands::check::execute(&ctx, args).await,
        Commands::Book(args) => commands::book::execute(&ctx, args).await,
        Commands::Edit(args) => commands::edit::execute(&ctx, args).await,
        Commands::Cancel(args) => commands::cancel::execute(&ctx, args).await,
        Commands::Advance(args) => commands::advance::execute(&ctx, args).await,
        Commands::Show(args) => commands::show::execute(&ctx, args).await,
        Commands::List(args) => commands::list::execute(&ctx, args).await,
        Commands::History(args) => commands::history::execute(&ctx, args).await,
    }
}
