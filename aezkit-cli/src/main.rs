//! aezkit - enciphered wallet seeds and Bitcoin addresses from the terminal.
//!
//! Create and decode 24-word cipher seeds, list their BIP44/49/84/86
//! addresses, find where an address came from and check addresses online.

mod commands;
mod config;

use anyhow::Result;
use clap::Parser;
use commands::{Cli, Commands, Context};
use tracing::Level;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(&cli.log_level, &cli.log_format);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let ctx = Context::resolve(&cli)?;
    match cli.command {
        Commands::New(cmd) => cmd.execute(&ctx)?,
        Commands::Show(cmd) => cmd.execute(&ctx)?,
        Commands::Xpub(cmd) => cmd.execute(&ctx)?,
        Commands::Passwd(cmd) => cmd.execute()?,
        Commands::Locate(cmd) => cmd.execute(&ctx).await?,
        Commands::Verify(cmd) => cmd.execute(&ctx).await?,
        Commands::Config => ctx.print_config()?,
    }
    Ok(())
}

fn init_tracing(log_level: &str, log_format: &str) {
    let level = match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    match log_format {
        "json" => subscriber.json().init(),
        _ => subscriber.init(),
    }
}
