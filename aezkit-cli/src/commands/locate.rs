//! Reverse address search.

use aezkit_btc::{CancelToken, LocateOutcome, Locator};
use anyhow::{Context as _, Result};
use clap::Args;
use colored::Colorize;

use super::{Context, SeedArgs};
use crate::config::Source;

/// Find the derivation path of an address.
#[derive(Args)]
pub struct LocateCommand {
    #[command(flatten)]
    seed: SeedArgs,

    /// Address to look for.
    #[arg(short, long)]
    address: String,

    /// Indices searched per purpose and chain.
    #[arg(short, long)]
    limit: Option<u32>,

    /// Look the address up online afterwards.
    #[arg(long, value_enum)]
    source: Option<Source>,

    /// Search on one thread.
    #[arg(long)]
    sequential: bool,
}

impl LocateCommand {
    /// Execute the command.
    pub async fn execute(self, ctx: &Context) -> Result<()> {
        let (_, _, tree) = self.seed.open(ctx.network)?;
        let limit = self.limit.unwrap_or(ctx.config.search_limit);

        let cancel = CancelToken::new();
        let watcher = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    cancel.cancel();
                }
            })
        };

        let target = self.address.clone();
        let sequential = self.sequential;
        let outcome = tokio::task::spawn_blocking(move || {
            let locator = Locator::new(&tree).with_limit(limit).with_cancel_token(cancel);
            if sequential {
                locator.locate(&target)
            } else {
                locator.locate_parallel(&target)
            }
        })
        .await
        .context("search task failed")?;
        watcher.abort();

        let outcome = outcome?;
        print_outcome(&outcome, limit);

        let source = self.source.unwrap_or(ctx.config.source);
        if source == Source::Offline {
            return Ok(());
        }

        // The explorer can answer for any address, the node scan only for ours.
        let address = match (&outcome.found, source) {
            (Some(found), _) => found.address.to_string(),
            (None, Source::Esplora) => self.address.trim().to_string(),
            (None, _) => {
                println!("      {}", "The node lookup needs a located address.".yellow());
                println!();
                return Ok(());
            }
        };

        if let Some(oracle) = ctx.oracle(source).await? {
            let summary = oracle.check(&address).await;
            print_lookup(oracle.name(), &address, summary);
        }
        Ok(())
    }
}

#[rustfmt::skip]
fn print_outcome(outcome: &LocateOutcome, limit: u32) {
    println!();
    match &outcome.found {
        Some(found) => {
            println!("      {}      {}", "Address".cyan().bold(), found.address.to_string().green());
            println!("      {}         {}", "Path".cyan().bold(), found.coordinate);
            println!("      {}         {}", "Type".cyan().bold(), found.encoding());
            println!("      {}        {}", "Chain".cyan().bold(), found.coordinate.chain);
            println!("      {}        {}", "Index".cyan().bold(), found.coordinate.index);
        }
        None => {
            println!(
                "      {}",
                format!("Not found within the first {limit} indices of any purpose or chain.").yellow()
            );
        }
    }
    println!("      {}     {}", "Searched".cyan().bold(), outcome.searched);
    if !outcome.errors.is_empty() {
        println!("      {}       {}", "Errors".cyan().bold(), outcome.errors.len().to_string().red());
        for error in &outcome.errors {
            println!("        {}", error.to_string().red());
        }
    }
    println!();
}

#[rustfmt::skip]
fn print_lookup(
    oracle: &str,
    address: &str,
    summary: Result<aezkit_oracle::AddressSummary, aezkit_oracle::OracleError>,
) {
    println!("      {}       {}", "Source".cyan().bold(), oracle);
    match summary {
        Ok(summary) if summary.is_used() => {
            println!("      {}       {} {}", "Online".cyan().bold(), summary.to_string().green(), address.dimmed());
        }
        Ok(summary) => println!("      {}       {} {}", "Online".cyan().bold(), summary, address.dimmed()),
        Err(e) => println!("      {}       {}", "Online".cyan().bold(), e.to_string().red()),
    }
    println!();
}
