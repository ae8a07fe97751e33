//! Online verification of an address page.

use aezkit_btc::{AddressFactory, Chain, Purpose};
use aezkit_oracle::{BatchMode, verify_batch};
use anyhow::{Result, bail};
use clap::Args;
use colored::Colorize;

use super::{Context, SeedArgs};
use crate::config::Source;

/// Check a page of addresses with an explorer or a node.
#[derive(Args)]
pub struct VerifyCommand {
    #[command(flatten)]
    seed: SeedArgs,

    /// Purpose: 44/legacy, 49/segwit, 84/native-segwit or 86/taproot.
    #[arg(short = 'k', long, default_value = "84")]
    purpose: Purpose,

    /// Check change addresses instead of receiving ones.
    #[arg(short, long)]
    internal: bool,

    /// First index of the page.
    #[arg(short, long, default_value = "0")]
    start: u32,

    /// Where to look the addresses up.
    #[arg(long, value_enum)]
    source: Option<Source>,
}

impl VerifyCommand {
    /// Execute the command.
    pub async fn execute(self, ctx: &Context) -> Result<()> {
        let source = match self.source.unwrap_or(ctx.config.source) {
            Source::Offline => bail!("verify needs an online source: pass --source esplora or --source node"),
            source => source,
        };

        let (_, _, tree) = self.seed.open(ctx.network)?;
        let chain = Chain::from_change(self.internal);
        let page = AddressFactory::new(&tree).batch(self.purpose, chain, self.start, ctx.config.page_size);

        // Nothing goes online unless the whole page derived.
        let mut records = Vec::with_capacity(page.len());
        let mut failed = 0usize;
        for (offset, record) in page.into_iter().enumerate() {
            match record {
                Ok(record) => records.push(record),
                Err(e) => {
                    failed += 1;
                    println!("      {} {}", format!("[{}]", u64::from(self.start) + offset as u64).dimmed(), e.to_string().red());
                }
            }
        }
        if failed > 0 {
            bail!("{failed} addresses could not be derived, online check not started");
        }

        let Some(oracle) = ctx.oracle(source).await? else {
            return Ok(());
        };
        let mode = BatchMode::for_oracle(oracle.as_ref());
        let addresses: Vec<String> = records.iter().map(|r| r.address.to_string()).collect();
        let results = verify_batch(oracle.clone(), &addresses, mode).await;

        println!();
        println!(
            "      {} {} {}",
            self.purpose.name().cyan().bold(),
            chain,
            format!("via {}", oracle.name()).dimmed()
        );
        println!();

        let mut errors = 0usize;
        for (record, result) in records.iter().zip(results) {
            let index = format!("[{}]", record.coordinate.index);
            match result {
                Ok(summary) if summary.is_used() => println!(
                    "      {:>8}  {}  {}",
                    index.cyan().bold(),
                    record.address.to_string().green(),
                    summary.to_string().green()
                ),
                Ok(summary) => println!(
                    "      {:>8}  {}  {}",
                    index.cyan().bold(),
                    record.address,
                    summary.to_string().dimmed()
                ),
                Err(e) => {
                    errors += 1;
                    println!(
                        "      {:>8}  {}  {}",
                        index.cyan().bold(),
                        record.address,
                        e.to_string().red()
                    );
                }
            }
        }
        println!();

        if errors > 0 {
            println!("      {}", format!("{errors} lookups failed.").yellow());
            println!();
        }
        Ok(())
    }
}
