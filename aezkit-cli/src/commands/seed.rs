//! Seed creation and inspection commands.

use aezkit_btc::{AddressFactory, AddressRecord, Chain, KeyTree, Purpose};
use aezkit_seed::{CipherSeed, Mnemonic};
use anyhow::{Context as _, Result};
use chrono::Utc;
use clap::Args;
use colored::Colorize;

use super::{Context, SeedArgs};

/// Create a new seed.
#[derive(Args)]
pub struct NewCommand {
    /// Passphrase protecting the mnemonic (optional extra security).
    #[arg(short, long)]
    passphrase: Option<String>,

    /// Number of address rows to print.
    #[arg(short, long)]
    count: Option<u32>,

    /// Internal version stored inside the enciphered payload.
    #[arg(long, default_value = "0")]
    internal_version: u8,
}

impl NewCommand {
    /// Execute the command.
    pub fn execute(self, ctx: &Context) -> Result<()> {
        let seed = CipherSeed::generate(self.internal_version, Utc::now())
            .context("cannot draw seed entropy")?;
        let mnemonic = seed.to_mnemonic(self.passphrase.as_deref())?;
        let tree = KeyTree::from_cipher_seed(&seed, ctx.network)?;
        let has_passphrase = self.passphrase.as_deref().is_some_and(|p| !p.is_empty());

        print_seed(&seed, &mnemonic, &tree, has_passphrase);
        print_xpubs(&tree, 0)?;
        print_rows(&tree, Chain::External, 0, self.count.unwrap_or(ctx.config.page_size));
        Ok(())
    }
}

/// Decode a mnemonic and list its addresses.
#[derive(Args)]
pub struct ShowCommand {
    #[command(flatten)]
    seed: SeedArgs,

    /// List change addresses instead of receiving ones.
    #[arg(short, long)]
    internal: bool,

    /// First index to list.
    #[arg(short, long, default_value = "0")]
    start: u32,

    /// Number of address rows to print.
    #[arg(short, long)]
    count: Option<u32>,
}

impl ShowCommand {
    /// Execute the command.
    pub fn execute(self, ctx: &Context) -> Result<()> {
        let (mnemonic, seed, tree) = self.seed.open(ctx.network)?;

        print_seed(&seed, &mnemonic, &tree, self.seed.has_passphrase());
        print_rows(
            &tree,
            Chain::from_change(self.internal),
            self.start,
            self.count.unwrap_or(ctx.config.page_size),
        );
        Ok(())
    }
}

/// Print account extended public keys.
#[derive(Args)]
pub struct XpubCommand {
    #[command(flatten)]
    seed: SeedArgs,

    /// Account number.
    #[arg(short, long, default_value = "0")]
    account: u32,
}

impl XpubCommand {
    /// Execute the command.
    pub fn execute(self, ctx: &Context) -> Result<()> {
        let (_, _, tree) = self.seed.open(ctx.network)?;
        print_xpubs(&tree, self.account)
    }
}

/// Re-encipher a mnemonic under a new passphrase.
#[derive(Args)]
pub struct PasswdCommand {
    /// The 24 word mnemonic.
    #[arg(short, long)]
    mnemonic: String,

    /// Current passphrase (omit for the default).
    #[arg(long)]
    old: Option<String>,

    /// New passphrase (omit for the default).
    #[arg(long)]
    new: Option<String>,
}

impl PasswdCommand {
    /// Execute the command.
    pub fn execute(self) -> Result<()> {
        let mnemonic: Mnemonic = self.mnemonic.parse().context("cannot read mnemonic")?;
        let changed = mnemonic
            .change_passphrase(self.old.as_deref(), self.new.as_deref())
            .context("cannot change passphrase")?;
        print_passwd(&changed);
        Ok(())
    }
}

#[rustfmt::skip]
fn print_seed(seed: &CipherSeed, mnemonic: &Mnemonic, tree: &KeyTree, has_passphrase: bool) {
    println!();
    println!("      {}      {}", "Network".cyan().bold(), tree.network());
    println!("      {}     {}", "Mnemonic".cyan().bold(), mnemonic);
    if has_passphrase {
        println!("      {}   {}", "Passphrase".cyan().bold(), "(set)".dimmed());
    }
    println!(
        "      {}     {} {}",
        "Birthday".cyan().bold(),
        seed.birthday_time().format("%Y-%m-%d"),
        format!("(day {})", seed.birthday()).dimmed()
    );
    println!("      {}      {}", "Version".cyan().bold(), seed.internal_version());
    println!("      {}  {}", "Fingerprint".cyan().bold(), tree.master_fingerprint());
    println!();
}

#[rustfmt::skip]
fn print_xpubs(tree: &KeyTree, account: u32) -> Result<()> {
    println!("      {}  {}", "Fingerprint".cyan().bold(), tree.master_fingerprint());
    for purpose in Purpose::ALL {
        let xpub = tree.account_xpub(purpose, tree.coin_type(), account)?;
        println!(
            "      {}  {}",
            format!("{}'/{}'/{account}'", purpose.number(), tree.coin_type()).cyan().bold(),
            xpub.to_string().green()
        );
    }
    println!();
    Ok(())
}

#[rustfmt::skip]
fn print_rows(tree: &KeyTree, chain: Chain, start: u32, count: u32) {
    let factory = AddressFactory::new(tree);

    for offset in 0..count {
        let Some(index) = start.checked_add(offset) else {
            break;
        };
        println!("      {}        {}", "Index".cyan().bold(), format!("[{index}] {chain}").dimmed());
        for (purpose, record) in Purpose::ALL.into_iter().zip(factory.row(chain, index)) {
            print_record(purpose, &record);
        }
        if offset + 1 < count {
            println!();
        }
    }
    println!();
}

fn print_record(purpose: Purpose, record: &aezkit_btc::Result<AddressRecord>) {
    let label = format!("{:<14}", purpose.label());
    match record {
        Ok(record) => println!(
            "      {}{}  {}",
            label.cyan().bold(),
            record.address.to_string().green(),
            record.coordinate.to_string().dimmed()
        ),
        Err(e) => println!("      {}{}", label.cyan().bold(), e.to_string().red()),
    }
}

#[rustfmt::skip]
fn print_passwd(mnemonic: &Mnemonic) {
    println!();
    println!("      {}     {}", "Mnemonic".cyan().bold(), mnemonic.to_string().green());
    println!("      {}", "Store the new mnemonic; the old one still opens with the old passphrase.".dimmed());
    println!();
}
