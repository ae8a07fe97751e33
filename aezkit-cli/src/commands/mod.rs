//! CLI command definitions and handlers.

mod locate;
mod seed;
mod verify;

use std::path::PathBuf;
use std::sync::Arc;

use aezkit_btc::{KeyTree, Network};
use aezkit_oracle::{BalanceOracle, EsploraClient, NodeConnection};
use aezkit_seed::{CipherSeed, Mnemonic};
use anyhow::{Context as _, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;

use crate::config::{Config, Source};

pub use locate::LocateCommand;
pub use seed::{NewCommand, PasswdCommand, ShowCommand, XpubCommand};
pub use verify::VerifyCommand;

/// aezkit - enciphered seed and Bitcoin address toolkit.
#[derive(Parser)]
#[command(name = "aezkit")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Settings file (defaults to ./aezkit.toml when present).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Network: mainnet, testnet, signet or regtest.
    #[arg(short, long, global = true)]
    pub network: Option<Network>,

    /// Shorthand for `--network testnet`.
    #[arg(short, long, global = true, conflicts_with = "network")]
    pub testnet: bool,

    /// The logging level (trace|debug|info|warn|error)
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    /// The logging format (json|plain)
    #[arg(long, global = true, default_value = "plain")]
    pub log_format: String,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Create a new enciphered seed.
    New(NewCommand),

    /// Decode a mnemonic and list its addresses.
    Show(ShowCommand),

    /// Print the master fingerprint and account extended public keys.
    Xpub(XpubCommand),

    /// Re-encipher a mnemonic under a new passphrase.
    Passwd(PasswdCommand),

    /// Find the derivation path of an address.
    Locate(LocateCommand),

    /// Check a page of addresses online.
    Verify(VerifyCommand),

    /// Print the effective configuration.
    Config,
}

/// Settings shared by every command after merging file and flags.
#[derive(Debug, Clone)]
pub struct Context {
    /// Network to render addresses for.
    pub network: Network,
    /// File settings.
    pub config: Config,
}

impl Context {
    /// Merge the settings file with global flags.
    pub fn resolve(cli: &Cli) -> Result<Self> {
        let config = Config::resolve(cli.config.as_deref())?;
        let network = if cli.testnet {
            Network::Testnet
        } else if let Some(network) = cli.network {
            network
        } else {
            config.network()?
        };
        Ok(Self { network, config })
    }

    /// Build the oracle for `source`, or `None` when offline.
    ///
    /// A node is contacted once here so that bad settings fail before any
    /// work is done.
    pub async fn oracle(&self, source: Source) -> Result<Option<Arc<dyn BalanceOracle>>> {
        match source {
            Source::Offline => Ok(None),
            Source::Esplora => {
                let client = EsploraClient::new(self.config.esplora_config())?;
                Ok(Some(Arc::new(client)))
            }
            Source::Node => {
                let node = NodeConnection::new(self.config.node_config());
                node.ensure_connected()
                    .await
                    .with_context(|| format!("cannot use node at {}", self.config.node_url))?;
                Ok(Some(Arc::new(node)))
            }
        }
    }

    /// Print the configuration as TOML.
    pub fn print_config(&self) -> Result<()> {
        println!("{}", format!("# network in use: {}", self.network).dimmed());
        print!("{}", self.config.to_redacted_toml()?);
        Ok(())
    }
}

/// Mnemonic input shared by the commands that read an existing seed.
#[derive(Args)]
pub struct SeedArgs {
    /// The 24 word mnemonic (unique prefixes of four or more letters work).
    #[arg(short, long)]
    mnemonic: String,

    /// Seed passphrase, if one was set.
    #[arg(short, long)]
    passphrase: Option<String>,
}

impl SeedArgs {
    /// Whether a non-default passphrase was supplied.
    pub fn has_passphrase(&self) -> bool {
        self.passphrase.as_deref().is_some_and(|p| !p.is_empty())
    }

    /// Parse and decipher the mnemonic.
    pub fn decode(&self) -> Result<(Mnemonic, CipherSeed)> {
        let mnemonic: Mnemonic = self.mnemonic.parse().context("cannot read mnemonic")?;
        let seed = mnemonic
            .to_cipher_seed(self.passphrase.as_deref())
            .context("cannot decipher mnemonic")?;
        Ok((mnemonic, seed))
    }

    /// Decode and build the key tree for `network`.
    pub fn open(&self, network: Network) -> Result<(Mnemonic, CipherSeed, KeyTree)> {
        let (mnemonic, seed) = self.decode()?;
        let tree = KeyTree::from_cipher_seed(&seed, network)?;
        Ok((mnemonic, seed, tree))
    }
}
