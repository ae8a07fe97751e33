//! Optional `aezkit.toml` settings file.
//!
//! Every key may be omitted. Command line flags override what is read here.
//!
//! ```toml
//! network = "mainnet"
//! source = "esplora"
//! esplora-url = "https://blockstream.info/api"
//! node-url = "127.0.0.1:8332"
//! node-user = "rpcuser"
//! node-pass = "rpcpass"
//! search-limit = 20000
//! page-size = 20
//! ```

use std::path::Path;

use aezkit_btc::{DEFAULT_PAGE_SIZE, DEFAULT_SEARCH_LIMIT, Network};
use aezkit_oracle::{DEFAULT_ESPLORA_URL, DEFAULT_NODE_URL, EsploraConfig, NodeConfig};
use anyhow::{Context, Result, bail};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// File looked up in the working directory when `--config` is not given.
pub const CONFIG_FILENAME: &str = "aezkit.toml";

/// Where online lookups go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Source {
    /// No network access.
    #[default]
    Offline,
    /// Esplora explorer (blockstream.info by default).
    Esplora,
    /// Bitcoin Core node over JSON-RPC.
    Node,
}

/// Settings file contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// Network name.
    #[serde(default = "default_network")]
    pub network: String,

    /// Default lookup source.
    #[serde(default)]
    pub source: Source,

    /// Esplora base URL.
    #[serde(default = "default_esplora_url")]
    pub esplora_url: String,

    /// Node RPC endpoint.
    #[serde(default = "default_node_url")]
    pub node_url: String,

    /// Node RPC user.
    #[serde(default)]
    pub node_user: String,

    /// Node RPC password.
    #[serde(default)]
    pub node_pass: String,

    /// Indices searched per purpose and chain by `locate`.
    #[serde(default = "default_search_limit")]
    pub search_limit: u32,

    /// Addresses per page for `show`, `new` and `verify`.
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_network() -> String {
    Network::Mainnet.name().to_string()
}

fn default_esplora_url() -> String {
    DEFAULT_ESPLORA_URL.to_string()
}

fn default_node_url() -> String {
    DEFAULT_NODE_URL.to_string()
}

const fn default_search_limit() -> u32 {
    DEFAULT_SEARCH_LIMIT
}

const fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

impl Default for Config {
    fn default() -> Self {
        Self {
            network: default_network(),
            source: Source::default(),
            esplora_url: default_esplora_url(),
            node_url: default_node_url(),
            node_user: String::new(),
            node_pass: String::new(),
            search_limit: default_search_limit(),
            page_size: default_page_size(),
        }
    }
}

impl Config {
    /// Load the file named on the command line, or `aezkit.toml` from the
    /// working directory if it exists.
    ///
    /// A path given explicitly must exist; the implicit one falls back to
    /// defaults.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => {
                if !path.exists() {
                    bail!("config file not found: {}", path.display());
                }
                Self::load(path)
            }
            None => Self::load(Path::new(CONFIG_FILENAME)),
        }
    }

    /// Load configuration from file.
    ///
    /// If the file doesn't exist, returns default configuration.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config: {}", path.display()))?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// The configured network.
    pub fn network(&self) -> Result<Network> {
        self.network
            .parse()
            .with_context(|| format!("invalid network in config: '{}'", self.network))
    }

    /// Settings for the Esplora client.
    pub fn esplora_config(&self) -> EsploraConfig {
        EsploraConfig {
            base_url: self.esplora_url.clone(),
            ..Default::default()
        }
    }

    /// Settings for the node connection.
    pub fn node_config(&self) -> NodeConfig {
        NodeConfig {
            url: self.node_url.clone(),
            user: self.node_user.clone(),
            pass: self.node_pass.clone(),
        }
    }

    /// TOML rendering with the node password masked.
    pub fn to_redacted_toml(&self) -> Result<String> {
        let mut shown = self.clone();
        if !shown.node_pass.is_empty() {
            shown.node_pass = "********".to_string();
        }
        toml::to_string_pretty(&shown).context("Failed to serialize config")
    }
}
