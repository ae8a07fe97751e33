//! Configuration and result types for balance oracles.

use core::fmt;
use std::time::Duration;

use bitcoin::Amount;
use serde::Deserialize;

/// Public Blockstream Esplora endpoint.
pub const DEFAULT_ESPLORA_URL: &str = "https://blockstream.info/api";

/// Default Bitcoin Core RPC endpoint.
pub const DEFAULT_NODE_URL: &str = "127.0.0.1:8332";

/// Configuration for an [`crate::EsploraClient`].
#[derive(Debug, Clone)]
pub struct EsploraConfig {
    /// Base URL without a trailing slash.
    pub base_url: String,
    /// Per request timeout.
    pub timeout: Duration,
}

impl Default for EsploraConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_ESPLORA_URL.to_string(),
            timeout: Duration::from_secs(15),
        }
    }
}

/// Connection settings for a Bitcoin Core node.
///
/// `url` may be `http://host:port`, `https://host:port` or a bare
/// `host:port`, which is treated as plain HTTP.
#[derive(Clone, PartialEq, Eq)]
pub struct NodeConfig {
    /// RPC endpoint.
    pub url: String,
    /// RPC user.
    pub user: String,
    /// RPC password.
    pub pass: String,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_NODE_URL.to_string(),
            user: String::new(),
            pass: String::new(),
        }
    }
}

impl fmt::Debug for NodeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeConfig")
            .field("url", &self.url)
            .field("user", &self.user)
            .field("pass", &"<redacted>")
            .finish()
    }
}

/// What an oracle could tell about one address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressSummary {
    /// Number of confirmed funding plus spending outputs.
    TxCount(u64),
    /// Unspent balance found by a UTXO set scan.
    Balance {
        /// Sum of the unspent outputs.
        amount: Amount,
    },
    /// The explorer answered without transaction statistics.
    Unavailable,
    /// The node reported an unsuccessful scan.
    ScanFailed,
}

impl AddressSummary {
    /// Whether the address has been seen on chain or holds funds.
    #[must_use]
    pub fn is_used(&self) -> bool {
        match self {
            Self::TxCount(n) => *n > 0,
            Self::Balance { amount } => *amount > Amount::ZERO,
            Self::Unavailable | Self::ScanFailed => false,
        }
    }
}

impl fmt::Display for AddressSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TxCount(n) => write!(f, "Tx Count: {n}"),
            Self::Balance { amount } => write!(f, "Balance: {:.8} BTC", amount.to_btc()),
            Self::Unavailable => write!(f, "(tx info unavailable)"),
            Self::ScanFailed => write!(f, "(scan failed)"),
        }
    }
}

/// Esplora `/address/{address}` response, reduced to what is used.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct AddressStats {
    #[serde(default)]
    pub chain_stats: Option<ChainStats>,
}

/// Confirmed output counters.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ChainStats {
    #[serde(default)]
    pub funded_txo_count: Option<u64>,
    #[serde(default)]
    pub spent_txo_count: Option<u64>,
}

impl AddressStats {
    pub(crate) fn summary(&self) -> AddressSummary {
        match &self.chain_stats {
            Some(ChainStats {
                funded_txo_count: Some(funded),
                spent_txo_count: Some(spent),
            }) => AddressSummary::TxCount(funded + spent),
            _ => AddressSummary::Unavailable,
        }
    }
}

/// `scantxoutset status` result while a scan is running.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ScanProgress {
    #[serde(default)]
    pub progress: Option<f64>,
}

/// `scantxoutset start` result.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ScanResult {
    pub success: bool,
    #[serde(default, with = "bitcoin::amount::serde::as_btc")]
    pub total_amount: Amount,
}
