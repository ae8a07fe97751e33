#![deny(missing_docs)]

//! # aezkit-oracle
//!
//! Online lookups for derived addresses: transaction counts from an Esplora
//! explorer, or UTXO balances from a Bitcoin Core node via `scantxoutset`.
//!
//! # Example
//!
//! ```no_run
//! use aezkit_oracle::{EsploraClient, EsploraConfig};
//!
//! # async fn example() -> Result<(), aezkit_oracle::OracleError> {
//! let client = EsploraClient::new(EsploraConfig::default())?;
//! let summary = client
//!     .address_summary("bc1qcr8te4kr609gcawutmrza0j4xv80jy8z306fyu")
//!     .await?;
//! println!("{summary}");
//! # Ok(())
//! # }
//! ```

mod batch;
mod error;
mod esplora;
mod node;
mod types;

#[cfg(test)]
mod tests;

use async_trait::async_trait;

pub use batch::{BatchMode, verify_batch};
pub use error::OracleError;
pub use esplora::EsploraClient;
pub use node::{NodeConnection, normalize_endpoint};
pub use types::{AddressSummary, DEFAULT_ESPLORA_URL, DEFAULT_NODE_URL, EsploraConfig, NodeConfig};

/// A source of on-chain information about an address.
#[async_trait]
pub trait BalanceOracle: Send + Sync {
    /// Short name for logs and output.
    fn name(&self) -> &'static str;

    /// Summarize one address.
    async fn check(&self, address: &str) -> Result<AddressSummary, OracleError>;
}
