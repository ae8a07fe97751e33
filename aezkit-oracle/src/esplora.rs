//! Esplora HTTP client for address transaction counts.

use async_trait::async_trait;

use crate::BalanceOracle;
use crate::error::OracleError;
use crate::types::{AddressStats, AddressSummary, EsploraConfig};

/// HTTP client for an Esplora explorer such as blockstream.info.
#[derive(Debug, Clone)]
pub struct EsploraClient {
    /// Client configuration.
    config: EsploraConfig,
    /// Underlying HTTP client.
    client: reqwest::Client,
}

impl EsploraClient {
    /// Create a new client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`OracleError::Http`] if the HTTP client cannot be built.
    pub fn new(config: EsploraConfig) -> Result<Self, OracleError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { config, client })
    }

    /// The configured base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Summarize the on-chain history of an address.
    ///
    /// An address the explorer has never seen (404) has zero transactions.
    ///
    /// # Errors
    ///
    /// Returns [`OracleError::RateLimited`] on 429, [`OracleError::Server`]
    /// on any other non-2xx status and a transport or decoding error
    /// otherwise.
    pub async fn address_summary(&self, address: &str) -> Result<AddressSummary, OracleError> {
        let url = format!("{}/address/{}", self.config.base_url.trim_end_matches('/'), address);
        tracing::debug!(%url, "querying explorer");

        let resp = self.client.get(&url).send().await?;
        let status = resp.status();

        if status.as_u16() == 404 {
            return Ok(AddressSummary::TxCount(0));
        }

        if status.as_u16() == 429 {
            tracing::warn!(address, "explorer rate limit hit");
            return Err(OracleError::RateLimited);
        }

        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(OracleError::Server {
                status_code: status.as_u16(),
                message,
            });
        }

        let text = resp.text().await?;
        let stats: AddressStats = serde_json::from_str(&text)?;
        Ok(stats.summary())
    }
}

#[async_trait]
impl BalanceOracle for EsploraClient {
    fn name(&self) -> &'static str {
        "esplora"
    }

    async fn check(&self, address: &str) -> Result<AddressSummary, OracleError> {
        self.address_summary(address).await
    }
}
