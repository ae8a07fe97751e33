//! Checking a page of addresses against one oracle.

use std::sync::Arc;
use std::time::Duration;

use crate::BalanceOracle;
use crate::error::OracleError;
use crate::types::AddressSummary;

/// How the lookups of a batch are scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BatchMode {
    /// One task per address, started `delay * position` apart.
    #[default]
    Concurrent,
    /// One address at a time with a pause before each lookup.
    Sequential,
}

impl BatchMode {
    /// Stagger between concurrent lookups or pause between sequential ones.
    #[must_use]
    pub const fn delay(self) -> Duration {
        match self {
            Self::Concurrent => Duration::from_millis(100),
            Self::Sequential => Duration::from_millis(500),
        }
    }

    /// Explorers tolerate parallel requests, a node scan does not.
    #[must_use]
    pub fn for_oracle(oracle: &dyn BalanceOracle) -> Self {
        if oracle.name() == "node" {
            Self::Sequential
        } else {
            Self::Concurrent
        }
    }
}

/// Look up every address and return the results in input order.
///
/// A failed lookup lands in its own slot; it never aborts the batch.
pub async fn verify_batch(
    oracle: Arc<dyn BalanceOracle>,
    addresses: &[String],
    mode: BatchMode,
) -> Vec<Result<AddressSummary, OracleError>> {
    tracing::info!(oracle = oracle.name(), count = addresses.len(), ?mode, "verifying batch");

    match mode {
        BatchMode::Sequential => {
            let mut results = Vec::with_capacity(addresses.len());
            for address in addresses {
                tokio::time::sleep(mode.delay()).await;
                results.push(oracle.check(address).await);
            }
            results
        }
        BatchMode::Concurrent => {
            let handles: Vec<_> = addresses
                .iter()
                .enumerate()
                .map(|(position, address)| {
                    let oracle = Arc::clone(&oracle);
                    let address = address.clone();
                    let stagger = mode.delay() * u32::try_from(position).unwrap_or(u32::MAX);
                    tokio::spawn(async move {
                        tokio::time::sleep(stagger).await;
                        oracle.check(&address).await
                    })
                })
                .collect();

            let mut results = Vec::with_capacity(handles.len());
            for handle in handles {
                results.push(match handle.await {
                    Ok(result) => result,
                    Err(e) => Err(OracleError::Task(e.to_string())),
                });
            }
            results
        }
    }
}
