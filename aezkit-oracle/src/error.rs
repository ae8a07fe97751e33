//! Error types for balance lookups.

/// Errors that can occur when asking an oracle about an address.
#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Failed to serialize or deserialize data.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The explorer answered 429.
    #[error("rate limited by the explorer, try again later")]
    RateLimited,

    /// Server returned a non-2xx response.
    #[error("server error ({status_code}): {message}")]
    Server {
        /// HTTP status code.
        status_code: u16,
        /// Response body.
        message: String,
    },

    /// The node rejected the RPC credentials (401).
    #[error("node rejected the RPC credentials, check user and password")]
    Unauthorized,

    /// The node could not be reached.
    #[error("cannot reach node at {endpoint}: {source}")]
    Unreachable {
        /// Normalized RPC endpoint.
        endpoint: String,
        /// Transport error.
        source: reqwest::Error,
    },

    /// The node URL cannot be used.
    #[error("invalid node URL '{0}'")]
    InvalidUrl(String),

    /// JSON-RPC error object returned by the node.
    #[error("node RPC error {code}: {message}")]
    Rpc {
        /// JSON-RPC error code.
        code: i64,
        /// Error message.
        message: String,
    },

    /// `scantxoutset` is unavailable without the address index.
    #[error("node needs addressindex=1 to scan the UTXO set")]
    AddressIndexRequired,

    /// Another UTXO scan is still running on the node.
    #[error("a UTXO set scan is already in progress on the node")]
    ScanInProgress,

    /// A lookup task died before reporting.
    #[error("lookup task failed: {0}")]
    Task(String),
}

impl OracleError {
    /// Map a JSON-RPC error object onto the known node failures.
    pub(crate) fn from_rpc(code: i64, message: String) -> Self {
        if message.contains("requires address index") {
            Self::AddressIndexRequired
        } else if message.contains("Scan already in progress") {
            Self::ScanInProgress
        } else {
            Self::Rpc { code, message }
        }
    }
}
