//! JSON-RPC handle to a Bitcoin Core node.
//!
//! The node is a single shared resource: every call goes through one
//! mutex-guarded state that owns the settings and the cached client. A
//! settings change drops the client, and a failed ping before a call
//! rebuilds it.

use core::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::Mutex;

use crate::BalanceOracle;
use crate::error::OracleError;
use crate::types::{AddressSummary, NodeConfig, ScanProgress, ScanResult};

/// Pause after aborting a running scan before starting ours.
const ABORT_SETTLE: Duration = Duration::from_millis(200);

/// Shared, reconfigurable connection to a node.
pub struct NodeConnection {
    state: Mutex<NodeState>,
}

struct NodeState {
    config: NodeConfig,
    client: Option<RpcClient>,
}

impl NodeConnection {
    /// Create a handle; nothing is contacted until the first call.
    #[must_use]
    pub fn new(config: NodeConfig) -> Self {
        Self {
            state: Mutex::new(NodeState {
                config,
                client: None,
            }),
        }
    }

    /// Current settings.
    pub async fn config(&self) -> NodeConfig {
        self.state.lock().await.config.clone()
    }

    /// Replace the settings. Returns `true` if they changed, in which case
    /// the next call reconnects.
    pub async fn reconfigure(&self, config: NodeConfig) -> bool {
        let mut state = self.state.lock().await;
        if state.config == config {
            return false;
        }
        tracing::info!(url = %config.url, "node settings changed, dropping connection");
        state.config = config;
        state.client = None;
        true
    }

    /// Make sure a client exists and answers `ping`.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the node cannot be reached.
    pub async fn ensure_connected(&self) -> Result<(), OracleError> {
        let mut state = self.state.lock().await;
        state.connected().await.map(|_| ())
    }

    /// Current block height, a cheap liveness probe.
    ///
    /// # Errors
    ///
    /// Returns an error if the node cannot be reached or rejects the call.
    pub async fn block_count(&self) -> Result<u64, OracleError> {
        let mut state = self.state.lock().await;
        let client = state.connected().await?;
        Ok(serde_json::from_value(client.call("getblockcount", json!([])).await?)?)
    }

    /// Scan the UTXO set for outputs paying `address`.
    ///
    /// A scan already running on the node is aborted first. The abort is
    /// advisory: if it is refused the start request reports
    /// [`OracleError::ScanInProgress`].
    ///
    /// # Errors
    ///
    /// Returns an error if the node cannot be reached or rejects the scan.
    pub async fn scan_address(&self, address: &str) -> Result<AddressSummary, OracleError> {
        let mut state = self.state.lock().await;
        let client = state.connected().await?;

        client.abort_running_scan().await;

        let descriptor = format!("addr({address})");
        tracing::debug!(%descriptor, "starting UTXO set scan");
        let result = client
            .call("scantxoutset", json!(["start", [{ "desc": descriptor }]]))
            .await?;
        let result: ScanResult = serde_json::from_value(result)?;

        if !result.success {
            tracing::warn!(address, "node reported an unsuccessful scan");
            return Ok(AddressSummary::ScanFailed);
        }
        Ok(AddressSummary::Balance {
            amount: result.total_amount,
        })
    }
}

impl fmt::Debug for NodeConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeConnection").finish_non_exhaustive()
    }
}

#[async_trait]
impl BalanceOracle for NodeConnection {
    fn name(&self) -> &'static str {
        "node"
    }

    async fn check(&self, address: &str) -> Result<AddressSummary, OracleError> {
        self.scan_address(address).await
    }
}

impl NodeState {
    /// Return a live client, rebuilding it when missing or unresponsive.
    async fn connected(&mut self) -> Result<RpcClient, OracleError> {
        if let Some(client) = &self.client {
            match client.ping().await {
                Ok(()) => return Ok(client.clone()),
                Err(e) => tracing::warn!(error = %e, "node ping failed, reconnecting"),
            }
        }
        self.client = None;

        let client = RpcClient::new(&self.config)?;
        client.ping().await?;
        tracing::info!(endpoint = %client.endpoint, "connected to node");
        self.client = Some(client.clone());
        Ok(client)
    }
}

/// Turn a user supplied node URL into an HTTP endpoint.
///
/// `https://` keeps TLS, `http://` and a bare `host:port` use plain HTTP.
///
/// # Errors
///
/// Returns [`OracleError::InvalidUrl`] for empty input, other schemes or
/// unparsable URLs.
pub fn normalize_endpoint(url: &str) -> Result<String, OracleError> {
    let trimmed = url.trim();
    let lower = trimmed.to_ascii_lowercase();

    let with_scheme = if lower.starts_with("http://") || lower.starts_with("https://") {
        trimmed.to_string()
    } else if trimmed.is_empty() || trimmed.contains("://") {
        return Err(OracleError::InvalidUrl(url.to_string()));
    } else {
        format!("http://{trimmed}")
    };

    let parsed =
        reqwest::Url::parse(&with_scheme).map_err(|_| OracleError::InvalidUrl(url.to_string()))?;
    if parsed.host_str().is_none() {
        return Err(OracleError::InvalidUrl(url.to_string()));
    }
    Ok(parsed.to_string())
}

#[derive(Clone)]
struct RpcClient {
    endpoint: String,
    user: String,
    pass: String,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

impl RpcClient {
    fn new(config: &NodeConfig) -> Result<Self, OracleError> {
        Ok(Self {
            endpoint: normalize_endpoint(&config.url)?,
            user: config.user.clone(),
            pass: config.pass.clone(),
            http: reqwest::Client::builder().build()?,
        })
    }

    async fn ping(&self) -> Result<(), OracleError> {
        self.call("ping", json!([])).await.map(|_| ())
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value, OracleError> {
        let body = json!({
            "jsonrpc": "1.0",
            "id": "aezkit",
            "method": method,
            "params": params,
        });

        let resp = self
            .http
            .post(&self.endpoint)
            .basic_auth(&self.user, Some(&self.pass))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() || e.is_timeout() {
                    OracleError::Unreachable {
                        endpoint: self.endpoint.clone(),
                        source: e,
                    }
                } else {
                    OracleError::Http(e)
                }
            })?;

        let status = resp.status();
        if status.as_u16() == 401 {
            return Err(OracleError::Unauthorized);
        }

        // Core answers RPC errors with a 500 status and a JSON body.
        let text = resp.text().await?;
        let parsed: RpcResponse = match serde_json::from_str(&text) {
            Ok(parsed) => parsed,
            Err(e) if status.is_success() => return Err(e.into()),
            Err(_) => {
                return Err(OracleError::Server {
                    status_code: status.as_u16(),
                    message: text,
                });
            }
        };

        if let Some(error) = parsed.error {
            return Err(OracleError::from_rpc(error.code, error.message));
        }
        Ok(parsed.result)
    }

    async fn abort_running_scan(&self) {
        let status = match self.call("scantxoutset", json!(["status"])).await {
            Ok(status) => status,
            Err(e) => {
                tracing::warn!(error = %e, "cannot read scan status");
                return;
            }
        };

        let running = serde_json::from_value::<Option<ScanProgress>>(status)
            .ok()
            .flatten()
            .and_then(|s| s.progress);
        let Some(progress) = running else {
            return;
        };

        tracing::warn!(progress, "aborting UTXO scan already running on the node");
        match self.call("scantxoutset", json!(["abort"])).await {
            Ok(Value::Bool(true)) => {}
            Ok(Value::Object(o)) if o.get("success") == Some(&Value::Bool(true)) => {}
            Ok(other) => tracing::warn!(response = %other, "node did not confirm the abort"),
            Err(e) => tracing::warn!(error = %e, "abort request failed"),
        }
        tokio::time::sleep(ABORT_SETTLE).await;
    }
}

impl fmt::Debug for RpcClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RpcClient")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}
