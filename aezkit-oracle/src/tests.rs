//! Tests for the balance oracles.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bitcoin::Amount;
use serde_json::json;
use wiremock::matchers::{body_string_contains, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::{
    AddressSummary, BalanceOracle, BatchMode, EsploraClient, EsploraConfig, NodeConfig,
    NodeConnection, OracleError, normalize_endpoint, verify_batch,
};

const ADDRESS: &str = "bc1qcr8te4kr609gcawutmrza0j4xv80jy8z306fyu";

fn esplora(server_url: &str) -> EsploraClient {
    EsploraClient::new(EsploraConfig {
        base_url: server_url.to_string(),
        ..Default::default()
    })
    .unwrap()
}

fn node_config(server_url: &str) -> NodeConfig {
    NodeConfig {
        url: server_url.to_string(),
        user: "alice".to_string(),
        pass: "secret".to_string(),
    }
}

fn rpc_ok(result: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "result": result, "error": null, "id": "aezkit" }))
}

fn rpc_err(code: i64, message: &str) -> ResponseTemplate {
    ResponseTemplate::new(500).set_body_json(json!({
        "result": null,
        "error": { "code": code, "message": message },
        "id": "aezkit"
    }))
}

async fn mount_ping(server: &MockServer) {
    Mock::given(method("POST"))
        .and(body_string_contains("\"method\":\"ping\""))
        .respond_with(rpc_ok(json!(null)))
        .mount(server)
        .await;
}

async fn mount_idle_status(server: &MockServer) {
    Mock::given(method("POST"))
        .and(body_string_contains("[\"status\"]"))
        .respond_with(rpc_ok(json!(null)))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_esplora_counts_funded_and_spent() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("/address/{ADDRESS}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "address": ADDRESS,
            "chain_stats": {
                "funded_txo_count": 3,
                "funded_txo_sum": 150000,
                "spent_txo_count": 2,
                "spent_txo_sum": 100000,
                "tx_count": 4
            },
            "mempool_stats": {
                "funded_txo_count": 0,
                "spent_txo_count": 0,
                "tx_count": 0
            }
        })))
        .mount(&server)
        .await;

    let summary = esplora(&server.uri()).address_summary(ADDRESS).await.unwrap();
    assert_eq!(summary, AddressSummary::TxCount(5));
    assert!(summary.is_used());
    assert_eq!(summary.to_string(), "Tx Count: 5");
}

#[tokio::test]
async fn test_esplora_missing_stats_is_unavailable() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("/address/{ADDRESS}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "address": ADDRESS })))
        .mount(&server)
        .await;

    let summary = esplora(&server.uri()).address_summary(ADDRESS).await.unwrap();
    assert_eq!(summary, AddressSummary::Unavailable);
    assert!(!summary.is_used());
}

#[tokio::test]
async fn test_esplora_not_found_means_unused() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("/address/{ADDRESS}")))
        .respond_with(ResponseTemplate::new(404).set_body_string("Address not found"))
        .mount(&server)
        .await;

    let summary = esplora(&server.uri()).address_summary(ADDRESS).await.unwrap();
    assert_eq!(summary, AddressSummary::TxCount(0));
}

#[tokio::test]
async fn test_esplora_rate_limited() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("/address/{ADDRESS}")))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let result = esplora(&server.uri()).address_summary(ADDRESS).await;
    assert!(matches!(result, Err(OracleError::RateLimited)));
}

#[tokio::test]
async fn test_esplora_server_error_keeps_body() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("/address/{ADDRESS}")))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&server)
        .await;

    match esplora(&server.uri()).address_summary(ADDRESS).await {
        Err(OracleError::Server {
            status_code,
            message,
        }) => {
            assert_eq!(status_code, 502);
            assert_eq!(message, "bad gateway");
        }
        other => panic!("expected server error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_esplora_trailing_slash_in_base_url() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("/address/{ADDRESS}")))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = esplora(&format!("{}/", server.uri()));
    assert_eq!(client.address_summary(ADDRESS).await.unwrap(), AddressSummary::TxCount(0));
}

#[test]
fn test_normalize_endpoint() {
    assert_eq!(normalize_endpoint("127.0.0.1:8332").unwrap(), "http://127.0.0.1:8332/");
    assert_eq!(
        normalize_endpoint(" http://node.local:8332 ").unwrap(),
        "http://node.local:8332/"
    );
    assert_eq!(normalize_endpoint("HTTPS://node.local").unwrap(), "https://node.local/");
    assert!(matches!(normalize_endpoint(""), Err(OracleError::InvalidUrl(_))));
    assert!(matches!(normalize_endpoint("ftp://node.local"), Err(OracleError::InvalidUrl(_))));
}

#[tokio::test]
async fn test_node_scan_reports_balance() {
    let server = MockServer::start().await;
    mount_ping(&server).await;
    mount_idle_status(&server).await;

    Mock::given(method("POST"))
        .and(header_exists("authorization"))
        .and(body_string_contains("\"start\""))
        .and(body_string_contains(&format!("addr({ADDRESS})")))
        .respond_with(rpc_ok(json!({
            "success": true,
            "txouts": 123456,
            "height": 800000,
            "bestblock": "00000000000000000001",
            "unspents": [],
            "total_amount": 0.0015
        })))
        .expect(1)
        .mount(&server)
        .await;

    let node = NodeConnection::new(node_config(&server.uri()));
    let summary = node.scan_address(ADDRESS).await.unwrap();
    assert_eq!(summary, AddressSummary::Balance { amount: Amount::from_sat(150_000) });
    assert!(summary.is_used());
    assert_eq!(summary.to_string(), "Balance: 0.00150000 BTC");
}

#[tokio::test]
async fn test_node_aborts_running_scan_first() {
    let server = MockServer::start().await;
    mount_ping(&server).await;

    Mock::given(method("POST"))
        .and(body_string_contains("[\"status\"]"))
        .respond_with(rpc_ok(json!({ "progress": 42.5 })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(body_string_contains("[\"abort\"]"))
        .respond_with(rpc_ok(json!(true)))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(body_string_contains("\"start\""))
        .respond_with(rpc_ok(json!({ "success": true, "total_amount": 0.0 })))
        .mount(&server)
        .await;

    let node = NodeConnection::new(node_config(&server.uri()));
    let summary = node.scan_address(ADDRESS).await.unwrap();
    assert_eq!(summary, AddressSummary::Balance { amount: Amount::ZERO });
    assert!(!summary.is_used());
}

#[tokio::test]
async fn test_node_balance_keeps_every_satoshi() {
    let server = MockServer::start().await;
    mount_ping(&server).await;
    mount_idle_status(&server).await;

    Mock::given(method("POST"))
        .and(body_string_contains("\"start\""))
        .respond_with(rpc_ok(json!({ "success": true, "total_amount": 20999999.97690000 })))
        .mount(&server)
        .await;

    let node = NodeConnection::new(node_config(&server.uri()));
    let summary = node.scan_address(ADDRESS).await.unwrap();
    assert_eq!(
        summary,
        AddressSummary::Balance { amount: Amount::from_sat(2_099_999_997_690_000) }
    );
    assert_eq!(summary.to_string(), "Balance: 20999999.97690000 BTC");
}

#[tokio::test]
async fn test_node_rejects_negative_balance() {
    let server = MockServer::start().await;
    mount_ping(&server).await;
    mount_idle_status(&server).await;

    Mock::given(method("POST"))
        .and(body_string_contains("\"start\""))
        .respond_with(rpc_ok(json!({ "success": true, "total_amount": -0.5 })))
        .mount(&server)
        .await;

    let node = NodeConnection::new(node_config(&server.uri()));
    let err = node.scan_address(ADDRESS).await.unwrap_err();
    assert!(matches!(err, OracleError::Serialization(_)));
}

#[tokio::test]
async fn test_node_unsuccessful_scan() {
    let server = MockServer::start().await;
    mount_ping(&server).await;
    mount_idle_status(&server).await;

    Mock::given(method("POST"))
        .and(body_string_contains("\"start\""))
        .respond_with(rpc_ok(json!({ "success": false, "total_amount": 0.0 })))
        .mount(&server)
        .await;

    let node = NodeConnection::new(node_config(&server.uri()));
    assert_eq!(node.scan_address(ADDRESS).await.unwrap(), AddressSummary::ScanFailed);
}

#[tokio::test]
async fn test_node_maps_known_rpc_errors() {
    let server = MockServer::start().await;
    mount_ping(&server).await;
    mount_idle_status(&server).await;

    Mock::given(method("POST"))
        .and(body_string_contains("\"start\""))
        .respond_with(rpc_err(-8, "Scan already in progress, use action \"abort\" or \"status\""))
        .mount(&server)
        .await;

    let node = NodeConnection::new(node_config(&server.uri()));
    assert!(matches!(
        node.scan_address(ADDRESS).await,
        Err(OracleError::ScanInProgress)
    ));

    assert!(matches!(
        OracleError::from_rpc(-1, "scantxoutset requires address index".to_string()),
        OracleError::AddressIndexRequired
    ));
    assert!(matches!(
        OracleError::from_rpc(-32601, "Method not found".to_string()),
        OracleError::Rpc { code: -32601, .. }
    ));
}

#[tokio::test]
async fn test_node_unauthorized() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let node = NodeConnection::new(node_config(&server.uri()));
    assert!(matches!(node.ensure_connected().await, Err(OracleError::Unauthorized)));
}

#[tokio::test]
async fn test_node_block_count() {
    let server = MockServer::start().await;
    mount_ping(&server).await;

    Mock::given(method("POST"))
        .and(body_string_contains("getblockcount"))
        .respond_with(rpc_ok(json!(850123)))
        .mount(&server)
        .await;

    let node = NodeConnection::new(node_config(&server.uri()));
    assert_eq!(node.block_count().await.unwrap(), 850_123);
}

#[tokio::test]
async fn test_node_reconfigure_switches_endpoint() {
    let first = MockServer::start().await;
    let second = MockServer::start().await;
    mount_ping(&first).await;
    mount_ping(&second).await;

    let node = NodeConnection::new(node_config(&first.uri()));
    node.ensure_connected().await.unwrap();

    assert!(!node.reconfigure(node_config(&first.uri())).await);
    assert!(node.reconfigure(node_config(&second.uri())).await);
    assert_eq!(node.config().await.url, second.uri());

    node.ensure_connected().await.unwrap();
    let hits = second.received_requests().await.unwrap();
    assert!(!hits.is_empty());
}

#[tokio::test]
async fn test_node_unreachable() {
    let node = NodeConnection::new(NodeConfig {
        url: "127.0.0.1:1".to_string(),
        ..Default::default()
    });
    assert!(matches!(
        node.ensure_connected().await,
        Err(OracleError::Unreachable { .. })
    ));
}

#[test]
fn test_node_config_debug_redacts_password() {
    let rendered = format!("{:?}", node_config("127.0.0.1:8332"));
    assert!(rendered.contains("alice"));
    assert!(!rendered.contains("secret"));
}

/// Answers after a delay that shrinks with the position, so completion
/// order is the reverse of input order.
struct SlowOracle;

#[async_trait]
impl BalanceOracle for SlowOracle {
    fn name(&self) -> &'static str {
        "slow"
    }

    async fn check(&self, address: &str) -> Result<AddressSummary, OracleError> {
        let n: u64 = address.parse().map_err(|_| OracleError::InvalidUrl(address.to_string()))?;
        tokio::time::sleep(Duration::from_millis(300u64.saturating_sub(n * 100))).await;
        if n == 1 {
            return Err(OracleError::RateLimited);
        }
        Ok(AddressSummary::TxCount(n))
    }
}

#[tokio::test]
async fn test_batch_keeps_input_order() {
    let addresses: Vec<String> = (0..3).map(|n| n.to_string()).collect();

    for mode in [BatchMode::Concurrent, BatchMode::Sequential] {
        let results = verify_batch(Arc::new(SlowOracle), &addresses, mode).await;
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap(), &AddressSummary::TxCount(0));
        assert!(matches!(results[1], Err(OracleError::RateLimited)));
        assert_eq!(results[2].as_ref().unwrap(), &AddressSummary::TxCount(2));
    }
}

#[tokio::test]
async fn test_batch_against_explorer() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/address/a"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "chain_stats": { "funded_txo_count": 1, "spent_txo_count": 0 }
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/address/b"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let oracle: Arc<dyn BalanceOracle> = Arc::new(esplora(&server.uri()));
    let addresses = vec!["a".to_string(), "b".to_string()];
    let results = verify_batch(oracle, &addresses, BatchMode::Concurrent).await;

    assert_eq!(results[0].as_ref().unwrap(), &AddressSummary::TxCount(1));
    assert_eq!(results[1].as_ref().unwrap(), &AddressSummary::TxCount(0));
}

#[test]
fn test_batch_mode_for_oracle() {
    let explorer = EsploraClient::new(EsploraConfig::default()).unwrap();
    assert_eq!(BatchMode::for_oracle(&explorer), BatchMode::Concurrent);

    let node = NodeConnection::new(NodeConfig::default());
    assert_eq!(BatchMode::for_oracle(&node), BatchMode::Sequential);
    assert_eq!(BatchMode::Sequential.delay(), Duration::from_millis(500));
}
