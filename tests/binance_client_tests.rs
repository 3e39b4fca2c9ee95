use binflow::core::config::ExchangeConfig;
use binflow::core::kernel::ReqwestTransport;
use binflow::exchanges::binance::BinanceClient;
use std::time::Duration;
use tokio::time::timeout;

/// Loopback port with nothing listening: requests fail fast with a connection
/// error and never touch the network.
const UNROUTABLE_BASE_URL: &str = "http://127.0.0.1:9";

fn create_client() -> BinanceClient<ReqwestTransport> {
    let config = ExchangeConfig::new("test_api_key".to_string(), "test_secret_key".to_string());
    let transport = ReqwestTransport::new("binance".to_string()).expect("transport builds");
    BinanceClient::new(transport, UNROUTABLE_BASE_URL.to_string(), &config)
        .expect("valid credentials construct a client")
}

#[tokio::test]
async fn test_public_request_failure_is_an_envelope_not_a_fault() {
    let client = create_client();

    let envelope = timeout(Duration::from_secs(30), client.public_request("/api/v3/time", &[]))
        .await
        .expect("request must resolve");

    assert!(!envelope.success);
    assert_eq!(envelope.status_code, 0, "no HTTP response was received");
    assert!(!envelope.message.is_empty());
}

#[tokio::test]
async fn test_signed_request_failure_is_an_envelope_not_a_fault() {
    let client = create_client();

    let envelope = timeout(
        Duration::from_secs(30),
        client.signed_request("/api/v3/account", &[("recvWindow", "5000")]),
    )
    .await
    .expect("request must resolve");

    assert!(!envelope.success);
    assert_eq!(envelope.status_code, 0);
}

#[tokio::test]
async fn test_signed_post_failure_is_an_envelope_not_a_fault() {
    let client = create_client();

    let envelope = timeout(
        Duration::from_secs(30),
        client.signed_post("/api/v3/order/test", &[("symbol", "BTCUSDT")]),
    )
    .await
    .expect("request must resolve");

    assert!(!envelope.success);
    assert_eq!(envelope.status_code, 0);
}

#[test]
fn test_blank_credentials_fail_before_any_network_activity() {
    let transport = ReqwestTransport::new("binance".to_string()).expect("transport builds");
    let config = ExchangeConfig::new(String::new(), "secret".to_string());
    assert!(BinanceClient::new(transport, UNROUTABLE_BASE_URL.to_string(), &config).is_err());

    let transport = ReqwestTransport::new("binance".to_string()).expect("transport builds");
    let config = ExchangeConfig::new("key".to_string(), "\t  \n".to_string());
    assert!(BinanceClient::new(transport, UNROUTABLE_BASE_URL.to_string(), &config).is_err());
}

#[test]
fn test_facade_construction_from_config() {
    let config = ExchangeConfig::new("test_api_key".to_string(), "test_secret_key".to_string())
        .testnet(true);
    let api = binflow::build_rest_api(&config).expect("facade builds");
    assert_eq!(api.client().base_url(), "https://testnet.binance.vision");
}
