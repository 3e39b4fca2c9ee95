pub mod client;
pub mod codec;
pub mod rest;
pub mod signer;
pub mod stream;
pub mod types;

use crate::core::config::ExchangeConfig;
use crate::core::errors::ExchangeError;
use crate::core::kernel::ReqwestTransport;

// Re-export main types for easier importing
pub use client::BinanceClient;
pub use codec::{agg_trade_stream, AggTradeCodec};
pub use rest::BinanceRestApi;
pub use stream::{FlowAccumulator, TradeFlowAggregator, TradeFlowConfig, TradeFlowHandle};
pub use types::BinanceAggTrade;

const API_URL: &str = "https://api.binance.com";
const TESTNET_API_URL: &str = "https://testnet.binance.vision";
const STREAM_URL: &str = "wss://stream.binance.com:9443";
const TESTNET_STREAM_URL: &str = "wss://stream.testnet.binance.vision";

/// Resolve the REST host for a configuration.
fn rest_base_url(config: &ExchangeConfig) -> String {
    if config.testnet {
        TESTNET_API_URL.to_string()
    } else {
        config
            .base_url
            .clone()
            .unwrap_or_else(|| API_URL.to_string())
    }
}

/// Resolve the stream host for a configuration.
fn stream_base_url(config: &ExchangeConfig) -> &'static str {
    if config.testnet {
        TESTNET_STREAM_URL
    } else {
        STREAM_URL
    }
}

/// Create an authenticated REST client for the configured host.
pub fn build_client(
    config: &ExchangeConfig,
) -> Result<BinanceClient<ReqwestTransport>, ExchangeError> {
    let transport = ReqwestTransport::new("binance".to_string())?;
    BinanceClient::new(transport, rest_base_url(config), config)
}

/// Create the typed endpoint facade over a fresh client.
pub fn build_rest_api(
    config: &ExchangeConfig,
) -> Result<BinanceRestApi<ReqwestTransport>, ExchangeError> {
    Ok(BinanceRestApi::new(build_client(config)?))
}

/// Spawn a trade-flow aggregator against the configured stream host.
///
/// Needs no credentials; the aggTrade feed is public. Returns once the
/// initial connection attempt is dispatched.
pub fn build_aggregator(config: &ExchangeConfig, flow: TradeFlowConfig) -> TradeFlowHandle {
    TradeFlowAggregator::connect(stream_base_url(config), flow)
}
