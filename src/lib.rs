pub mod core;
pub mod exchanges;

pub use core::{errors::ExchangeError, types::*};
pub use exchanges::binance::{
    build_aggregator, build_client, build_rest_api, BinanceClient, BinanceRestApi,
    TradeFlowAggregator, TradeFlowConfig, TradeFlowHandle,
};
