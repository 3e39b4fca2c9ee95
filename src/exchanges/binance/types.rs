use rust_decimal::Decimal;
use serde::Deserialize;

/// One `<symbol>@aggTrade` stream event.
///
/// Consumed and discarded immediately after updating the flow accumulators.
#[derive(Debug, Clone, Deserialize)]
pub struct BinanceAggTrade {
    #[serde(rename = "E")]
    pub event_time: i64,
    #[serde(rename = "s")]
    pub symbol: String,
    #[serde(rename = "p", with = "rust_decimal::serde::str")]
    pub price: Decimal,
    #[serde(rename = "q", with = "rust_decimal::serde::str")]
    pub quantity: Decimal,
    /// `true` when the buyer was the maker, i.e. the aggressor sold.
    #[serde(rename = "m")]
    pub is_buyer_maker: bool,
}

impl BinanceAggTrade {
    /// Quote-denominated value of the trade.
    pub fn notional(&self) -> Decimal {
        self.price * self.quantity
    }
}
