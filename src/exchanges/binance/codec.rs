use crate::core::errors::ExchangeError;
use crate::core::kernel::WsCodec;
use crate::exchanges::binance::types::BinanceAggTrade;
use serde_json::Value;
use tokio_tungstenite::tungstenite::Message;

/// Codec for the aggTrade stream.
///
/// Subscription acks and unknown event types are filtered (`Ok(None)`);
/// malformed trade payloads fail with a per-frame `DeserializationError` that
/// never affects connection state.
pub struct AggTradeCodec;

impl WsCodec for AggTradeCodec {
    type Message = BinanceAggTrade;

    fn decode_message(&self, message: Message) -> Result<Option<Self::Message>, ExchangeError> {
        let text = match message {
            Message::Text(text) => text,
            Message::Binary(data) => String::from_utf8(data).map_err(|e| {
                ExchangeError::DeserializationError(format!(
                    "Invalid UTF-8 in binary message: {}",
                    e
                ))
            })?,
            _ => return Ok(None), // Ignore other message types
        };

        let value: Value = serde_json::from_str(&text).map_err(|e| {
            ExchangeError::DeserializationError(format!("Failed to parse JSON: {}", e))
        })?;

        // Combined stream format wraps the event in {"stream": ..., "data": ...}
        let payload = value.get("data").unwrap_or(&value);

        // Subscription confirmations and errors carry no event type
        match payload.get("e").and_then(|e| e.as_str()) {
            Some("aggTrade") => {
                let trade: BinanceAggTrade =
                    serde_json::from_value(payload.clone()).map_err(|e| {
                        ExchangeError::DeserializationError(format!(
                            "Failed to parse aggTrade: {}",
                            e
                        ))
                    })?;
                Ok(Some(trade))
            }
            _ => Ok(None),
        }
    }
}

/// Stream identifier for a symbol's aggTrade channel.
pub fn agg_trade_stream(symbol: &str) -> String {
    format!("{}@aggTrade", symbol.to_lowercase())
}
