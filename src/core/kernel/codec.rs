use crate::core::errors::ExchangeError;
use tokio_tungstenite::tungstenite::Message;

/// Codec contract for exchange-specific WebSocket message handling.
///
/// Control frames (ping, pong, close) never reach the codec; they are handled
/// at the transport level. Subscriptions ride on the connection URL, so the
/// codec's only job is turning inbound frames into typed messages.
pub trait WsCodec: Send + Sync + 'static {
    /// The type representing parsed messages from this feed
    type Message: Send + Sync;

    /// Decode a raw WebSocket message into a typed message
    ///
    /// # Returns
    /// - `Ok(Some(message))` - Successfully decoded message
    /// - `Ok(None)` - Message was ignored/filtered by the codec
    /// - `Err(error)` - Failed to decode message
    fn decode_message(&self, message: Message) -> Result<Option<Self::Message>, ExchangeError>;
}
