use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Uniform outcome of every REST call.
///
/// Callers never see transport faults directly; failures are folded into an
/// envelope with `success == false` and a short classification in `message`.
/// `message` is for humans and is never parsed downstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub success: bool,
    pub status_code: u16,
    pub body: String,
    pub message: String,
}

impl ResponseEnvelope {
    /// Build an envelope from an HTTP status and raw body.
    pub fn from_status(status_code: u16, body: String, context: &str) -> Self {
        let success = (200..300).contains(&status_code);
        let message = if success {
            format!("{} succeeded", context)
        } else {
            format!("{} failed with HTTP {}", context, status_code)
        };
        Self {
            success,
            status_code,
            body,
            message,
        }
    }

    /// Build a failure envelope for a fault that never reached the server.
    /// Status code 0 marks the absence of an HTTP response.
    pub fn transport_failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            status_code: 0,
            body: String::new(),
            message: message.into(),
        }
    }
}

/// Direction of an executed trade, as seen from the aggressor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeSide {
    Buy,
    Sell,
}

/// What the flow accumulators fold per trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AggregationMode {
    /// Sum of price * quantity per side.
    Notional,
    /// One unit per trade per side.
    Count,
}

/// Published view of one aggregation window, emitted once per interval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowSnapshot {
    pub window_start: DateTime<Utc>,
    pub buy_total: Decimal,
    pub sell_total: Decimal,
}

/// Lifecycle of the streaming connection.
///
/// `Connecting -> Open -> Closed -> Reconnecting -> Connecting -> ...`
/// There is no terminal state short of an explicit shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closed,
    Reconnecting,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_success_range() {
        assert!(ResponseEnvelope::from_status(200, String::new(), "ping").success);
        assert!(ResponseEnvelope::from_status(204, String::new(), "ping").success);
        assert!(ResponseEnvelope::from_status(299, String::new(), "ping").success);
        assert!(!ResponseEnvelope::from_status(199, String::new(), "ping").success);
        assert!(!ResponseEnvelope::from_status(300, String::new(), "ping").success);
        assert!(!ResponseEnvelope::from_status(401, String::new(), "ping").success);
        assert!(!ResponseEnvelope::from_status(500, String::new(), "ping").success);
    }

    #[test]
    fn test_transport_failure_has_no_status() {
        let envelope = ResponseEnvelope::transport_failure("connection refused");
        assert!(!envelope.success);
        assert_eq!(envelope.status_code, 0);
        assert!(envelope.body.is_empty());
    }
}
