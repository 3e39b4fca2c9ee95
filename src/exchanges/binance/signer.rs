use crate::core::errors::ExchangeError;
use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall-clock time in milliseconds since the epoch.
///
/// Must be taken at the moment of signing; the exchange rejects requests whose
/// timestamp drifts beyond its tolerance window.
#[allow(clippy::cast_possible_truncation)]
pub fn current_timestamp_ms() -> Result<u64, ExchangeError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_millis() as u64)
        .map_err(|e| ExchangeError::Other(format!("System time error: {}", e)))
}

/// Join parameters into the canonical `key=value&key=value` form.
///
/// Values are concatenated raw, in caller order, with no URL encoding: the
/// signed string and the transmitted string must be byte-for-byte identical,
/// so callers pass pre-formatted values (uppercase symbols, plain decimals).
#[must_use]
pub fn build_query_string(params: &[(&str, &str)]) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

/// Append the millisecond timestamp as the final canonical parameter.
#[must_use]
pub fn with_timestamp(query_string: &str, timestamp: u64) -> String {
    if query_string.is_empty() {
        format!("timestamp={}", timestamp)
    } else {
        format!("{}&timestamp={}", query_string, timestamp)
    }
}
