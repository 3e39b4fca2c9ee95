use crate::core::kernel::HttpTransport;
use crate::core::types::ResponseEnvelope;
use crate::exchanges::binance::client::BinanceClient;

const DEFAULT_RECV_WINDOW: &str = "5000";
const DEFAULT_TRADE_LIMIT: &str = "500";

/// Thin named wrappers over [`BinanceClient`] for the common spot endpoints.
///
/// These methods add no logic beyond endpoint names, default parameters and
/// symbol normalization; the raw JSON body in the envelope is the product.
pub struct BinanceRestApi<T: HttpTransport> {
    client: BinanceClient<T>,
}

impl<T: HttpTransport> BinanceRestApi<T> {
    pub fn new(client: BinanceClient<T>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &BinanceClient<T> {
        &self.client
    }

    /// Test connectivity; the server answers `{}`.
    pub async fn ping(&self) -> ResponseEnvelope {
        self.client.public_request("/api/v3/ping", &[]).await
    }

    /// Current server time in milliseconds.
    pub async fn server_time(&self) -> ResponseEnvelope {
        self.client.public_request("/api/v3/time", &[]).await
    }

    /// Exchange trading rules and symbol list.
    pub async fn exchange_info(&self) -> ResponseEnvelope {
        self.client.public_request("/api/v3/exchangeInfo", &[]).await
    }

    /// Latest price for a symbol.
    pub async fn ticker_price(&self, symbol: &str) -> ResponseEnvelope {
        let Some(symbol) = normalize_symbol(symbol) else {
            return blank_symbol_failure();
        };
        self.client
            .public_request("/api/v3/ticker/price", &[("symbol", symbol.as_str())])
            .await
    }

    /// Account balances, commissions and permissions.
    pub async fn account_info(&self) -> ResponseEnvelope {
        self.client
            .signed_request("/api/v3/account", &[("recvWindow", DEFAULT_RECV_WINDOW)])
            .await
    }

    /// The account's trade history for a symbol.
    pub async fn my_trades(&self, symbol: &str) -> ResponseEnvelope {
        let Some(symbol) = normalize_symbol(symbol) else {
            return blank_symbol_failure();
        };
        self.client
            .signed_request(
                "/api/v3/myTrades",
                &[("symbol", symbol.as_str()), ("limit", DEFAULT_TRADE_LIMIT)],
            )
            .await
    }

    /// Open orders for one symbol, or across the whole account.
    pub async fn open_orders(&self, symbol: Option<&str>) -> ResponseEnvelope {
        match symbol {
            Some(symbol) => {
                let Some(symbol) = normalize_symbol(symbol) else {
                    return blank_symbol_failure();
                };
                self.client
                    .signed_request("/api/v3/openOrders", &[("symbol", symbol.as_str())])
                    .await
            }
            None => self.client.signed_request("/api/v3/openOrders", &[]).await,
        }
    }
}

fn normalize_symbol(symbol: &str) -> Option<String> {
    let trimmed = symbol.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_uppercase())
    }
}

fn blank_symbol_failure() -> ResponseEnvelope {
    ResponseEnvelope::transport_failure("symbol must not be empty")
}
