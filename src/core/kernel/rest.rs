use crate::core::config::ConfigError;
use crate::core::errors::ExchangeError;
use async_trait::async_trait;
use reqwest::{Client, Method};
use tracing::{instrument, trace};

/// Raw HTTP outcome: status line plus body text, nothing interpreted.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

/// HTTP executor over fully-built URLs.
///
/// Signed exchanges are byte-sensitive: the transmitted query string must equal
/// the signed string exactly, so URL assembly (including the query) happens
/// above this layer and the transport performs no encoding of its own.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn execute(
        &self,
        method: Method,
        url: &str,
        headers: &[(&str, String)],
        form_body: Option<String>,
    ) -> Result<RawResponse, ExchangeError>;
}

/// Configuration for the HTTP transport
#[derive(Clone, Debug)]
pub struct TransportConfig {
    /// Exchange name for logging and tracing
    pub exchange_name: String,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// User agent string to include in requests
    pub user_agent: String,
}

impl TransportConfig {
    pub fn new(exchange_name: String) -> Self {
        Self {
            exchange_name,
            timeout_seconds: 30,
            user_agent: "binflow/0.1".to_string(),
        }
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout_seconds: u64) -> Self {
        self.timeout_seconds = timeout_seconds;
        self
    }

    /// Set the user agent string
    pub fn with_user_agent(mut self, user_agent: String) -> Self {
        self.user_agent = user_agent;
        self
    }
}

/// Builder for `ReqwestTransport` instances
pub struct TransportBuilder {
    config: TransportConfig,
}

impl TransportBuilder {
    pub fn new(config: TransportConfig) -> Self {
        Self { config }
    }

    pub fn build(self) -> Result<ReqwestTransport, ExchangeError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(self.config.timeout_seconds))
            .user_agent(&self.config.user_agent)
            .build()
            .map_err(|e| {
                ConfigError::InvalidConfiguration(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(ReqwestTransport {
            client,
            config: self.config,
        })
    }
}

/// Implementation of `HttpTransport` using reqwest
#[derive(Clone)]
pub struct ReqwestTransport {
    client: Client,
    config: TransportConfig,
}

impl std::fmt::Debug for ReqwestTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestTransport")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ReqwestTransport {
    pub fn new(exchange_name: String) -> Result<Self, ExchangeError> {
        TransportBuilder::new(TransportConfig::new(exchange_name)).build()
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    #[instrument(skip(self, headers, form_body), fields(exchange = %self.config.exchange_name, method = %method))]
    async fn execute(
        &self,
        method: Method,
        url: &str,
        headers: &[(&str, String)],
        form_body: Option<String>,
    ) -> Result<RawResponse, ExchangeError> {
        let mut request = self.client.request(method, url);

        for (key, value) in headers {
            request = request.header(*key, value.as_str());
        }

        if let Some(body) = form_body {
            request = request
                .header("Content-Type", "application/x-www-form-urlencoded")
                .body(body);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ExchangeError::ConnectionTimeout(format!("Request timed out: {}", e))
            } else {
                ExchangeError::NetworkError(format!("Request failed: {}", e))
            }
        })?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| {
            ExchangeError::NetworkError(format!("Failed to read response body: {}", e))
        })?;

        trace!("Response status {}: {}", status, body);

        Ok(RawResponse { status, body })
    }
}
