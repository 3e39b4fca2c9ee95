use crate::core::config::ExchangeConfig;
use crate::core::errors::ExchangeError;
use crate::core::kernel::{HmacSha256Signer, HttpTransport, RawResponse, RequestSigner};
use crate::core::types::ResponseEnvelope;
use crate::exchanges::binance::signer::{build_query_string, current_timestamp_ms, with_timestamp};
use reqwest::Method;
use tracing::instrument;

const API_KEY_HEADER: &str = "X-MBX-APIKEY";

/// Authenticated Binance REST client.
///
/// Produces exactly two request shapes: public (no credentials attached) and
/// signed (timestamped, HMAC-signed, API key in the header). Every method
/// returns a [`ResponseEnvelope`]; transport faults are folded into failure
/// envelopes rather than surfaced as errors.
///
/// Credentials and host are fixed at construction, so methods take `&self` and
/// are freely invocable from concurrent call sites.
pub struct BinanceClient<T: HttpTransport> {
    transport: T,
    base_url: String,
    api_key: String,
    signer: HmacSha256Signer,
}

impl<T: HttpTransport> BinanceClient<T> {
    /// Create a client over an existing transport.
    ///
    /// Fails before any network activity if either credential is blank or the
    /// secret is unusable as HMAC key material.
    pub fn new(
        transport: T,
        base_url: String,
        config: &ExchangeConfig,
    ) -> Result<Self, ExchangeError> {
        config.validate()?;
        let signer = HmacSha256Signer::new(config.secret_key())?;

        Ok(Self {
            transport,
            base_url,
            api_key: config.api_key().to_string(),
            signer,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Issue an unauthenticated GET request.
    ///
    /// An empty parameter set produces a URL with no `?` suffix.
    #[instrument(skip(self, params), fields(endpoint = %path, param_count = params.len()))]
    pub async fn public_request(&self, path: &str, params: &[(&str, &str)]) -> ResponseEnvelope {
        let query_string = build_query_string(params);
        let url = if query_string.is_empty() {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}{}?{}", self.base_url, path, query_string)
        };

        self.envelope(
            self.transport.execute(Method::GET, &url, &[], None).await,
            path,
        )
    }

    /// Issue a signed GET request.
    ///
    /// The timestamp is injected immediately before signing, and the
    /// transmitted query string is byte-for-byte the signed string with
    /// `&signature=<hex>` appended.
    #[instrument(skip(self, params), fields(endpoint = %path, param_count = params.len()))]
    pub async fn signed_request(&self, path: &str, params: &[(&str, &str)]) -> ResponseEnvelope {
        let (canonical, signature) = match self.sign_params(params) {
            Ok(signed) => signed,
            Err(e) => return ResponseEnvelope::transport_failure(e.to_string()),
        };

        let url = format!(
            "{}{}?{}&signature={}",
            self.base_url, path, canonical, signature
        );
        let headers = [(API_KEY_HEADER, self.api_key.clone())];

        self.envelope(
            self.transport.execute(Method::GET, &url, &headers, None).await,
            path,
        )
    }

    /// Issue a signed POST request.
    ///
    /// Same signing discipline as [`Self::signed_request`], with the signed
    /// parameter string travelling in the form-encoded body instead of the
    /// URL. The signature covers only the parameter string.
    #[instrument(skip(self, params), fields(endpoint = %path, param_count = params.len()))]
    pub async fn signed_post(&self, path: &str, params: &[(&str, &str)]) -> ResponseEnvelope {
        let (canonical, signature) = match self.sign_params(params) {
            Ok(signed) => signed,
            Err(e) => return ResponseEnvelope::transport_failure(e.to_string()),
        };

        let url = format!("{}{}", self.base_url, path);
        let body = format!("{}&signature={}", canonical, signature);
        let headers = [(API_KEY_HEADER, self.api_key.clone())];

        self.envelope(
            self.transport
                .execute(Method::POST, &url, &headers, Some(body))
                .await,
            path,
        )
    }

    fn sign_params(&self, params: &[(&str, &str)]) -> Result<(String, String), ExchangeError> {
        let timestamp = current_timestamp_ms()?;
        let canonical = with_timestamp(&build_query_string(params), timestamp);
        let signature = self.signer.sign(&canonical);
        Ok((canonical, signature))
    }

    fn envelope(
        &self,
        result: Result<RawResponse, ExchangeError>,
        context: &str,
    ) -> ResponseEnvelope {
        match result {
            Ok(response) => ResponseEnvelope::from_status(response.status, response.body, context),
            Err(e) => ResponseEnvelope::transport_failure(format!("{} failed: {}", context, e)),
        }
    }
}
