//! Outbound request primitive.
//!
//! Every way a request can go wrong (timeout, bad status, transport fault,
//! undecodable body, cancellation) collapses to [`Upstream::Absent`]. The
//! cause is logged here and nowhere else.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::Client;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use url::Url;

use crate::config::GatewayConfig;
use crate::error::FetchFault;

/// What the upstream API gave us.
#[derive(Debug, Clone, PartialEq)]
pub enum Upstream {
    Payload(Value),
    Absent,
}

/// Something that can GET a URL and decode the JSON body.
#[async_trait]
pub trait JsonFetcher: Send + Sync {
    /// `Err` is reserved for faults that are not a failed request.
    async fn fetch_json(&self, url: &Url, cancel: &CancellationToken) -> Result<Upstream, FetchFault>;
}

/// [`JsonFetcher`] backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &GatewayConfig) -> Result<Self, reqwest::Error> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .timeout(config.timeout())
            .build()?;

        Ok(Self { client })
    }

    async fn get(&self, url: &Url) -> Upstream {
        info!("Making request to: {}", url);

        let response = match self.client.get(url.clone()).send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                error!("Timeout error for URL: {}", url);
                return Upstream::Absent;
            }
            Err(e) => {
                error!("Request error for URL {}: {}", url, e);
                return Upstream::Absent;
            }
        };

        let status = response.status();
        if !status.is_success() {
            error!("HTTP error {} for URL: {}", status.as_u16(), url);
            return Upstream::Absent;
        }

        match response.json::<Value>().await {
            Ok(payload) if is_empty_payload(&payload) => {
                warn!("Empty JSON body for URL: {}", url);
                Upstream::Absent
            }
            Ok(payload) => Upstream::Payload(payload),
            Err(e) if e.is_timeout() => {
                error!("Timeout error for URL: {}", url);
                Upstream::Absent
            }
            Err(e) => {
                error!("Invalid JSON for URL {}: {}", url, e);
                Upstream::Absent
            }
        }
    }
}

/// `null`, `false`, zero, and empty strings, arrays or objects carry no data.
fn is_empty_payload(payload: &Value) -> bool {
    match payload {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(fields) => fields.is_empty(),
    }
}

#[async_trait]
impl JsonFetcher for HttpFetcher {
    async fn fetch_json(&self, url: &Url, cancel: &CancellationToken) -> Result<Upstream, FetchFault> {
        tokio::select! {
            upstream = self.get(url) => Ok(upstream),
            _ = cancel.cancelled() => {
                warn!("Request cancelled for URL: {}", url);
                Ok(Upstream::Absent)
            }
        }
    }
}
