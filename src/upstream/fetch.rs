//! Fetch functions - one outbound HTTP call per logical fetch, no retries

use crate::upstream::parse::{parse_json, parse_xml, XmlElement};
use crate::upstream::request::redacted;
use crate::upstream::types::UpstreamError;
use reqwest::{Client, StatusCode, Url};
use serde_json::Value;
use tracing::{debug, warn};

/// Shared HTTP client for every upstream family.
/// Cloning is cheap; clones share one connection pool.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    http: Client,
}

impl UpstreamClient {
    pub fn new() -> Result<Self, UpstreamError> {
        let http = Client::builder()
            .user_agent(concat!("kr-estate-backend/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(UpstreamClient { http })
    }

    /// GET `url` and return the body text.
    ///
    /// A 403 or a literal `Forbidden` body means the service key is still
    /// pending activation and is reported as [`UpstreamError::NotActivated`].
    pub async fn get_text(&self, url: &Url) -> Result<String, UpstreamError> {
        debug!("GET {}", redacted(url));

        let response = self.http.get(url.clone()).send().await?;
        let status = response.status();
        let body = response.text().await?;

        check_response(status, &body)?;

        debug!("Received {} bytes ({})", body.len(), status);
        Ok(body)
    }

    pub async fn get_json(&self, url: &Url) -> Result<Value, UpstreamError> {
        let body = self.get_text(url).await?;
        parse_json(&body)
    }

    pub async fn get_xml(&self, url: &Url) -> Result<XmlElement, UpstreamError> {
        let body = self.get_text(url).await?;
        Ok(parse_xml(&body))
    }
}

/// Classify an upstream response by status and body
fn check_response(status: StatusCode, body: &str) -> Result<(), UpstreamError> {
    if status == StatusCode::FORBIDDEN || body.trim() == "Forbidden" {
        warn!("Upstream answered Forbidden (key not activated yet)");
        return Err(UpstreamError::NotActivated);
    }

    if !status.is_success() {
        return Err(UpstreamError::Status(status.as_u16()));
    }

    Ok(())
}
