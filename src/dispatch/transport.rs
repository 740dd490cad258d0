//! HTTP transport for endpoint calls.

use super::DispatchError;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Posts a JSON body and returns the decoded JSON response.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post_json(&self, url: &str, body: &Value) -> Result<Value, DispatchError>;
}

/// reqwest-backed transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Builds the client. Without `timeout_seconds` the reqwest default applies.
    pub fn new(timeout_seconds: Option<u64>) -> reqwest::Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = timeout_seconds {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        Ok(Self {
            client: builder.build()?,
        })
    }
}

/// Turn a reqwest error into a short reason.
fn describe(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        "request timed out".to_string()
    } else if err.is_connect() {
        format!("cannot connect ({})", err)
    } else {
        err.to_string()
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post_json(&self, url: &str, body: &Value) -> Result<Value, DispatchError> {
        debug!("POST {}", url);

        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| DispatchError::Transport {
                url: url.to_string(),
                reason: describe(&e),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DispatchError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        let text = response
            .text()
            .await
            .map_err(|e| DispatchError::Transport {
                url: url.to_string(),
                reason: describe(&e),
            })?;

        serde_json::from_str(&text).map_err(|e| DispatchError::InvalidBody {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }
}
