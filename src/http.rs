//! HTTP [`Transport`] built on `reqwest`.
//!
//! - `probe` sends `HEAD` with `If-Modified-Since` when a marker is known;
//!   the `Last-Modified` header comes back as the new marker.
//! - `fetch` sends `GET` and reads the body up to `max_content_bytes`.
//!
//! Redirects are followed up to the configured limit; the status reported
//! is always the one of the final response.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{IF_MODIFIED_SINCE, LAST_MODIFIED};
use reqwest::{redirect, Client};

use webindex_core::transport::{ProbeResponse, ProbeStatus, Transport, TransportError};

use crate::config::HttpConfig;

pub struct HttpTransport {
    client: Client,
    max_content_bytes: u64,
}

impl HttpTransport {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .redirect(redirect::Policy::limited(config.max_redirects))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            max_content_bytes: config.max_content_bytes,
        })
    }
}

fn request_error(url: &str, err: reqwest::Error) -> TransportError {
    TransportError::Request {
        url: url.to_string(),
        message: err.to_string(),
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, TransportError> {
        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| request_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::UnexpectedStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let too_large = || TransportError::TooLarge {
            url: url.to_string(),
            limit: self.max_content_bytes,
        };
        if response
            .content_length()
            .is_some_and(|len| len > self.max_content_bytes)
        {
            return Err(too_large());
        }

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| request_error(url, e))? {
            if (body.len() + chunk.len()) as u64 > self.max_content_bytes {
                return Err(too_large());
            }
            body.extend_from_slice(&chunk);
        }
        tracing::debug!(url, bytes = body.len(), "fetched");
        Ok(body)
    }

    async fn probe(
        &self,
        url: &str,
        marker: Option<&str>,
    ) -> Result<ProbeResponse, TransportError> {
        let mut request = self.client.head(url);
        if let Some(marker) = marker {
            request = request.header(IF_MODIFIED_SINCE, marker);
        }
        let response = request.send().await.map_err(|e| request_error(url, e))?;

        let http_status = response.status().as_u16();
        let marker = response
            .headers()
            .get(LAST_MODIFIED)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        tracing::debug!(url, http_status, marker = ?marker, "probed");

        Ok(ProbeResponse {
            status: ProbeStatus::from_http_status(http_status),
            marker,
            http_status,
        })
    }
}
