//! HTTP client shared by every external probe.

use anyhow::{Context, Result};
use log::debug;
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;

use super::retry::with_retry;

/// User agent sent with every probe. GitHub rejects requests without one.
pub const USER_AGENT: &str = concat!("validate-registry/", env!("CARGO_PKG_VERSION"));

/// Default bound on a single request, after which the probe fails closed.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Thin wrapper around a reqwest [`Client`] with retry on transport errors.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Creates a new HTTP client wrapping the given reqwest Client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Builds a client whose requests give up after `timeout`.
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self::new(client))
    }

    /// Sends a HEAD request (redirects are followed) and returns the final status.
    #[tracing::instrument(skip(self))]
    pub async fn head(&self, url: &str) -> Result<StatusCode> {
        debug!("HEAD {}", url);

        with_retry("HEAD", || {
            let client = self.client.clone();
            let url = url.to_string();
            async move {
                let response = client.head(&url).send().await?;
                Ok(response.status())
            }
        })
        .await
        .with_context(|| format!("Failed to reach {}", url))
    }

    /// POSTs a JSON body, optionally with a bearer token, and returns the status
    /// together with the decoded JSON body (`None` for non-success statuses).
    #[tracing::instrument(skip(self, token, body))]
    pub async fn post_json(
        &self,
        url: &str,
        token: Option<&str>,
        body: &Value,
    ) -> Result<(StatusCode, Option<Value>)> {
        debug!("POST JSON to {}", url);

        let response = with_retry("POST JSON", || {
            let mut request = self.client.post(url).json(body);
            if let Some(token) = token {
                request = request.header(AUTHORIZATION, format!("bearer {}", token));
            }
            async move { Ok(request.send().await?) }
        })
        .await
        .with_context(|| format!("Failed to reach {}", url))?;

        let status = response.status();
        if !status.is_success() {
            return Ok((status, None));
        }

        let value = response
            .json::<Value>()
            .await
            .context("Failed to parse JSON response")?;

        Ok((status, Some(value)))
    }
}
