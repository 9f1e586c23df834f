use anyhow::{Context, Result};
use std::time::Duration;
use tracing::debug;

use crate::core::config::ProviderConfig;
use crate::core::errors::TranslationError;

/// Build the HTTP client shared by the translation and speech providers
pub fn build_http_client(config: &ProviderConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_seconds))
        .connect_timeout(Duration::from_secs(10))
        .pool_max_idle_per_host(10)
        .pool_idle_timeout(Duration::from_secs(90))
        .user_agent(concat!("sign-bridge/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to create HTTP client")
}

/// Send a request and hand back the response if the provider answered 2xx.
/// Non-success statuses become [`TranslationError::ProviderStatus`] with
/// the body text attached.
pub async fn send_checked(
    provider: &'static str,
    request: reqwest::RequestBuilder,
) -> Result<reqwest::Response, TranslationError> {
    let response = request
        .send()
        .await
        .map_err(|source| TranslationError::RequestFailed { provider, source })?;

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    debug!("{} request failed with status {}: {}", provider, status, body);
    Err(TranslationError::ProviderStatus {
        provider,
        status: status.as_u16(),
        body: body.chars().take(200).collect(),
    })
}
