use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::debug;

use crate::core::constants::network;
use crate::error::{ResolverError, ResolverResult};

/// Shared HTTP client wrapper.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new() -> ResolverResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(network::DEFAULT_TIMEOUT_SECS))
            .user_agent(network::USER_AGENT)
            .build()?;
        Ok(Self { client })
    }

    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// GET returning the response body as text; a non-success status is an
    /// error naming the URL.
    pub async fn get_text(&self, url: &str) -> ResolverResult<String> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ResolverError::network(format!(
                "server returned {status} (URL: {url})"
            )));
        }
        Ok(response.text().await?)
    }

    /// Issues a single request with redirects disabled and returns the
    /// `Location` target when the server answers with a redirect.
    pub async fn capture_redirect(&self, url: &str) -> ResolverResult<Option<String>> {
        let probe = Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(Duration::from_secs(network::DEFAULT_TIMEOUT_SECS))
            .user_agent(network::USER_AGENT)
            .build()?;
        let response = probe.get(url).send().await?;
        let status = response.status();
        if status == StatusCode::MOVED_PERMANENTLY || status == StatusCode::FOUND {
            let location = response
                .headers()
                .get(reqwest::header::LOCATION)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            debug!(url, ?location, "captured redirect");
            return Ok(location);
        }
        debug!(url, %status, "no redirect provided");
        Ok(None)
    }
}
