//! Remote manifest download

use std::time::Duration;

use tracing::debug;

use crate::context::ManifestFetcher;
use crate::error::Result;

const USER_AGENT: &str = concat!("kubero-install/", env!("CARGO_PKG_VERSION"));

/// Fetches manifests over HTTPS
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

impl ManifestFetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        debug!(url, "fetching manifest");
        let response = self.client.get(url).send()?.error_for_status()?;
        let body = response.bytes()?;
        debug!(url, bytes = body.len(), "manifest fetched");
        Ok(body.to_vec())
    }
}
