//! Curl-backed HTTP GET fetcher.

use std::time::Duration;

use super::{FetchError, Fetcher};

/// Fetches a URL into memory with a single GET and a bounded timeout.
///
/// Peer/host TLS verification is disabled: the report URL corpus is full of
/// hosts with broken certificate chains, and a fetch that fails on those
/// would lose documents the system is expected to collect.
pub struct CurlFetcher {
    timeout: Duration,
}

impl CurlFetcher {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Fetcher for CurlFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let mut easy = curl::easy::Easy::new();
        easy.url(url)?;
        easy.follow_location(true)?;
        easy.max_redirections(10)?;
        easy.connect_timeout(Duration::from_secs(10))?;
        easy.timeout(self.timeout)?;
        easy.ssl_verify_peer(false)?;
        easy.ssl_verify_host(false)?;
        easy.useragent("brd/0.1")?;

        let mut body = Vec::new();
        {
            let mut transfer = easy.transfer();
            transfer.write_function(|data| {
                body.extend_from_slice(data);
                Ok(data.len())
            })?;
            transfer.perform()?;
        }

        let code = easy.response_code()?;
        if !(200..300).contains(&code) {
            return Err(FetchError::Http(code));
        }
        Ok(body)
    }
}
