use std::io::Read;

use async_trait::async_trait;
use flate2::read::GzDecoder;

use crate::core::error::{Error, ErrorKind, Result};

const GZIP_MAGIC: [u8; 3] = [0x1F, 0x8B, 0x08];

/// Transport abstraction over artifact bytes (§4.3, §6 "transport
/// expectation"). Swappable so tests run against an in-memory fixture
/// instead of a real HTTP server.
#[async_trait]
pub trait ArtifactFetcher: Send + Sync {
    async fn get(&self, path: &str) -> Result<Vec<u8>>;
}

/// Auto-detects and inflates a gzip-encoded body; returns the input
/// unchanged if it does not start with the gzip magic bytes.
pub fn maybe_inflate(body: Vec<u8>) -> Result<Vec<u8>> {
    if body.len() >= 3 && body[..3] == GZIP_MAGIC {
        let mut decoder = GzDecoder::new(&body[..]);
        let mut out = Vec::new();
        decoder
            .read_to_end(&mut out)
            .map_err(|e| Error::new(ErrorKind::Parse, format!("gzip inflate failed: {e}")))?;
        Ok(out)
    } else {
        Ok(body)
    }
}

/// `reqwest`-backed fetcher that resolves artifact paths against a base URL.
pub struct HttpFetcher {
    client: reqwest::Client,
    base_url: String,
}

impl HttpFetcher {
    pub fn new(base_url: impl Into<String>) -> Self {
        HttpFetcher { client: reqwest::Client::new(), base_url: base_url.into() }
    }
}

#[async_trait]
impl ArtifactFetcher for HttpFetcher {
    async fn get(&self, path: &str) -> Result<Vec<u8>> {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), path.trim_start_matches('/'));
        let resp = self.client.get(&url).send().await?;
        if !resp.status().is_success() {
            return Err(Error::new(
                ErrorKind::NotFound,
                format!("{url}: http status {}", resp.status()),
            ));
        }
        let body = resp.bytes().await?.to_vec();
        maybe_inflate(body)
    }
}
