//! Image retrieval for image elements

use std::collections::HashMap;
use std::time::Duration;

use thiserror::Error;

use crate::warnings::{Warning, WarningSink};

/// Bytes returned by an [`ImageFetcher`]
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedImage {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

#[derive(Debug, Error)]
pub enum ImageFetchError {
    #[error("HTTP status {0}")]
    Status(u16),

    #[error("unexpected content type: {0}")]
    ContentType(String),

    #[error("request timed out")]
    Timeout,

    #[error("transport error: {0}")]
    Transport(String),
}

/// Source of image bytes by URL
pub trait ImageFetcher {
    fn fetch(&self, url: &str, timeout: Duration) -> Result<FetchedImage, ImageFetchError>;
}

/// Blocking HTTP fetcher
#[cfg(feature = "http")]
pub struct HttpImageFetcher {
    client: reqwest::blocking::Client,
}

#[cfg(feature = "http")]
impl HttpImageFetcher {
    pub fn new() -> Result<Self, ImageFetchError> {
        let client = reqwest::blocking::Client::builder()
            .build()
            .map_err(|e| ImageFetchError::Transport(e.to_string()))?;
        Ok(Self { client })
    }
}

#[cfg(feature = "http")]
impl ImageFetcher for HttpImageFetcher {
    fn fetch(&self, url: &str, timeout: Duration) -> Result<FetchedImage, ImageFetchError> {
        let classify = |e: reqwest::Error| {
            if e.is_timeout() {
                ImageFetchError::Timeout
            } else {
                ImageFetchError::Transport(e.to_string())
            }
        };

        let response = self.client.get(url).timeout(timeout).send().map_err(classify)?;
        let status = response.status();
        if !status.is_success() {
            return Err(ImageFetchError::Status(status.as_u16()));
        }
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().map_err(classify)?.to_vec();
        Ok(FetchedImage {
            bytes,
            content_type,
        })
    }
}

/// Fetch outcomes of one render call, keyed by URL
///
/// Each distinct URL is fetched at most once; failures are remembered so
/// repeated references degrade the same way without refetching.
#[derive(Debug, Default)]
pub struct ImageCache {
    entries: HashMap<String, Option<Vec<u8>>>,
}

impl ImageCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch every URL not seen yet
    pub fn prefetch<'u>(
        &mut self,
        urls: impl IntoIterator<Item = &'u str>,
        fetcher: Option<&dyn ImageFetcher>,
        timeout: Duration,
        sink: &mut WarningSink,
    ) {
        for url in urls {
            if url.is_empty() || self.entries.contains_key(url) {
                continue;
            }
            let outcome = match fetcher {
                Some(fetcher) => fetch_checked(fetcher, url, timeout),
                None => Err(ImageFetchError::Transport("no image fetcher configured".into())),
            };
            let entry = match outcome {
                Ok(bytes) => {
                    log::debug!("fetched image {url} ({} bytes)", bytes.len());
                    Some(bytes)
                }
                Err(e) => {
                    sink.push(
                        Warning::image(format!("image fetch failed: {e}")).with("url", url),
                    );
                    None
                }
            };
            self.entries.insert(url.to_string(), entry);
        }
    }

    /// Bytes for a successfully fetched URL
    pub fn get(&self, url: &str) -> Option<&[u8]> {
        self.entries.get(url)?.as_deref()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn fetch_checked(
    fetcher: &dyn ImageFetcher,
    url: &str,
    timeout: Duration,
) -> Result<Vec<u8>, ImageFetchError> {
    let fetched = fetcher.fetch(url, timeout)?;
    match fetched.content_type.as_deref() {
        Some(ct) if !ct.trim().to_ascii_lowercase().starts_with("image/") => {
            Err(ImageFetchError::ContentType(ct.to_string()))
        }
        Some(_) => Ok(fetched.bytes),
        None => pdf_core::detect_format(&fetched.bytes)
            .map(|_| fetched.bytes)
            .map_err(|_| ImageFetchError::ContentType("unknown".to_string())),
    }
}
