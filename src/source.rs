use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use log::debug;
use url::Url;

use crate::errors::SourceError;

// @module: Caption byte sources (local files and HTTP)

/// Connect timeout used when none is configured
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_millis(4000);

/// Read timeout used when none is configured
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(60000);

/// Supplies the raw bytes of a caption document
#[async_trait]
pub trait CaptionSource: Send + Sync {
    /// Fetch the whole document behind `locator`
    async fn open(&self, locator: &str) -> Result<Bytes, SourceError>;
}

/// Where a locator points to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    File(PathBuf),
    Remote(Url),
}

/// Resolve a `file://` URL, an `http(s)://` URL or a bare path
pub fn resolve_locator(locator: &str) -> Result<Locator, SourceError> {
    let locator = locator.trim();
    if locator.is_empty() {
        return Err(SourceError::EmptyLocator);
    }

    match Url::parse(locator) {
        Ok(url) => match url.scheme() {
            "file" => url
                .to_file_path()
                .map(Locator::File)
                .map_err(|_| SourceError::CreateStreamFailed(format!("Invalid file URL: {}", locator))),
            "http" | "https" => Ok(Locator::Remote(url)),
            // drive letters such as C:\captions.ttml parse as a one-letter scheme
            scheme if scheme.len() == 1 => Ok(Locator::File(PathBuf::from(locator))),
            scheme => Err(SourceError::CreateStreamFailed(format!(
                "Unsupported scheme \"{}\" in {}",
                scheme, locator
            ))),
        },
        Err(_) => Ok(Locator::File(PathBuf::from(locator))),
    }
}

/// Reads local files with tokio and remote documents with reqwest
pub struct DefaultCaptionSource {
    connect_timeout: Duration,
    read_timeout: Duration,
}

impl DefaultCaptionSource {
    pub fn new(connect_timeout: Duration, read_timeout: Duration) -> Self {
        DefaultCaptionSource {
            connect_timeout,
            read_timeout,
        }
    }

    async fn read_file(&self, path: PathBuf) -> Result<Bytes, SourceError> {
        debug!("Reading captions from {}", path.display());
        tokio::fs::read(&path)
            .await
            .map(Bytes::from)
            .map_err(|e| SourceError::Io(format!("{}: {}", path.display(), e)))
    }

    async fn fetch(&self, url: Url) -> Result<Bytes, SourceError> {
        debug!("Fetching captions from {}", url);
        let client = reqwest::Client::builder()
            .connect_timeout(self.connect_timeout)
            .timeout(self.read_timeout)
            .build()
            .map_err(|e| SourceError::CreateStreamFailed(e.to_string()))?;

        let response = client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| SourceError::Io(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Http {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        response.bytes().await.map_err(|e| SourceError::Io(e.to_string()))
    }
}

impl Default for DefaultCaptionSource {
    fn default() -> Self {
        Self::new(DEFAULT_CONNECT_TIMEOUT, DEFAULT_READ_TIMEOUT)
    }
}

#[async_trait]
impl CaptionSource for DefaultCaptionSource {
    async fn open(&self, locator: &str) -> Result<Bytes, SourceError> {
        match resolve_locator(locator)? {
            Locator::File(path) => self.read_file(path).await,
            Locator::Remote(url) => self.fetch(url).await,
        }
    }
}

/// In-memory documents keyed by locator
#[derive(Debug, Clone, Default)]
pub struct StaticCaptionSource {
    documents: HashMap<String, Bytes>,
}

impl StaticCaptionSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(mut self, locator: impl Into<String>, markup: impl Into<Bytes>) -> Self {
        self.documents.insert(locator.into(), markup.into());
        self
    }
}

#[async_trait]
impl CaptionSource for StaticCaptionSource {
    async fn open(&self, locator: &str) -> Result<Bytes, SourceError> {
        if locator.trim().is_empty() {
            return Err(SourceError::EmptyLocator);
        }
        self.documents
            .get(locator)
            .cloned()
            .ok_or_else(|| SourceError::CreateStreamFailed(format!("No document for {}", locator)))
    }
}
