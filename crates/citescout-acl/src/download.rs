//! Fetching paper PDFs to local files.

use std::future::Future;
use std::io::Write;
use std::path::Path;
use std::pin::Pin;
use std::time::Duration;

use futures_util::StreamExt;

use crate::AclError;

/// Streams the body at a URL into a local file.
pub trait PdfDownloader: Send + Sync {
    /// Download `url` to `dest`, returning the number of bytes written.
    /// A non-success HTTP status is an error.
    fn download<'a>(
        &'a self,
        url: &'a str,
        dest: &'a Path,
    ) -> Pin<Box<dyn Future<Output = Result<u64, AclError>> + Send + 'a>>;
}

/// [`PdfDownloader`] over reqwest.
#[derive(Debug, Clone)]
pub struct HttpDownloader {
    client: reqwest::Client,
}

impl HttpDownloader {
    pub fn new(timeout: Duration) -> Result<Self, AclError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("citescout/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| AclError::Download(e.to_string()))?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl PdfDownloader for HttpDownloader {
    fn download<'a>(
        &'a self,
        url: &'a str,
        dest: &'a Path,
    ) -> Pin<Box<dyn Future<Output = Result<u64, AclError>> + Send + 'a>> {
        Box::pin(async move {
            tracing::debug!(url, "downloading");
            let response = self
                .client
                .get(url)
                .send()
                .await
                .map_err(|e| AclError::Download(e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                return Err(AclError::Download(format!("HTTP {status} for {url}")));
            }

            let mut out = std::fs::File::create(dest)?;
            let mut stream = response.bytes_stream();
            let mut written: u64 = 0;
            while let Some(chunk) = stream.next().await {
                let chunk = chunk.map_err(|e| AclError::Download(e.to_string()))?;
                out.write_all(&chunk)?;
                written += chunk.len() as u64;
            }
            out.flush()?;
            Ok(written)
        })
    }
}
