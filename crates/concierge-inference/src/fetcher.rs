//! Remote image URL fetching.

use async_trait::async_trait;
use base64::Engine;
use tracing::{debug, warn};

use concierge_core::{defaults, Error, ImageFetcher, Result};

/// Downloads a remote image and re-packages it as a base64 data URI.
pub struct HttpImageFetcher {
    client: reqwest::Client,
}

impl HttpImageFetcher {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(
                defaults::IMAGE_FETCH_TIMEOUT_SECS,
            ))
            .build()
            .map_err(|e| Error::ImageFetch(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        debug!(
            subsystem = "inference",
            component = "fetcher",
            url = url,
            "Fetching remote image"
        );

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::ImageFetch(format!("Failed to fetch image: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::ImageFetch(format!(
                "Failed to fetch image: {}",
                response.status()
            )));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.split(';').next().unwrap_or(s).trim().to_string());

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::ImageFetch(format!("Failed to read image body: {}", e)))?;

        // Prefer the declared content type, fall back to magic-byte
        // sniffing, then to jpeg.
        let mime = content_type
            .filter(|ct| ct.starts_with("image/"))
            .or_else(|| infer::get(&bytes).map(|kind| kind.mime_type().to_string()))
            .unwrap_or_else(|| {
                warn!(
                    subsystem = "inference",
                    component = "fetcher",
                    url = url,
                    "No usable content type, assuming image/jpeg"
                );
                "image/jpeg".to_string()
            });

        let encoded = base64::engine::general_purpose::STANDARD.encode(&bytes);
        Ok(format!("data:{};base64,{}", mime, encoded))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetcher_builds() {
        assert!(HttpImageFetcher::new().is_ok());
    }

    #[tokio::test]
    async fn test_unreachable_url_is_a_fetch_error() {
        let fetcher = HttpImageFetcher::new().unwrap();
        let err = fetcher.fetch("http://127.0.0.1:1/shoe.jpg").await.unwrap_err();
        assert!(matches!(err, Error::ImageFetch(_)));
    }
}
