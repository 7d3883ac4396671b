//! CLIP vision embedding backend.
//!
//! Talks HTTP to a locally-hosted CLIP embedding service. The model is
//! loaded by the service on demand; this backend triggers that load
//! exactly once per process via a guarded one-time initializer, so
//! concurrent first requests await the same in-flight load instead of
//! racing independent ones. A failed load is not cached; the next
//! request retries it.

use std::io::Write;

use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;
use tracing::{debug, info};

use concierge_core::{
    defaults, l2_normalize, Error, ImageEmbeddingBackend, ImageSource, Result, Vector,
};

/// Vision backend backed by a locally-hosted CLIP service.
pub struct ClipVisionBackend {
    base_url: String,
    model: String,
    client: reqwest::Client,
    timeout_secs: u64,
    loaded: OnceCell<()>,
}

impl ClipVisionBackend {
    pub fn new(base_url: String, model: String) -> Self {
        Self {
            base_url,
            model,
            client: reqwest::Client::new(),
            timeout_secs: defaults::INFERENCE_TIMEOUT_SECS,
            loaded: OnceCell::new(),
        }
    }

    /// Create from environment variables.
    pub fn from_env() -> Self {
        let base_url = std::env::var(defaults::ENV_VISION_SERVICE_URL)
            .unwrap_or_else(|_| defaults::VISION_SERVICE_URL.to_string());
        let model = std::env::var(defaults::ENV_VISION_MODEL)
            .unwrap_or_else(|_| defaults::IMAGE_EMBED_MODEL.to_string());
        Self::new(base_url, model)
    }

    /// Trigger the service-side model load once per process lifetime.
    async fn ensure_loaded(&self) -> Result<()> {
        self.loaded
            .get_or_try_init(|| async {
                info!(
                    subsystem = "inference",
                    component = "clip",
                    model = %self.model,
                    "Loading CLIP vision model (first image request)"
                );

                let url = format!("{}/load", self.base_url);
                let response = self
                    .client
                    .post(&url)
                    .json(&LoadRequest {
                        model: self.model.clone(),
                    })
                    .timeout(std::time::Duration::from_secs(self.timeout_secs))
                    .send()
                    .await
                    .map_err(|e| Error::Embedding(format!("Vision model load failed: {}", e)))?;

                if !response.status().is_success() {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    return Err(Error::Embedding(format!(
                        "Vision service returned {} on load: {}",
                        status, body
                    )));
                }

                info!(
                    subsystem = "inference",
                    component = "clip",
                    model = %self.model,
                    "CLIP vision model loaded"
                );
                Ok(())
            })
            .await
            .copied()
    }

    async fn embed_reference(&self, image: &str) -> Result<Vec<f32>> {
        let url = format!("{}/embed", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&EmbedRequest {
                model: self.model.clone(),
                image: image.to_string(),
            })
            .timeout(std::time::Duration::from_secs(self.timeout_secs))
            .send()
            .await
            .map_err(|e| Error::Embedding(format!("Vision request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Embedding(format!(
                "Vision service returned {}: {}",
                status, body
            )));
        }

        let result: EmbedResponse = response
            .json()
            .await
            .map_err(|e| Error::Embedding(format!("Failed to parse vision response: {}", e)))?;

        Ok(result.embedding)
    }

    /// Write a data-URI payload to a scoped temp file and return the
    /// handle. The file is removed when the handle drops, on every
    /// exit path of the caller.
    fn materialize_data_uri(mime: &str, data: &str) -> Result<tempfile::NamedTempFile> {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(data)
            .map_err(|e| Error::UnsupportedFormat(format!("invalid base64 payload: {}", e)))?;

        let suffix = match mime {
            "image/png" => ".png",
            "image/webp" => ".webp",
            "image/gif" => ".gif",
            _ => ".jpg",
        };

        let mut file = tempfile::Builder::new()
            .prefix("concierge_image_")
            .suffix(suffix)
            .tempfile()?;
        file.write_all(&bytes)?;
        file.flush()?;

        debug!(
            subsystem = "inference",
            component = "clip",
            bytes = bytes.len(),
            path = %file.path().display(),
            "Materialized data URI to temp file"
        );

        Ok(file)
    }
}

#[derive(Serialize)]
struct LoadRequest {
    model: String,
}

#[derive(Serialize)]
struct EmbedRequest {
    model: String,
    /// Image reference: remote URL or local file path.
    image: String,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

#[async_trait]
impl ImageEmbeddingBackend for ClipVisionBackend {
    async fn embed_image(&self, image: &ImageSource) -> Result<Vector> {
        // Materialize before touching the service so malformed input
        // fails without a network round-trip. The temp file handle
        // must outlive the embed call.
        let (reference, _guard) = match image {
            ImageSource::Url(url) => (url.clone(), None),
            ImageSource::DataUri { mime, data } => {
                let file = Self::materialize_data_uri(mime, data)?;
                (file.path().display().to_string(), Some(file))
            }
        };

        self.ensure_loaded().await?;

        let raw = self.embed_reference(&reference).await?;

        if raw.len() != self.dimension() {
            return Err(Error::Embedding(format!(
                "Vision service returned {} dimensions, expected {}",
                raw.len(),
                self.dimension()
            )));
        }

        debug!(
            subsystem = "inference",
            component = "clip",
            dimension = raw.len(),
            "Image embedding generated"
        );

        l2_normalize(raw).map(Vector::from)
    }

    fn dimension(&self) -> usize {
        defaults::IMAGE_EMBED_DIMENSION
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
