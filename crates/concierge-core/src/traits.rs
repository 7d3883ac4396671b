//! Core traits for concierge abstractions.
//!
//! These traits define the interfaces that concrete implementations
//! must satisfy, enabling pluggable backends and testability.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{CatalogItem, ImageSource, Modality, Vector};
use crate::price::PriceFilter;

// =============================================================================
// EMBEDDING BACKENDS
// =============================================================================

/// Backend producing text embeddings.
///
/// Implementations return unit-norm vectors of [`dimension`] components;
/// normalization is the backend's responsibility.
///
/// [`dimension`]: EmbeddingBackend::dimension
#[async_trait]
pub trait EmbeddingBackend: Send + Sync {
    /// Embed a batch of texts, one vector per input, in order.
    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vector>>;

    /// Output embedding dimension.
    fn dimension(&self) -> usize;

    /// Model slug in use.
    fn model_name(&self) -> &str;
}

/// Backend producing image embeddings from a parsed [`ImageSource`].
///
/// Image and text embedding spaces are disjoint and never compared
/// cross-modality.
#[async_trait]
pub trait ImageEmbeddingBackend: Send + Sync {
    /// Embed a single image. Returns a unit-norm vector.
    async fn embed_image(&self, image: &ImageSource) -> Result<Vector>;

    /// Output embedding dimension.
    fn dimension(&self) -> usize;

    /// Model slug in use.
    fn model_name(&self) -> &str;
}

// =============================================================================
// GENERATION BACKEND
// =============================================================================

/// Per-call options for a generation request.
#[derive(Debug, Clone, Default)]
pub struct GenerationOptions {
    /// Sampling temperature; backend default when unset.
    pub temperature: Option<f32>,
    /// Output token cap; backend default when unset.
    pub max_tokens: Option<u32>,
    /// Request structured-JSON response mode.
    pub json_mode: bool,
}

/// Backend for chat-completion style text generation.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Generate a completion for `prompt` under `system` instructions.
    async fn generate_with_system(
        &self,
        system: &str,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String>;

    /// Model slug in use.
    fn model_name(&self) -> &str;
}

// =============================================================================
// CATALOG RETRIEVAL
// =============================================================================

/// Repository for filtered nearest-neighbor catalog retrieval.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// Similarity search against the embedding column selected by
    /// `modality`, optionally constrained by `price`. Results are
    /// ordered by descending similarity, truncated to `limit`.
    async fn search(
        &self,
        encoded_vector: &str,
        modality: Modality,
        limit: i64,
        price: &PriceFilter,
    ) -> Result<Vec<CatalogItem>>;
}

// =============================================================================
// IMAGE FETCHING
// =============================================================================

/// External collaborator that downloads a remote image URL and
/// materializes it as a base64 data URI.
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    /// Fetch `url` and return a `data:<mime>;base64,<payload>` URI.
    async fn fetch(&self, url: &str) -> Result<String>;
}
