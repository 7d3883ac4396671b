//! Mock backends for deterministic testing.
//!
//! Provides mock implementations of the inference and retrieval trait
//! seams that generate deterministic embeddings and scripted responses.
//! Enabled for consumer crates via the `mock` feature.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use concierge_core::{
    CatalogItem, CatalogRepository, EmbeddingBackend, Error, GenerationBackend, GenerationOptions,
    ImageEmbeddingBackend, ImageFetcher, ImageSource, Modality, PriceFilter, Result, Vector,
};

fn deterministic_unit_vector(seed_text: &str, dimension: usize) -> Vector {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    seed_text.hash(&mut hasher);
    let mut rng = StdRng::seed_from_u64(hasher.finish());

    let raw: Vec<f32> = (0..dimension).map(|_| rng.gen::<f32>() - 0.5).collect();
    let norm = raw.iter().map(|v| v * v).sum::<f32>().sqrt();
    Vector::from(raw.into_iter().map(|v| v / norm).collect::<Vec<_>>())
}

// =============================================================================
// GENERATION
// =============================================================================

/// Recorded generation call.
#[derive(Debug, Clone)]
pub struct MockGenerationCall {
    pub system: String,
    pub prompt: String,
    pub json_mode: bool,
}

/// Scripted generation backend. Responses are popped from a queue;
/// when the queue is empty the default response is returned.
pub struct MockGenerationBackend {
    responses: Mutex<VecDeque<String>>,
    default_response: String,
    fail: bool,
    calls: Mutex<Vec<MockGenerationCall>>,
}

impl Default for MockGenerationBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockGenerationBackend {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            default_response: "Mock response".to_string(),
            fail: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Queue a response for the next call.
    pub fn with_response(self, response: impl Into<String>) -> Self {
        self.responses.lock().unwrap().push_back(response.into());
        self
    }

    /// Set the response used when the queue is empty.
    pub fn with_default_response(mut self, response: impl Into<String>) -> Self {
        self.default_response = response.into();
        self
    }

    /// Make every call fail.
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Calls recorded so far.
    pub fn calls(&self) -> Vec<MockGenerationCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl GenerationBackend for MockGenerationBackend {
    async fn generate_with_system(
        &self,
        system: &str,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String> {
        self.calls.lock().unwrap().push(MockGenerationCall {
            system: system.to_string(),
            prompt: prompt.to_string(),
            json_mode: options.json_mode,
        });

        if self.fail {
            return Err(Error::Inference("mock generation failure".to_string()));
        }

        let queued = self.responses.lock().unwrap().pop_front();
        Ok(queued.unwrap_or_else(|| self.default_response.clone()))
    }

    fn model_name(&self) -> &str {
        "mock-gen"
    }
}

// =============================================================================
// TEXT EMBEDDING
// =============================================================================

/// Deterministic text embedding backend: the same input always yields
/// the same unit-norm vector.
pub struct MockEmbeddingBackend {
    dimension: usize,
    fail: bool,
    calls: AtomicUsize,
}

impl Default for MockEmbeddingBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockEmbeddingBackend {
    pub fn new() -> Self {
        Self {
            dimension: concierge_core::defaults::TEXT_EMBED_DIMENSION,
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = dimension;
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingBackend for MockEmbeddingBackend {
    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vector>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(Error::Embedding("mock embedding failure".to_string()));
        }
        Ok(texts
            .iter()
            .map(|t| deterministic_unit_vector(t, self.dimension))
            .collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        "mock-embed"
    }
}

// =============================================================================
// IMAGE EMBEDDING
// =============================================================================

/// Deterministic image embedding backend keyed on the image reference.
pub struct MockImageEmbeddingBackend {
    dimension: usize,
    fail: bool,
    calls: AtomicUsize,
}

impl Default for MockImageEmbeddingBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockImageEmbeddingBackend {
    pub fn new() -> Self {
        Self {
            dimension: concierge_core::defaults::IMAGE_EMBED_DIMENSION,
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageEmbeddingBackend for MockImageEmbeddingBackend {
    async fn embed_image(&self, image: &ImageSource) -> Result<Vector> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(Error::Embedding("mock image embedding failure".to_string()));
        }
        let seed = match image {
            ImageSource::Url(url) => url.clone(),
            ImageSource::DataUri { data, .. } => data.clone(),
        };
        Ok(deterministic_unit_vector(&seed, self.dimension))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        "mock-clip"
    }
}

// =============================================================================
// CATALOG
// =============================================================================

/// Recorded catalog search call.
#[derive(Debug, Clone)]
pub struct MockCatalogCall {
    pub modality: Modality,
    pub limit: i64,
    pub price: PriceFilter,
}

/// In-memory catalog repository over a fixed item set. Honors the
/// price filter and limit, and returns items in descending similarity
/// order like the real retriever.
pub struct MockCatalogRepository {
    items: Vec<CatalogItem>,
    fail: bool,
    calls: Mutex<Vec<MockCatalogCall>>,
}

impl Default for MockCatalogRepository {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl MockCatalogRepository {
    pub fn new(items: Vec<CatalogItem>) -> Self {
        Self {
            items,
            fail: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn calls(&self) -> Vec<MockCatalogCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CatalogRepository for MockCatalogRepository {
    async fn search(
        &self,
        _encoded_vector: &str,
        modality: Modality,
        limit: i64,
        price: &PriceFilter,
    ) -> Result<Vec<CatalogItem>> {
        self.calls.lock().unwrap().push(MockCatalogCall {
            modality,
            limit,
            price: *price,
        });

        if self.fail {
            return Err(Error::Search("mock catalog failure".to_string()));
        }

        let mut hits: Vec<CatalogItem> = self
            .items
            .iter()
            .filter(|item| price.min_price.map_or(true, |min| item.price >= min))
            .filter(|item| price.max_price.map_or(true, |max| item.price <= max))
            .cloned()
            .collect();
        hits.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        hits.truncate(limit as usize);
        Ok(hits)
    }
}

// =============================================================================
// IMAGE FETCHING
// =============================================================================

/// Scripted image fetcher: returns a synthetic data URI echoing the
/// requested URL, or fails.
pub struct MockImageFetcher {
    fail: bool,
    calls: Mutex<Vec<String>>,
}

impl Default for MockImageFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl MockImageFetcher {
    pub fn new() -> Self {
        Self {
            fail: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageFetcher for MockImageFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        self.calls.lock().unwrap().push(url.to_string());
        if self.fail {
            return Err(Error::ImageFetch("mock fetch failure".to_string()));
        }
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};
        let mut hasher = DefaultHasher::new();
        url.hash(&mut hasher);
        Ok(format!("data:image/jpeg;base64,bW9jay0{:x}", hasher.finish()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_embedding_is_deterministic_and_unit_norm() {
        let backend = MockEmbeddingBackend::new();
        let texts = vec!["running shoes".to_string()];
        let a = backend.embed_texts(&texts).await.unwrap();
        let b = backend.embed_texts(&texts).await.unwrap();
        assert_eq!(a[0].as_slice(), b[0].as_slice());
        assert_eq!(a[0].as_slice().len(), 384);

        let norm: f32 = a[0].as_slice().iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn test_mock_generation_queue_then_default() {
        let backend = MockGenerationBackend::new()
            .with_response("first")
            .with_default_response("later");
        let opts = GenerationOptions::default();
        assert_eq!(
            backend.generate_with_system("s", "p", &opts).await.unwrap(),
            "first"
        );
        assert_eq!(
            backend.generate_with_system("s", "p", &opts).await.unwrap(),
            "later"
        );
        assert_eq!(backend.call_count(), 2);
    }

    #[tokio::test]
    async fn test_mock_catalog_applies_price_filter() {
        let item = |id: &str, price: f64, similarity: f64| CatalogItem {
            id: id.to_string(),
            title: id.to_string(),
            img_url: String::new(),
            product_url: String::new(),
            stars: 4.0,
            price,
            similarity,
        };
        let repo = MockCatalogRepository::new(vec![
            item("cheap", 10.0, 0.9),
            item("mid", 50.0, 0.8),
            item("pricey", 200.0, 0.95),
        ]);

        let filter = PriceFilter {
            min_price: Some(20.0),
            max_price: Some(100.0),
        };
        let hits = repo.search("[]", Modality::Text, 5, &filter).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "mid");

        let all = repo
            .search("[]", Modality::Text, 5, &PriceFilter::default())
            .await
            .unwrap();
        assert_eq!(all.len(), 3);
        // Descending similarity
        assert_eq!(all[0].id, "pricey");
    }
}
