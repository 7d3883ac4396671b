//! Request orchestration: classify, branch on modality, embed, encode,
//! retrieve, shape the response.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use concierge_core::{
    defaults, encode_vector, CatalogRepository, EmbeddingBackend, Error, ImageEmbeddingBackend,
    ImageFetcher, ImageSource, Intent, Modality, PriceFilter, Result, SearchRequest,
    SearchResponse,
};
use concierge_inference::IntentClassifier;

/// Reply when an image search has no image to work with. A recoverable
/// outcome, not an error.
const ASK_FOR_IMAGE: &str =
    "I'd love to help! Could you please upload an image or provide an image URL?";

/// Reply when the resolved intent is unusable.
const ASK_FOR_DESCRIPTION: &str =
    "I'm not sure what you're looking for. Could you describe the product you want?";

/// The end-to-end search pipeline.
///
/// Sequences classification, the modality branch, embedding, vector
/// encoding, and catalog retrieval. All collaborators are trait
/// objects so the pipeline is testable against mocks.
pub struct SearchPipeline {
    classifier: IntentClassifier,
    text_backend: Arc<dyn EmbeddingBackend>,
    image_backend: Arc<dyn ImageEmbeddingBackend>,
    catalog: Arc<dyn CatalogRepository>,
    fetcher: Arc<dyn ImageFetcher>,
    limit: i64,
}

impl SearchPipeline {
    pub fn new(
        classifier: IntentClassifier,
        text_backend: Arc<dyn EmbeddingBackend>,
        image_backend: Arc<dyn ImageEmbeddingBackend>,
        catalog: Arc<dyn CatalogRepository>,
        fetcher: Arc<dyn ImageFetcher>,
    ) -> Self {
        Self {
            classifier,
            text_backend,
            image_backend,
            catalog,
            fetcher,
            limit: defaults::SEARCH_LIMIT,
        }
    }

    /// Override the retrieval row limit.
    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    /// Handle one shopping query end to end.
    pub async fn handle(&self, request: &SearchRequest) -> Result<SearchResponse> {
        if request.message.trim().is_empty() && !request.has_image() {
            return Err(Error::InvalidInput(
                "provide a message or an image".to_string(),
            ));
        }

        let start = Instant::now();
        let result = self
            .classifier
            .classify(&request.message, request.has_image())
            .await;

        let response = match result.intent {
            Intent::GeneralTalk => {
                debug!(
                    subsystem = "search",
                    component = "pipeline",
                    intent = %result.intent,
                    "General conversation, no retrieval"
                );
                SearchResponse::Conversation {
                    message: result
                        .conversation_response
                        .unwrap_or_else(|| ASK_FOR_DESCRIPTION.to_string()),
                }
            }
            Intent::ImageRec => {
                self.search_by_image(request, result.image_url.as_deref(), &result.price_filter)
                    .await?
            }
            Intent::TextRec => {
                self.search_by_text(&result.cleaned_query, &result.price_filter)
                    .await?
            }
        };

        info!(
            subsystem = "search",
            component = "pipeline",
            intent = %result.intent,
            duration_ms = start.elapsed().as_millis() as u64,
            "Request handled"
        );

        Ok(response)
    }

    /// Image branch: prefer the attached binary, fall back to a URL
    /// extracted from the text; neither available is a conversational
    /// prompt, not a failure.
    async fn search_by_image(
        &self,
        request: &SearchRequest,
        image_url: Option<&str>,
        price: &PriceFilter,
    ) -> Result<SearchResponse> {
        let image_data = match (&request.image, image_url) {
            (Some(data), _) => data.clone(),
            (None, Some(url)) => self.fetcher.fetch(url).await?,
            (None, None) => {
                return Ok(SearchResponse::Conversation {
                    message: ASK_FOR_IMAGE.to_string(),
                })
            }
        };

        let source = ImageSource::parse(&image_data)?;
        let embedding = self.image_backend.embed_image(&source).await?;
        let encoded = encode_vector(embedding.as_slice());

        self.retrieve(&encoded, Modality::Image, price).await
    }

    /// Text branch: embed the cleaned query and search the text column.
    async fn search_by_text(&self, query: &str, price: &PriceFilter) -> Result<SearchResponse> {
        let texts = vec![query.to_string()];
        let embeddings = self.text_backend.embed_texts(&texts).await?;
        let embedding = embeddings
            .into_iter()
            .next()
            .ok_or_else(|| Error::Embedding("no embedding returned for query".to_string()))?;
        let encoded = encode_vector(embedding.as_slice());

        self.retrieve(&encoded, Modality::Text, price).await
    }

    async fn retrieve(
        &self,
        encoded: &str,
        modality: Modality,
        price: &PriceFilter,
    ) -> Result<SearchResponse> {
        let items = self
            .catalog
            .search(encoded, modality, self.limit, price)
            .await?;

        debug!(
            subsystem = "search",
            component = "pipeline",
            modality = %modality,
            result_count = items.len(),
            "Retrieval complete"
        );

        Ok(SearchResponse::Products { data: items })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use concierge_core::CatalogItem;
    use concierge_inference::mock::{
        MockCatalogRepository, MockEmbeddingBackend, MockGenerationBackend,
        MockImageEmbeddingBackend, MockImageFetcher,
    };

    fn item(id: &str, price: f64, similarity: f64) -> CatalogItem {
        CatalogItem {
            id: id.to_string(),
            title: format!("Item {}", id),
            img_url: format!("https://cdn.example.com/{}.jpg", id),
            product_url: format!("https://example.com/p/{}", id),
            stars: 4.2,
            price,
            similarity,
        }
    }

    fn catalog_fixture() -> Vec<CatalogItem> {
        vec![
            item("a", 25.0, 0.91),
            item("b", 45.0, 0.84),
            item("c", 120.0, 0.78),
        ]
    }

    struct Fixture {
        generation: Arc<MockGenerationBackend>,
        text: Arc<MockEmbeddingBackend>,
        image: Arc<MockImageEmbeddingBackend>,
        catalog: Arc<MockCatalogRepository>,
        fetcher: Arc<MockImageFetcher>,
    }

    impl Fixture {
        fn new(generation: MockGenerationBackend) -> Self {
            Self {
                generation: Arc::new(generation),
                text: Arc::new(MockEmbeddingBackend::new()),
                image: Arc::new(MockImageEmbeddingBackend::new()),
                catalog: Arc::new(MockCatalogRepository::new(catalog_fixture())),
                fetcher: Arc::new(MockImageFetcher::new()),
            }
        }

        fn with_catalog(mut self, catalog: MockCatalogRepository) -> Self {
            self.catalog = Arc::new(catalog);
            self
        }

        fn with_text(mut self, text: MockEmbeddingBackend) -> Self {
            self.text = Arc::new(text);
            self
        }

        fn with_fetcher(mut self, fetcher: MockImageFetcher) -> Self {
            self.fetcher = Arc::new(fetcher);
            self
        }

        fn pipeline(&self) -> SearchPipeline {
            SearchPipeline::new(
                IntentClassifier::new(self.generation.clone()),
                self.text.clone(),
                self.image.clone(),
                self.catalog.clone(),
                self.fetcher.clone(),
            )
        }
    }

    fn classify_as(intent: &str) -> String {
        format!(
            r#"{{"intent": "{}", "cleanedQuery": "trail shoes", "imageUrl": null}}"#,
            intent
        )
    }

    fn text_request(message: &str) -> SearchRequest {
        SearchRequest {
            message: message.to_string(),
            image: None,
        }
    }

    fn image_request(message: &str) -> SearchRequest {
        SearchRequest {
            message: message.to_string(),
            image: Some("data:image/jpeg;base64,aGVsbG8=".to_string()),
        }
    }

    #[tokio::test]
    async fn test_empty_request_is_rejected_before_any_work() {
        let fixture = Fixture::new(MockGenerationBackend::new());
        let pipeline = fixture.pipeline();

        let err = pipeline.handle(&text_request("  ")).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert_eq!(fixture.generation.call_count(), 0);
        assert!(fixture.catalog.calls().is_empty());
    }

    #[tokio::test]
    async fn test_general_talk_skips_retrieval() {
        let fixture = Fixture::new(
            MockGenerationBackend::new()
                .with_response(classify_as("general_talk"))
                .with_response("Hey! Shoes, bags, or jackets?"),
        );
        let pipeline = fixture.pipeline();

        let response = pipeline.handle(&text_request("hi there")).await.unwrap();
        match response {
            SearchResponse::Conversation { message } => {
                assert_eq!(message, "Hey! Shoes, bags, or jackets?")
            }
            _ => panic!("expected conversation"),
        }
        assert!(fixture.catalog.calls().is_empty());
        assert_eq!(fixture.text.call_count(), 0);
    }

    #[tokio::test]
    async fn test_text_search_returns_ranked_products() {
        let fixture = Fixture::new(MockGenerationBackend::new().with_response(classify_as("text_rec")));
        let pipeline = fixture.pipeline();

        let response = pipeline
            .handle(&text_request("find me trail shoes"))
            .await
            .unwrap();
        let data = match response {
            SearchResponse::Products { data } => data,
            _ => panic!("expected products"),
        };

        // Non-increasing similarity order.
        assert_eq!(data.len(), 3);
        for pair in data.windows(2) {
            assert!(pair[0].similarity >= pair[1].similarity);
        }

        let calls = fixture.catalog.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].modality, Modality::Text);
        assert_eq!(calls[0].limit, defaults::SEARCH_LIMIT);
    }

    #[tokio::test]
    async fn test_price_filter_reaches_the_catalog() {
        let fixture = Fixture::new(MockGenerationBackend::new().with_response(classify_as("text_rec")));
        let pipeline = fixture.pipeline();

        let response = pipeline
            .handle(&text_request("trail shoes between $20 and $50"))
            .await
            .unwrap();

        let calls = fixture.catalog.calls();
        assert_eq!(calls[0].price.min_price, Some(20.0));
        assert_eq!(calls[0].price.max_price, Some(50.0));

        // The filtered set is a subset of the unfiltered catalog.
        match response {
            SearchResponse::Products { data } => {
                assert_eq!(data.len(), 2);
                assert!(data.iter().all(|i| i.price >= 20.0 && i.price <= 50.0));
            }
            _ => panic!("expected products"),
        }
    }

    #[tokio::test]
    async fn test_attached_image_searches_image_column() {
        // Model says text_rec, but the attachment forces image_rec.
        let fixture = Fixture::new(MockGenerationBackend::new().with_response(classify_as("text_rec")));
        let pipeline = fixture.pipeline();

        pipeline
            .handle(&image_request("something like this"))
            .await
            .unwrap();

        let calls = fixture.catalog.calls();
        assert_eq!(calls[0].modality, Modality::Image);
        assert_eq!(fixture.image.call_count(), 1);
        assert_eq!(fixture.text.call_count(), 0);
        assert!(fixture.fetcher.calls().is_empty());
    }

    #[tokio::test]
    async fn test_image_only_request_runs_image_search() {
        let fixture = Fixture::new(MockGenerationBackend::new());
        let pipeline = fixture.pipeline();

        pipeline.handle(&image_request("")).await.unwrap();

        // Fast path: no classification call at all.
        assert_eq!(fixture.generation.call_count(), 0);
        assert_eq!(fixture.catalog.calls()[0].modality, Modality::Image);
    }

    #[tokio::test]
    async fn test_image_intent_without_image_asks_for_one() {
        let fixture = Fixture::new(MockGenerationBackend::new().with_response(classify_as("image_rec")));
        let pipeline = fixture.pipeline();

        let response = pipeline
            .handle(&text_request("find similar to my photo"))
            .await
            .unwrap();
        match response {
            SearchResponse::Conversation { message } => {
                assert!(message.contains("upload an image"))
            }
            _ => panic!("expected conversation"),
        }
        assert!(fixture.catalog.calls().is_empty());
        assert!(fixture.fetcher.calls().is_empty());
    }

    #[tokio::test]
    async fn test_image_url_in_text_is_fetched() {
        let fixture = Fixture::new(MockGenerationBackend::new().with_response(
            r#"{"intent": "image_rec", "cleanedQuery": "similar jacket", "imageUrl": "https://example.com/jacket.jpg"}"#,
        ));
        let pipeline = fixture.pipeline();

        pipeline
            .handle(&text_request("find similar to https://example.com/jacket.jpg"))
            .await
            .unwrap();

        assert_eq!(
            fixture.fetcher.calls(),
            vec!["https://example.com/jacket.jpg".to_string()]
        );
        assert_eq!(fixture.catalog.calls()[0].modality, Modality::Image);
    }

    #[tokio::test]
    async fn test_fetch_failure_propagates() {
        let fixture = Fixture::new(MockGenerationBackend::new().with_response(
            r#"{"intent": "image_rec", "cleanedQuery": "jacket", "imageUrl": "https://example.com/jacket.jpg"}"#,
        ))
        .with_fetcher(MockImageFetcher::new().failing());
        let pipeline = fixture.pipeline();

        let err = pipeline
            .handle(&text_request("find similar jackets"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ImageFetch(_)));
    }

    #[tokio::test]
    async fn test_classifier_failure_still_searches() {
        // Classification errors are absorbed; the request degrades to
        // a best-effort text search.
        let fixture = Fixture::new(MockGenerationBackend::new().failing());
        let pipeline = fixture.pipeline();

        let response = pipeline
            .handle(&text_request("waterproof boots"))
            .await
            .unwrap();
        assert!(matches!(response, SearchResponse::Products { .. }));
        assert_eq!(fixture.catalog.calls()[0].modality, Modality::Text);
    }

    #[tokio::test]
    async fn test_embedding_failure_is_fatal() {
        let fixture = Fixture::new(MockGenerationBackend::new().with_response(classify_as("text_rec")))
            .with_text(MockEmbeddingBackend::new().failing());
        let pipeline = fixture.pipeline();

        let err = pipeline
            .handle(&text_request("trail shoes"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Embedding(_)));
    }

    #[tokio::test]
    async fn test_catalog_failure_is_fatal() {
        let fixture = Fixture::new(MockGenerationBackend::new().with_response(classify_as("text_rec")))
            .with_catalog(MockCatalogRepository::new(vec![]).failing());
        let pipeline = fixture.pipeline();

        let err = pipeline
            .handle(&text_request("trail shoes"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Search(_)));
    }

    #[tokio::test]
    async fn test_limit_override() {
        let fixture = Fixture::new(MockGenerationBackend::new().with_response(classify_as("text_rec")));
        let pipeline = fixture.pipeline().with_limit(2);

        let response = pipeline.handle(&text_request("trail shoes")).await.unwrap();
        match response {
            SearchResponse::Products { data } => assert_eq!(data.len(), 2),
            _ => panic!("expected products"),
        }
        assert_eq!(fixture.catalog.calls()[0].limit, 2);
    }
}
