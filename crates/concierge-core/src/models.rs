//! Request/response models shared across the concierge crates.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::price::PriceFilter;

/// Embedding vector type (re-exported from pgvector).
pub use pgvector::Vector;

// =============================================================================
// INTENT
// =============================================================================

/// Terminal handling strategies for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    /// Greetings, meta-questions, anything not about finding products.
    GeneralTalk,
    /// Product search driven by a text description.
    TextRec,
    /// Product search driven by an image.
    ImageRec,
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::GeneralTalk => write!(f, "general_talk"),
            Self::TextRec => write!(f, "text_rec"),
            Self::ImageRec => write!(f, "image_rec"),
        }
    }
}

impl std::str::FromStr for Intent {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "general_talk" => Ok(Self::GeneralTalk),
            "text_rec" => Ok(Self::TextRec),
            "image_rec" => Ok(Self::ImageRec),
            _ => Err(Error::InvalidInput(format!("unknown intent: {}", s))),
        }
    }
}

/// Result of intent classification. Produced once per request and
/// consumed immediately by the pipeline; never persisted.
#[derive(Debug, Clone)]
pub struct IntentResult {
    pub intent: Intent,
    /// Product-relevant residual of the user message (price language
    /// and fluff removed).
    pub cleaned_query: String,
    /// Reply text, present only for [`Intent::GeneralTalk`].
    pub conversation_response: Option<String>,
    /// Image URL extracted from the message text, carried forward when
    /// the classifier judged `image_rec` without an attached image.
    pub image_url: Option<String>,
    pub price_filter: PriceFilter,
}

// =============================================================================
// MODALITY
// =============================================================================

/// Which embedding space a retrieval step operates in.
///
/// The two spaces have different dimensionality and are stored in
/// separate catalog columns; they are never compared cross-modality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    Text,
    Image,
}

impl Modality {
    /// Expected embedding dimension for this modality.
    pub fn dimension(&self) -> usize {
        match self {
            Self::Text => crate::defaults::TEXT_EMBED_DIMENSION,
            Self::Image => crate::defaults::IMAGE_EMBED_DIMENSION,
        }
    }

    /// Catalog column holding embeddings of this modality. This is the
    /// sole place the column choice is decided.
    pub fn column(&self) -> &'static str {
        match self {
            Self::Text => "text_embedding",
            Self::Image => "image_embedding",
        }
    }
}

impl std::fmt::Display for Modality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Image => write!(f, "image"),
        }
    }
}

// =============================================================================
// IMAGE INPUT
// =============================================================================

/// Parsed image input for the vision embedding path.
///
/// Exactly three forms are recognized: a direct remote URL, a base64
/// data URI, and nothing else. PDF inputs are detected and rejected;
/// PDF-to-image extraction is not supported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// Direct http(s) URL, passed through to the vision service.
    Url(String),
    /// Base64 data URI, materialized to a temp file for embedding.
    DataUri { mime: String, data: String },
}

impl ImageSource {
    /// Classify a raw image input string.
    pub fn parse(input: &str) -> Result<Self> {
        if input.starts_with("data:application/pdf") {
            return Err(Error::UnsupportedFormat(
                "PDF image extraction is not supported; provide a direct image".to_string(),
            ));
        }

        if let Some(rest) = input.strip_prefix("data:") {
            let (header, data) = rest.split_once(',').ok_or_else(|| {
                Error::UnsupportedFormat("malformed data URI: missing payload".to_string())
            })?;
            let mime = header
                .split(';')
                .next()
                .filter(|m| !m.is_empty())
                .unwrap_or("image/jpeg");
            return Ok(Self::DataUri {
                mime: mime.to_string(),
                data: data.to_string(),
            });
        }

        if input.starts_with("http://") || input.starts_with("https://") {
            if input.to_lowercase().ends_with(".pdf") {
                return Err(Error::UnsupportedFormat(
                    "PDF image extraction is not supported; provide a direct image".to_string(),
                ));
            }
            return Ok(Self::Url(input.to_string()));
        }

        Err(Error::UnsupportedFormat(format!(
            "expected a URL or data URI, got: {:.32}",
            input
        )))
    }
}

// =============================================================================
// REQUEST / RESPONSE
// =============================================================================

/// One incoming shopping query. Request-scoped.
#[derive(Debug, Clone, Default)]
pub struct SearchRequest {
    /// Raw user text (possibly empty when an image is attached).
    pub message: String,
    /// Attached image as a base64 data URI, if any.
    pub image: Option<String>,
}

impl SearchRequest {
    pub fn has_image(&self) -> bool {
        self.image.is_some()
    }
}

/// One ranked catalog row from a similarity search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: String,
    pub title: String,
    #[serde(rename = "img")]
    pub img_url: String,
    #[serde(rename = "product")]
    pub product_url: String,
    pub stars: f32,
    pub price: f64,
    /// `1 - cosine distance` against the query embedding.
    pub similarity: f64,
}

/// Outcome of a search request: either a conversational reply or a
/// ranked product list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SearchResponse {
    Conversation { message: String },
    Products { data: Vec<CatalogItem> },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_intent_display_roundtrip() {
        for intent in [Intent::GeneralTalk, Intent::TextRec, Intent::ImageRec] {
            assert_eq!(Intent::from_str(&intent.to_string()).unwrap(), intent);
        }
    }

    #[test]
    fn test_intent_from_str_unknown() {
        assert!(Intent::from_str("video_rec").is_err());
    }

    #[test]
    fn test_intent_serde_snake_case() {
        let json = serde_json::to_string(&Intent::ImageRec).unwrap();
        assert_eq!(json, "\"image_rec\"");
        let intent: Intent = serde_json::from_str("\"general_talk\"").unwrap();
        assert_eq!(intent, Intent::GeneralTalk);
    }

    #[test]
    fn test_modality_dimensions_are_disjoint() {
        assert_eq!(Modality::Text.dimension(), 384);
        assert_eq!(Modality::Image.dimension(), 512);
    }

    #[test]
    fn test_modality_column_selection() {
        assert_eq!(Modality::Text.column(), "text_embedding");
        assert_eq!(Modality::Image.column(), "image_embedding");
    }

    #[test]
    fn test_image_source_url() {
        let src = ImageSource::parse("https://example.com/shoe.jpg").unwrap();
        assert_eq!(src, ImageSource::Url("https://example.com/shoe.jpg".to_string()));
    }

    #[test]
    fn test_image_source_data_uri() {
        let src = ImageSource::parse("data:image/png;base64,iVBORw0KGgo=").unwrap();
        match src {
            ImageSource::DataUri { mime, data } => {
                assert_eq!(mime, "image/png");
                assert_eq!(data, "iVBORw0KGgo=");
            }
            _ => panic!("expected data URI"),
        }
    }

    #[test]
    fn test_image_source_pdf_data_uri_rejected() {
        let err = ImageSource::parse("data:application/pdf;base64,JVBERi0=").unwrap_err();
        match err {
            Error::UnsupportedFormat(msg) => assert!(msg.contains("PDF")),
            _ => panic!("expected UnsupportedFormat"),
        }
    }

    #[test]
    fn test_image_source_pdf_url_rejected() {
        assert!(ImageSource::parse("https://example.com/catalog.PDF").is_err());
    }

    #[test]
    fn test_image_source_garbage_rejected() {
        let err = ImageSource::parse("not an image at all").unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(_)));
    }

    #[test]
    fn test_image_source_data_uri_without_payload_rejected() {
        assert!(ImageSource::parse("data:image/png;base64").is_err());
    }

    #[test]
    fn test_search_response_conversation_shape() {
        let resp = SearchResponse::Conversation {
            message: "hi".to_string(),
        };
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["type"], "conversation");
        assert_eq!(json["message"], "hi");
    }

    #[test]
    fn test_search_response_products_shape() {
        let resp = SearchResponse::Products {
            data: vec![CatalogItem {
                id: "p1".to_string(),
                title: "Trail runner".to_string(),
                img_url: "https://cdn.example.com/p1.jpg".to_string(),
                product_url: "https://example.com/p/p1".to_string(),
                stars: 4.5,
                price: 79.99,
                similarity: 0.87,
            }],
        };
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["type"], "products");
        assert_eq!(json["data"][0]["img"], "https://cdn.example.com/p1.jpg");
        assert_eq!(json["data"][0]["product"], "https://example.com/p/p1");
        assert_eq!(json["data"][0]["stars"], 4.5);
    }
}
