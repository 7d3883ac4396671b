//! # concierge-inference
//!
//! Inference backends for the concierge shopping search service.
//!
//! This crate provides:
//! - OpenAI-compatible backend for text embeddings and chat completions
//! - CLIP vision backend (locally-hosted service) for image embeddings
//! - Intent classifier with deterministic post-processing and fallback
//! - Remote image fetcher
//! - Mock backends for testing (feature `mock`)
//!
//! # Example
//!
//! ```rust,no_run
//! use concierge_core::EmbeddingBackend;
//! use concierge_inference::OpenAIBackend;
//!
//! #[tokio::main]
//! async fn main() {
//!     let backend = OpenAIBackend::from_env().unwrap();
//!     let texts = vec!["trail running shoes".to_string()];
//!     let embeddings = backend.embed_texts(&texts).await.unwrap();
//!     assert_eq!(embeddings[0].as_slice().len(), 384);
//! }
//! ```

pub mod clip;
pub mod fetcher;
pub mod intent;
pub mod openai;

// Mock inference backends for testing
#[cfg(any(test, feature = "mock"))]
pub mod mock;

// Re-export core types
pub use concierge_core::*;

pub use clip::ClipVisionBackend;
pub use fetcher::HttpImageFetcher;
pub use intent::IntentClassifier;
pub use openai::{OpenAIBackend, OpenAIConfig};
