//! # concierge-core
//!
//! Core types, traits, and abstractions for the concierge shopping
//! search service.
//!
//! This crate provides the foundational data structures and trait
//! definitions that the other concierge crates depend on: the request
//! and response models, the price-filter extractor, the pgvector
//! literal encoder, and the backend trait seams (embedding,
//! generation, catalog retrieval, image fetching).

pub mod defaults;
pub mod error;
pub mod logging;
pub mod models;
pub mod price;
pub mod traits;
pub mod vector;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use models::*;
pub use price::{extract_price_filter, strip_price_language, PriceFilter};
pub use traits::*;
pub use vector::{decode_vector, encode_vector, l2_normalize};
