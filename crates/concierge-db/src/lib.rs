//! # concierge-db
//!
//! PostgreSQL database layer for concierge:
//! - Connection pool management
//! - Filtered nearest-neighbor catalog retrieval with pgvector
//!
//! The catalog schema (`catalog_items`) stores one embedding column per
//! modality: `text_embedding vector(384)` and `image_embedding
//! vector(512)`. Catalog ingestion is out of scope; this crate only
//! queries.

pub mod catalog;
pub mod pool;

pub use catalog::PgCatalogRepository;
pub use pool::{create_pool, create_pool_with_config, PoolConfig};
