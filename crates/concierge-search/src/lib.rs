//! # concierge-search
//!
//! The request pipeline for the concierge shopping search service:
//! intent classification, modality branching, embedding, vector
//! encoding, and filtered nearest-neighbor retrieval, shaped into a
//! conversational reply or a ranked product list.

pub mod pipeline;

pub use pipeline::SearchPipeline;
