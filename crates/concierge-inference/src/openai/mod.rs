//! OpenAI-compatible backend for text embeddings and chat completions.

mod backend;
mod types;

pub use backend::{OpenAIBackend, OpenAIConfig};
pub use types::*;
