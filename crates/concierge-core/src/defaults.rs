//! Centralized default constants for the concierge system.
//!
//! **This module is the single source of truth** for all shared default
//! values. All crates reference these constants instead of defining
//! their own magic numbers.

// =============================================================================
// TEXT EMBEDDING
// =============================================================================

/// Default text embedding model (OpenAI-compatible).
pub const TEXT_EMBED_MODEL: &str = "text-embedding-3-small";

/// Text embedding dimension. The catalog's `text_embedding` column is
/// fixed at this width, so the model is asked for exactly this many
/// dimensions.
pub const TEXT_EMBED_DIMENSION: usize = 384;

// =============================================================================
// IMAGE EMBEDDING
// =============================================================================

/// Default CLIP vision model served by the local vision service.
pub const IMAGE_EMBED_MODEL: &str = "clip-vit-base-patch32";

/// Image embedding dimension (CLIP ViT-B/32 projection width).
pub const IMAGE_EMBED_DIMENSION: usize = 512;

/// Default base URL of the locally-hosted vision embedding service.
pub const VISION_SERVICE_URL: &str = "http://localhost:8311";

// =============================================================================
// GENERATION
// =============================================================================

/// Default chat model for intent classification and conversation.
pub const GEN_MODEL: &str = "gpt-4o-mini";

/// Default OpenAI-compatible API endpoint.
pub const OPENAI_URL: &str = "https://api.openai.com/v1";

/// Sampling temperature for the structured classification call.
pub const CLASSIFY_TEMPERATURE: f32 = 0.3;

/// Sampling temperature for the conversational reply call.
pub const CONVERSATION_TEMPERATURE: f32 = 0.7;

/// Output token cap for conversational replies (kept short on purpose).
pub const CONVERSATION_MAX_TOKENS: u32 = 150;

// =============================================================================
// RETRIEVAL
// =============================================================================

/// Default number of catalog rows returned by a similarity search.
pub const SEARCH_LIMIT: i64 = 5;

/// Synthetic cleaned query used when a request carries an image but no
/// usable text.
pub const IMAGE_ONLY_QUERY: &str = "find similar items";

// =============================================================================
// SERVER
// =============================================================================

/// Default HTTP server port.
pub const SERVER_PORT: u16 = 3000;

/// Debounce window for duplicate request suppression, in milliseconds.
pub const DEDUP_WINDOW_MS: u64 = 2000;

// =============================================================================
// TIMEOUTS
// =============================================================================

/// Request timeout for inference calls, in seconds.
pub const INFERENCE_TIMEOUT_SECS: u64 = 120;

/// Request timeout for remote image fetches, in seconds.
pub const IMAGE_FETCH_TIMEOUT_SECS: u64 = 30;

// =============================================================================
// ENVIRONMENT VARIABLES
// =============================================================================

/// PostgreSQL connection string.
pub const ENV_DATABASE_URL: &str = "DATABASE_URL";

/// OpenAI-compatible API key.
pub const ENV_OPENAI_API_KEY: &str = "OPENAI_API_KEY";

/// Override for the OpenAI-compatible base URL.
pub const ENV_OPENAI_BASE_URL: &str = "OPENAI_BASE_URL";

/// Override for the local vision service URL.
pub const ENV_VISION_SERVICE_URL: &str = "VISION_SERVICE_URL";

/// Override for the CLIP model slug.
pub const ENV_VISION_MODEL: &str = "VISION_MODEL";

/// Override for the HTTP server port.
pub const ENV_PORT: &str = "PORT";
