//! Structured logging field name constants for concierge.
//!
//! All crates use these constants for consistent structured logging
//! fields so log aggregation tools can query by standardized names
//! across every subsystem.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, automatic fallback applied |
//! | INFO  | Lifecycle events (startup, model load), operation completions |
//! | DEBUG | Decision points, intermediate values, config choices |
//! | TRACE | Per-item iteration, high-volume data (search hits) |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Correlation ID propagated across a request. Format: UUIDv7.
pub const REQUEST_ID: &str = "request_id";

/// Subsystem originating the log event.
/// Values: "api", "search", "db", "inference"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "pipeline", "intent", "clip", "catalog", "pool"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "classify", "embed_texts", "embed_image", "search"
pub const OPERATION: &str = "op";

// ─── Pipeline fields ───────────────────────────────────────────────────────

/// Resolved intent for a request ("general_talk", "text_rec", "image_rec").
pub const INTENT: &str = "intent";

/// Embedding modality for a retrieval step ("text", "image").
pub const MODALITY: &str = "modality";

/// Search query text (cleaned).
pub const QUERY: &str = "query";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of results returned by a search or query.
pub const RESULT_COUNT: &str = "result_count";

/// Embedding vector dimension.
pub const DIMENSION: &str = "dimension";
