//! Request de-duplication.
//!
//! Browser clients occasionally double-submit the chat form. Replays
//! carrying the same client request id inside a short window are
//! rejected before any pipeline work happens.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use concierge_core::defaults;

/// In-memory set of recently seen client request ids.
///
/// Entries expire after the configured window. Expired entries are
/// pruned on every check, so the map stays bounded by the number of
/// distinct ids seen inside one window.
pub struct RecentRequests {
    window: Duration,
    seen: Mutex<HashMap<String, Instant>>,
}

impl Default for RecentRequests {
    fn default() -> Self {
        Self::new(Duration::from_millis(defaults::DEDUP_WINDOW_MS))
    }
}

impl RecentRequests {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            seen: Mutex::new(HashMap::new()),
        }
    }

    /// Record `request_id` and report whether it was already seen
    /// inside the window. First sight always returns false and starts
    /// the window; a replay does not extend it.
    pub fn is_duplicate(&self, request_id: &str) -> bool {
        let now = Instant::now();
        let mut seen = self.seen.lock().unwrap();

        seen.retain(|_, first_seen| now.duration_since(*first_seen) < self.window);

        if seen.contains_key(request_id) {
            return true;
        }
        seen.insert(request_id.to_string(), now);
        false
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}
