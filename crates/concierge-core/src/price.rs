//! Natural-language price constraint extraction.
//!
//! A prioritized, data-driven rule table maps price phrases ("between
//! $20 and $50", "under $30", "over $100") to a [`PriceFilter`]. Rules
//! are evaluated in priority order and the first match wins: range
//! phrasings are checked before single-bound phrasings, so a string
//! matching both resolves by rule priority, not by position in the
//! string.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Extracted price constraint for a catalog search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceFilter {
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
}

impl PriceFilter {
    /// True iff at least one bound is set.
    pub fn has_filter(&self) -> bool {
        self.min_price.is_some() || self.max_price.is_some()
    }

    /// Return a well-formed copy: if both bounds are set and
    /// `min > max` (malformed input like "between $50 and $20"), the
    /// bounds are swapped.
    pub fn normalized(self) -> Self {
        match (self.min_price, self.max_price) {
            (Some(min), Some(max)) if min > max => Self {
                min_price: Some(max),
                max_price: Some(min),
            },
            _ => self,
        }
    }
}

/// What a matched rule contributes to the filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RuleKind {
    /// Captures both bounds.
    Range,
    /// Captures the upper bound only.
    Max,
    /// Captures the lower bound only.
    Min,
}

struct PriceRule {
    pattern: Regex,
    kind: RuleKind,
}

/// Numeric token: optional currency symbol, up to two decimals.
const AMOUNT: &str = r"\$?(\d+(?:\.\d{1,2})?)";

/// Ordered rule table, most specific first. Compiled once.
static RULES: Lazy<Vec<PriceRule>> = Lazy::new(|| {
    let rule = |pattern: String, kind: RuleKind| PriceRule {
        pattern: Regex::new(&pattern).expect("price rule pattern must compile"),
        kind,
    };
    vec![
        // "between $20 and $50"
        rule(
            format!(r"(?i)between\s*{AMOUNT}\s+and\s*{AMOUNT}"),
            RuleKind::Range,
        ),
        // "$20 to $50", "$20-$50"
        rule(
            format!(r"(?i){AMOUNT}\s*(?:to|-)\s*{AMOUNT}"),
            RuleKind::Range,
        ),
        // "below $50", "under $50"
        rule(format!(r"(?i)(?:below|under)\s*{AMOUNT}"), RuleKind::Max),
        // "less than $50"
        rule(format!(r"(?i)less\s+than\s*{AMOUNT}"), RuleKind::Max),
        // "up to $50"
        rule(format!(r"(?i)up\s+to\s*{AMOUNT}"), RuleKind::Max),
        // "max $50", "maximum $50"
        rule(format!(r"(?i)(?:max|maximum)\s*{AMOUNT}"), RuleKind::Max),
        // "above $50", "over $50", "more than $50"
        rule(
            format!(r"(?i)(?:above|over|more\s+than)\s*{AMOUNT}"),
            RuleKind::Min,
        ),
    ]
});

/// Parse a price constraint out of free-form query text.
///
/// Stateless and pure. Returns an empty filter when no rule matches;
/// a query containing no digits can never match.
pub fn extract_price_filter(query: &str) -> PriceFilter {
    if query.is_empty() {
        return PriceFilter::default();
    }

    for rule in RULES.iter() {
        let Some(caps) = rule.pattern.captures(query) else {
            continue;
        };

        let amount = |idx: usize| caps.get(idx).and_then(|m| m.as_str().parse::<f64>().ok());

        let filter = match rule.kind {
            RuleKind::Range => PriceFilter {
                min_price: amount(1),
                max_price: amount(2),
            },
            RuleKind::Max => PriceFilter {
                min_price: None,
                max_price: amount(1),
            },
            RuleKind::Min => PriceFilter {
                min_price: amount(1),
                max_price: None,
            },
        }
        .normalized();

        if filter.has_filter() {
            debug!(
                subsystem = "core",
                component = "price",
                min = ?filter.min_price,
                max = ?filter.max_price,
                "Price filter extracted"
            );
            return filter;
        }
    }

    debug!(
        subsystem = "core",
        component = "price",
        "No price filter detected"
    );
    PriceFilter::default()
}

/// Remove every price phrase matched by the rule table and collapse
/// whitespace, yielding the residual product-description text.
///
/// Applied before intent classification so price words do not pollute
/// the model prompt. Idempotent: a second application is a no-op.
pub fn strip_price_language(query: &str) -> String {
    if query.is_empty() {
        return String::new();
    }

    let mut cleaned = query.to_string();
    for rule in RULES.iter() {
        cleaned = rule.pattern.replace_all(&cleaned, "").into_owned();
    }

    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_between_range() {
        let filter = extract_price_filter("running shoes between $20 and $50");
        assert_eq!(filter.min_price, Some(20.0));
        assert_eq!(filter.max_price, Some(50.0));
        assert!(filter.has_filter());
    }

    #[test]
    fn test_to_range() {
        let filter = extract_price_filter("jackets $20 to $50");
        assert_eq!(filter.min_price, Some(20.0));
        assert_eq!(filter.max_price, Some(50.0));
    }

    #[test]
    fn test_dash_range() {
        let filter = extract_price_filter("headphones 30-80");
        assert_eq!(filter.min_price, Some(30.0));
        assert_eq!(filter.max_price, Some(80.0));
    }

    #[test]
    fn test_under_bound() {
        let filter = extract_price_filter("sneakers under $30");
        assert_eq!(filter.min_price, None);
        assert_eq!(filter.max_price, Some(30.0));
    }

    #[test]
    fn test_below_bound() {
        let filter = extract_price_filter("below 45.50 please");
        assert_eq!(filter.max_price, Some(45.5));
    }

    #[test]
    fn test_less_than_bound() {
        let filter = extract_price_filter("bags less than $25");
        assert_eq!(filter.max_price, Some(25.0));
    }

    #[test]
    fn test_up_to_bound() {
        let filter = extract_price_filter("watches up to $200");
        assert_eq!(filter.max_price, Some(200.0));
    }

    #[test]
    fn test_maximum_bound() {
        let filter = extract_price_filter("maximum $15");
        assert_eq!(filter.max_price, Some(15.0));
    }

    #[test]
    fn test_over_bound() {
        let filter = extract_price_filter("premium boots over $100");
        assert_eq!(filter.min_price, Some(100.0));
        assert_eq!(filter.max_price, None);
    }

    #[test]
    fn test_more_than_bound() {
        let filter = extract_price_filter("more than $60");
        assert_eq!(filter.min_price, Some(60.0));
    }

    #[test]
    fn test_no_filter() {
        let filter = extract_price_filter("show me shoes");
        assert!(!filter.has_filter());
        assert_eq!(filter, PriceFilter::default());
    }

    #[test]
    fn test_no_digits_never_matches() {
        assert!(!extract_price_filter("under the bed storage").has_filter());
        assert!(!extract_price_filter("more than enough").has_filter());
    }

    #[test]
    fn test_empty_query() {
        assert!(!extract_price_filter("").has_filter());
    }

    #[test]
    fn test_decimal_amounts() {
        let filter = extract_price_filter("between $19.99 and $49.95");
        assert_eq!(filter.min_price, Some(19.99));
        assert_eq!(filter.max_price, Some(49.95));
    }

    #[test]
    fn test_range_beats_bound_regardless_of_position() {
        // "under $30" appears first in the string, but the range rule
        // has higher priority.
        let filter = extract_price_filter("under $30 or between $10 and $20");
        assert_eq!(filter.min_price, Some(10.0));
        assert_eq!(filter.max_price, Some(20.0));
    }

    #[test]
    fn test_case_insensitive() {
        let filter = extract_price_filter("BETWEEN $5 AND $9");
        assert_eq!(filter.min_price, Some(5.0));
        assert_eq!(filter.max_price, Some(9.0));
    }

    #[test]
    fn test_inverted_range_is_swapped() {
        let filter = extract_price_filter("between $50 and $20");
        assert_eq!(filter.min_price, Some(20.0));
        assert_eq!(filter.max_price, Some(50.0));
    }

    #[test]
    fn test_normalized_noop_when_well_formed() {
        let filter = PriceFilter {
            min_price: Some(1.0),
            max_price: Some(2.0),
        };
        assert_eq!(filter.normalized(), filter);
    }

    #[test]
    fn test_strip_between_range() {
        let cleaned = strip_price_language("running shoes between $20 and $50");
        assert_eq!(cleaned, "running shoes");
    }

    #[test]
    fn test_strip_bound() {
        let cleaned = strip_price_language("sneakers under $30 for trail running");
        assert_eq!(cleaned, "sneakers for trail running");
    }

    #[test]
    fn test_strip_collapses_whitespace() {
        let cleaned = strip_price_language("bags   less than $25   in leather");
        assert_eq!(cleaned, "bags in leather");
    }

    #[test]
    fn test_strip_is_idempotent() {
        let once = strip_price_language("jackets $20 to $50 waterproof");
        let twice = strip_price_language(&once);
        assert_eq!(once, twice);
        assert_eq!(once, "jackets waterproof");
    }

    #[test]
    fn test_strip_leaves_unrelated_text() {
        assert_eq!(strip_price_language("show me shoes"), "show me shoes");
    }

    #[test]
    fn test_strip_empty() {
        assert_eq!(strip_price_language(""), "");
    }

    #[test]
    fn test_strip_then_extract_finds_nothing() {
        let cleaned = strip_price_language("boots between $40 and $90");
        assert!(!extract_price_filter(&cleaned).has_filter());
    }
}
