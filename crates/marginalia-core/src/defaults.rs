//! Centralized default constants for marginalia.
//!
//! **This module is the single source of truth** for shared default values.
//! Component configs (`BuilderConfig`, `LocatorConfig`, `StoreConfig`) start
//! from these and may be overridden from the environment.
//!
//! The matching constants are heuristics. They are tunable and no correctness
//! property depends on their exact values.

// =============================================================================
// ANCHOR CONTEXT
// =============================================================================

/// Characters of context captured before/after the exact text.
pub const CONTEXT_CHARS: usize = 32;

/// Context width for logographic text, where whitespace does not delimit
/// words and short windows match too often.
pub const CONTEXT_CHARS_LOGOGRAPHIC: usize = 64;

/// Length of the selection prefix used by the builder's first fallback.
pub const PREFIX_PROBE_CHARS: usize = 20;

/// Smallest window scanned by the builder's last fallback.
pub const WINDOW_MIN_CHARS: usize = 3;

/// Largest window scanned by the builder's last fallback.
pub const WINDOW_MAX_CHARS: usize = 10;

// =============================================================================
// LOCATOR
// =============================================================================

/// Minimum fraction of equal characters for a fuzzy chunk match.
pub const FUZZY_THRESHOLD: f32 = 0.7;

/// Maximum probe length for fuzzy chunk matching.
pub const FUZZY_PROBE_CHARS: usize = 50;

// =============================================================================
// STORAGE
// =============================================================================

/// Key under which the global highlight array is stored.
pub const STORE_KEY: &str = "marginalia.highlights";

/// Retries after a failed backend call.
pub const STORE_RETRIES: u32 = 1;

// =============================================================================
// DOCUMENT TREE
// =============================================================================

/// Elements whose text is never rendered and never highlighted.
pub const NON_RENDERED_TAGS: &[&str] = &["script", "style", "noscript", "template"];

/// Elements that are content roots by tag name alone.
pub const CONTENT_ROOT_TAGS: &[&str] = &["article", "main"];

/// `role` attribute values marking a content root.
pub const CONTENT_ROOT_ROLES: &[&str] = &["main", "article"];

/// `id`/`class` tokens marking a content root.
pub const CONTENT_ROOT_MARKERS: &[&str] = &[
    "content",
    "main-content",
    "article",
    "article-body",
    "post",
    "post-content",
    "entry-content",
    "story",
];

// =============================================================================
// LOGGING
// =============================================================================

/// Default `RUST_LOG` filter for the CLI.
pub const LOG_FILTER: &str = "marginalia=info";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_range_is_ordered() {
        assert!(WINDOW_MIN_CHARS <= WINDOW_MAX_CHARS);
        assert!(WINDOW_MAX_CHARS <= PREFIX_PROBE_CHARS);
    }

    #[test]
    fn test_logographic_context_is_wider() {
        assert!(CONTEXT_CHARS_LOGOGRAPHIC > CONTEXT_CHARS);
    }

    #[test]
    fn test_fuzzy_threshold_is_fraction() {
        assert!(FUZZY_THRESHOLD > 0.0 && FUZZY_THRESHOLD <= 1.0);
    }
}
