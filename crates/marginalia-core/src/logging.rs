//! Structured logging field names for marginalia.
//!
//! All crates use these constants for consistent structured logging fields.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Unexpected failure with no fallback left |
//! | WARN  | Recoverable issue, automatic fallback applied (orphans, storage retries) |
//! | INFO  | Operation completions (highlight applied, restore finished) |
//! | DEBUG | Decision points (which strategy matched, which fallback ran) |
//! | TRACE | Per-node detail (splits, wraps) |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Subsystem originating the log event.
/// Values: "anchor", "render", "store", "coordinator", "cli"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "builder", "locator", "applier", "backend"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "build", "locate", "apply", "remove", "restore"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Highlight id being operated on.
pub const HIGHLIGHT_ID: &str = "highlight_id";

/// Page key the operation is scoped to.
pub const URL: &str = "url";

/// Storage key read or written.
pub const STORE_KEY: &str = "store_key";

// ─── Matching fields ───────────────────────────────────────────────────────

/// Locator strategy that produced a match.
pub const STRATEGY: &str = "strategy";

/// Fuzzy match score.
pub const SCORE: &str = "score";

/// Normalized character offset of a match.
pub const OFFSET: &str = "offset";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Number of marker elements in a highlight group.
pub const MARKER_COUNT: &str = "marker_count";

/// Number of highlights restored on load.
pub const RESTORED: &str = "restored";

/// Number of highlights left orphaned on load.
pub const ORPHANED: &str = "orphaned";

/// Number of records read from storage.
pub const RECORD_COUNT: &str = "record_count";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Boolean success/failure indicator.
pub const SUCCESS: &str = "success";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";

/// Retry attempt number.
pub const ATTEMPT: &str = "attempt";

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_field_names_are_unique_snake_case() {
        let fields = [
            SUBSYSTEM,
            COMPONENT,
            OPERATION,
            HIGHLIGHT_ID,
            URL,
            STORE_KEY,
            STRATEGY,
            SCORE,
            OFFSET,
            MARKER_COUNT,
            RESTORED,
            ORPHANED,
            RECORD_COUNT,
            SUCCESS,
            ERROR_MSG,
            ATTEMPT,
        ];
        let unique: HashSet<_> = fields.iter().collect();
        assert_eq!(unique.len(), fields.len());
        for field in fields {
            assert!(field
                .chars()
                .all(|c| c.is_ascii_lowercase() || c == '_'));
        }
    }
}
