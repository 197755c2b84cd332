//! Outcome Records.

use serde::{Deserialize, Serialize};

/// Message carried by a sub-operation that never ran.
pub const NOT_EXECUTED: &str = "Not executed";

/// Result of a single sub-operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    pub success: bool,
    pub changed: bool,
    pub message: String,
}

impl Outcome {
    /// Placeholder for a sub-operation that was not performed.
    #[must_use]
    pub fn not_executed() -> Self {
        Self {
            success: false,
            changed: false,
            message: NOT_EXECUTED.to_string(),
        }
    }

    /// A successful sub-operation that modified remote state.
    pub fn changed(message: impl Into<String>) -> Self {
        Self {
            success: true,
            changed: true,
            message: message.into(),
        }
    }

    /// A successful sub-operation that found nothing to do.
    pub fn unchanged(message: impl Into<String>) -> Self {
        Self {
            success: true,
            changed: false,
            message: message.into(),
        }
    }

    /// Fold child outcomes: success if all succeeded, changed if any changed.
    ///
    /// Messages are joined in iteration order. An empty input aggregates to an
    /// unchanged success with an empty message.
    pub fn aggregate<'a>(outcomes: impl IntoIterator<Item = &'a Outcome>) -> Self {
        let mut success = true;
        let mut changed = false;
        let mut messages = Vec::new();
        for outcome in outcomes {
            success &= outcome.success;
            changed |= outcome.changed;
            if !outcome.message.is_empty() {
                messages.push(outcome.message.as_str());
            }
        }
        Self {
            success,
            changed,
            message: messages.join(" "),
        }
    }
}

impl Default for Outcome {
    fn default() -> Self {
        Self::not_executed()
    }
}
