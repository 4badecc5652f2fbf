//! Explicit result types the orchestrator branches on instead of relying on
//! panics or caught exceptions (§9, "Exception-driven fallbacks").

use std::fmt;

/// Why a merge could not be completed and the file fell back to a verbatim
/// copy of the last mod that changed it.
#[derive(Debug, Clone)]
pub enum MergeFailure {
    Io(String),
    UnbalancedBraces { open: usize, close: usize },
    Validator(String),
}

impl fmt::Display for MergeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MergeFailure::Io(msg) => write!(f, "io error: {msg}"),
            MergeFailure::UnbalancedBraces { open, close } => {
                write!(f, "unbalanced braces: {open} open vs {close} close")
            }
            MergeFailure::Validator(msg) => write!(f, "validator error: {msg}"),
        }
    }
}

impl std::error::Error for MergeFailure {}

/// Per-file decision the orchestrator records, matching §7's outcome model.
#[derive(Debug, Clone)]
pub enum FileOutcome {
    Merged,
    CopiedVerbatim { reason: Option<MergeFailure> },
    Skipped,
}
