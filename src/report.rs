//! The run's user-visible outcome: §7's statistics record.

use serde::Serialize;

#[derive(Debug, Default, Clone, Serialize)]
pub struct RunStats {
    pub total: usize,
    pub merged: usize,
    pub copied: usize,
    pub skipped: usize,
    pub failed: usize,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl RunStats {
    pub fn record(&mut self, outcome: &crate::errors::FileOutcome) {
        self.total += 1;
        match outcome {
            crate::errors::FileOutcome::Merged => self.merged += 1,
            crate::errors::FileOutcome::CopiedVerbatim { reason } => {
                self.copied += 1;
                if let Some(reason) = reason {
                    self.failed += 1;
                    self.errors.push(reason.to_string());
                }
            }
            crate::errors::FileOutcome::Skipped => self.skipped += 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{FileOutcome, MergeFailure};

    #[test]
    fn merged_outcome_only_increments_merged_and_total() {
        let mut stats = RunStats::default();
        stats.record(&FileOutcome::Merged);
        assert_eq!(stats.total, 1);
        assert_eq!(stats.merged, 1);
        assert!(stats.errors.is_empty());
    }

    #[test]
    fn copied_with_reason_counts_as_failed_and_records_error() {
        let mut stats = RunStats::default();
        stats.record(&FileOutcome::CopiedVerbatim {
            reason: Some(MergeFailure::UnbalancedBraces { open: 1, close: 0 }),
        });
        assert_eq!(stats.copied, 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.errors.len(), 1);
    }

    #[test]
    fn copied_without_reason_is_a_plain_skip_style_copy() {
        let mut stats = RunStats::default();
        stats.record(&FileOutcome::CopiedVerbatim { reason: None });
        assert_eq!(stats.copied, 1);
        assert_eq!(stats.failed, 0);
    }

    #[test]
    fn skipped_outcome_increments_skipped() {
        let mut stats = RunStats::default();
        stats.record(&FileOutcome::Skipped);
        assert_eq!(stats.skipped, 1);
    }
}
