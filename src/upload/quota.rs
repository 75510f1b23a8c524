//! Quota Evaluator
//!
//! Usage is recomputed from a freshly fetched file list on every check.
//! Nothing is cached between requests, so two concurrent commits for the
//! same user can both pass before either is recorded.

use super::types::{FileRecord, UserFiles};

/// A user's usage and allotment at the time of a check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaState {
    /// Sum of declared sizes of recorded files, `u64::MAX` if it overflowed
    pub used: u64,

    /// Maximum total declared size
    pub allotment: u64,

    usage_overflowed: bool,
}

impl QuotaState {
    /// Derive the quota state from a metadata snapshot.
    ///
    /// Falls back to `default_allotment` when the store does not report one.
    pub fn from_snapshot(snapshot: &UserFiles, default_allotment: u64) -> Self {
        let used = recorded_usage(&snapshot.files);
        Self {
            used: used.unwrap_or(u64::MAX),
            allotment: snapshot.alloted_size.unwrap_or(default_allotment),
            usage_overflowed: used.is_none(),
        }
    }

    /// Whether adding `candidate` bytes would go over the allotment.
    ///
    /// Any overflow counts as over.
    pub fn would_exceed(&self, candidate: u64) -> bool {
        if self.usage_overflowed {
            return true;
        }
        match self.used.checked_add(candidate) {
            Some(after) => after > self.allotment,
            None => true,
        }
    }

    /// Bytes still available
    pub fn remaining(&self) -> u64 {
        self.allotment.saturating_sub(self.used)
    }
}

/// Sum of declared sizes, `None` on overflow
pub fn recorded_usage(files: &[FileRecord]) -> Option<u64> {
    files
        .iter()
        .try_fold(0u64, |acc, f| acc.checked_add(f.declared_size()))
}
