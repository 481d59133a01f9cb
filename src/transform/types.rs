//! Resolver configuration and statistics

use crate::types::{MultipleMatchPolicy, NoMatchPolicy};
use arrow::record_batch::RecordBatch;
use serde::Serialize;

/// Policies of the play-event resolver
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolverConfig {
    /// Behavior when a play matches several catalog records
    pub on_multiple_match: MultipleMatchPolicy,
    /// Behavior when a play matches nothing
    pub on_no_match: NoMatchPolicy,
}

impl ResolverConfig {
    /// Create a config with default policies
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the multiple-match policy
    #[must_use]
    pub fn with_multiple_match(mut self, policy: MultipleMatchPolicy) -> Self {
        self.on_multiple_match = policy;
        self
    }

    /// Set the no-match policy
    #[must_use]
    pub fn with_no_match(mut self, policy: NoMatchPolicy) -> Self {
        self.on_no_match = policy;
        self
    }
}

/// Join observability counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct JoinStats {
    /// Play events considered
    pub total_plays: usize,
    /// Plays with at least one catalog match
    pub matched_plays: usize,
    /// Plays with no catalog match
    pub dropped_plays: usize,
    /// Plays with more than one catalog match
    pub fanned_out_plays: usize,
    /// Songplay rows emitted
    pub songplays: usize,
}

impl JoinStats {
    /// Create new stats
    pub fn new() -> Self {
        Self::default()
    }

    /// Fraction of plays that found no catalog match
    pub fn drop_ratio(&self) -> f64 {
        if self.total_plays == 0 {
            0.0
        } else {
            #[allow(clippy::cast_precision_loss)]
            let ratio = self.dropped_plays as f64 / self.total_plays as f64;
            ratio
        }
    }
}

/// Result of resolving play events
#[derive(Debug, Clone)]
pub struct SongplayOutput {
    /// The songplays fact table
    pub batch: RecordBatch,
    /// Join counters
    pub stats: JoinStats,
}
