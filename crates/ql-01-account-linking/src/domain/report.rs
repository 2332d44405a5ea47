//! Per-caller outcome accumulator.
//!
//! Each attempt yields its own result; aggregation happens in a value the
//! caller owns and merges, never in shared process state.

use serde::{Deserialize, Serialize};

use super::entities::LinkingResult;
use super::errors::LinkingError;

/// Counts of attempt outcomes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeTally {
    pub total: u64,
    pub linked: u64,
    pub rejected: u64,
    pub expired: u64,
    pub already_resolved: u64,
    /// Decode, store, sink and other non-protocol failures.
    pub errors: u64,
}

impl OutcomeTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one attempt outcome.
    pub fn record(&mut self, outcome: &Result<LinkingResult, LinkingError>) {
        self.total += 1;
        match outcome {
            Ok(_) => self.linked += 1,
            Err(LinkingError::ChallengeExpired { .. }) => self.expired += 1,
            Err(LinkingError::AlreadyResolved { .. }) => self.already_resolved += 1,
            Err(err) if err.is_rejection() => self.rejected += 1,
            Err(_) => self.errors += 1,
        }
    }

    /// Combine two tallies.
    pub fn merge(mut self, other: OutcomeTally) -> Self {
        self.total += other.total;
        self.linked += other.linked;
        self.rejected += other.rejected;
        self.expired += other.expired;
        self.already_resolved += other.already_resolved;
        self.errors += other.errors;
        self
    }

    /// Fraction of attempts that linked, in `[0, 1]`.
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.linked as f64 / self.total as f64
    }
}

impl std::fmt::Display for OutcomeTally {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} attempts: {} linked, {} rejected, {} expired, {} already resolved, {} errors",
            self.total, self.linked, self.rejected, self.expired, self.already_resolved, self.errors
        )
    }
}
