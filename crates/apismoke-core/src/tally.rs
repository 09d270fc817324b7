//! Additive pass/fail counters, grouped by category and priority
//!
//! The only way counts change is [`RunSummary::record`], so
//! `total == passed + failed` holds by construction.

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::outcome::CaseOutcome;
use crate::plan::Priority;

/// Counters for one group (a category or a priority segment).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct GroupTally {
    pub total: u64,
    pub passed: u64,
    pub failed: u64,
}

impl GroupTally {
    fn record(&mut self, passed: bool) {
        self.total += 1;
        if passed {
            self.passed += 1;
        } else {
            self.failed += 1;
        }
    }

    /// Fraction of passed calls (0.0–1.0). Empty groups count as 0.
    #[must_use]
    pub fn pass_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.passed as f64 / self.total as f64
        }
    }
}

/// Aggregate counters for a whole run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct RunSummary {
    pub total: u64,
    pub passed: u64,
    pub failed: u64,
    /// Category name → counters (sorted for deterministic output)
    pub categories: BTreeMap<String, GroupTally>,
    /// Priority segment → counters (critical first)
    pub priorities: BTreeMap<Priority, GroupTally>,
}

impl RunSummary {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one outcome into the counters.
    pub fn record(&mut self, outcome: &CaseOutcome) {
        self.total += 1;
        if outcome.passed {
            self.passed += 1;
        } else {
            self.failed += 1;
        }
        self.categories
            .entry(outcome.category.clone())
            .or_default()
            .record(outcome.passed);
        self.priorities
            .entry(outcome.priority)
            .or_default()
            .record(outcome.passed);
    }

    /// Overall pass rate (0.0–1.0). Empty runs count as 0.
    #[must_use]
    pub fn pass_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.passed as f64 / self.total as f64
        }
    }

    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.total > 0 && self.failed == 0
    }

    /// Failed calls in the critical priority segment.
    #[must_use]
    pub fn critical_failures(&self) -> u64 {
        self.priorities
            .get(&Priority::Critical)
            .map_or(0, |t| t.failed)
    }
}

/// Format a pass rate for display: "0"/"100" without decimals, one decimal otherwise.
#[must_use]
pub fn format_pct(rate: f64) -> String {
    let pct = rate * 100.0;
    if pct == 0.0 || pct == 100.0 {
        format!("{pct:.0}")
    } else {
        format!("{pct:.1}")
    }
}
