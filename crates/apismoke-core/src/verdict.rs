//! Verdict: qualitative grade, gating policy, and exit codes
//!
//! Exit codes are deterministic: 0 clean pass, 1 failures tolerated only in
//! strict mode, 2 gate breached (rate below threshold or a critical-priority
//! failure), 3 tool error (nothing ran).

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::tally::{RunSummary, format_pct};

/// Qualitative grade derived from the overall pass rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Grade {
    Critical,
    NeedsImprovement,
    Good,
    Excellent,
}

impl Grade {
    /// Grade thresholds: ≥90% excellent, ≥75% good, ≥50% needs improvement.
    #[must_use]
    pub fn from_rate(rate: f64) -> Self {
        if rate >= 0.9 {
            Self::Excellent
        } else if rate >= 0.75 {
            Self::Good
        } else if rate >= 0.5 {
            Self::NeedsImprovement
        } else {
            Self::Critical
        }
    }

    /// Display label, uppercase for the terminal report.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Excellent => "EXCELLENT",
            Self::Good => "GOOD",
            Self::NeedsImprovement => "NEEDS IMPROVEMENT",
            Self::Critical => "CRITICAL",
        }
    }
}

impl std::fmt::Display for Grade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pass or fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum VerdictStatus {
    Pass,
    Fail,
}

impl std::fmt::Display for VerdictStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pass => write!(f, "PASS"),
            Self::Fail => write!(f, "FAIL"),
        }
    }
}

/// Policy for judging a run summary
#[derive(Debug, Clone)]
pub struct VerdictPolicy {
    /// Strict mode: any failure fails the run
    pub strict: bool,
    /// Minimum overall pass rate (0.0–1.0)
    pub min_pass_rate: f64,
    /// A failed critical-priority case breaches the gate outright
    pub critical_must_pass: bool,
}

impl Default for VerdictPolicy {
    fn default() -> Self {
        Self {
            strict: true, // Default is strict - explicit opt-out required
            min_pass_rate: 0.9,
            critical_must_pass: true,
        }
    }
}

impl VerdictPolicy {
    /// Create a lenient policy (failures above the rate threshold don't fail)
    #[must_use]
    pub fn lenient() -> Self {
        Self {
            strict: false,
            ..Default::default()
        }
    }

    /// Judge a finished run.
    #[must_use]
    pub fn verdict(&self, summary: &RunSummary) -> Verdict {
        let rate = summary.pass_rate();
        let grade = Grade::from_rate(rate);

        if summary.total == 0 {
            return Verdict {
                grade: Grade::Critical,
                status: VerdictStatus::Fail,
                exit_code: 3,
                reason: "No cases were run".to_string(),
            };
        }

        if summary.all_passed() {
            return Verdict {
                grade,
                status: VerdictStatus::Pass,
                exit_code: 0,
                reason: format!("All {} cases passed", summary.total),
            };
        }

        let mut parts = vec![format!(
            "{} of {} cases failed ({}% pass)",
            summary.failed,
            summary.total,
            format_pct(rate),
        )];

        let critical = summary.critical_failures();
        if critical > 0 {
            parts.push(format!("{critical} critical-priority failures"));
        }

        let gate_breached =
            rate < self.min_pass_rate || (self.critical_must_pass && critical > 0);

        let (status, exit_code) = if gate_breached {
            (VerdictStatus::Fail, 2)
        } else if self.strict {
            (VerdictStatus::Fail, 1)
        } else {
            (VerdictStatus::Pass, 0)
        };

        Verdict {
            grade,
            status,
            exit_code,
            reason: parts.join("; "),
        }
    }
}

/// Final verdict
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Verdict {
    pub grade: Grade,
    pub status: VerdictStatus,
    pub exit_code: i32,
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::CaseOutcome;
    use crate::plan::Priority;

    fn summary_with(passed: u64, failed: u64, critical_failed: u64) -> RunSummary {
        let mut summary = RunSummary::new();
        for i in 0..passed {
            summary.record(&CaseOutcome::from_status(
                format!("p{i}"),
                "general",
                Priority::Medium,
                "GET",
                "/x",
                vec![200],
                200,
            ));
        }
        for i in 0..failed {
            summary.record(&CaseOutcome::from_status(
                format!("f{i}"),
                "general",
                Priority::Medium,
                "GET",
                "/x",
                vec![200],
                500,
            ));
        }
        for i in 0..critical_failed {
            summary.record(&CaseOutcome::from_status(
                format!("c{i}"),
                "general",
                Priority::Critical,
                "GET",
                "/x",
                vec![200],
                500,
            ));
        }
        summary
    }

    #[test]
    fn grade_thresholds() {
        assert_eq!(Grade::from_rate(1.0), Grade::Excellent);
        assert_eq!(Grade::from_rate(0.9), Grade::Excellent);
        assert_eq!(Grade::from_rate(0.89), Grade::Good);
        assert_eq!(Grade::from_rate(0.75), Grade::Good);
        assert_eq!(Grade::from_rate(0.6), Grade::NeedsImprovement);
        assert_eq!(Grade::from_rate(0.5), Grade::NeedsImprovement);
        assert_eq!(Grade::from_rate(0.49), Grade::Critical);
        assert_eq!(Grade::from_rate(0.0), Grade::Critical);
    }

    #[test]
    fn grade_labels() {
        assert_eq!(Grade::Excellent.as_str(), "EXCELLENT");
        assert_eq!(Grade::NeedsImprovement.as_str(), "NEEDS IMPROVEMENT");
    }

    #[test]
    fn default_policy_is_strict() {
        let policy = VerdictPolicy::default();
        assert!(policy.strict);
        assert!(policy.critical_must_pass);
    }

    #[test]
    fn verdict_all_pass_is_exit_0() {
        let v = VerdictPolicy::default().verdict(&summary_with(20, 0, 0));
        assert_eq!(v.status, VerdictStatus::Pass);
        assert_eq!(v.exit_code, 0);
        assert_eq!(v.grade, Grade::Excellent);
        assert_eq!(v.reason, "All 20 cases passed");
    }

    #[test]
    fn verdict_empty_run_is_tool_error() {
        let v = VerdictPolicy::default().verdict(&RunSummary::new());
        assert_eq!(v.status, VerdictStatus::Fail);
        assert_eq!(v.exit_code, 3);
        assert!(v.reason.contains("No cases"));
    }

    #[test]
    fn verdict_failures_above_threshold_strict() {
        // 19/20 = 95% pass, no critical — strict turns it into exit 1
        let v = VerdictPolicy::default().verdict(&summary_with(19, 1, 0));
        assert_eq!(v.status, VerdictStatus::Fail);
        assert_eq!(v.exit_code, 1);
        assert!(v.reason.contains("1 of 20 cases failed"));
    }

    #[test]
    fn verdict_failures_above_threshold_lenient() {
        let v = VerdictPolicy::lenient().verdict(&summary_with(19, 1, 0));
        assert_eq!(v.status, VerdictStatus::Pass);
        assert_eq!(v.exit_code, 0);
    }

    #[test]
    fn verdict_low_rate_breaches_gate() {
        // 10/20 = 50% pass, under the 90% gate even in lenient mode
        let v = VerdictPolicy::lenient().verdict(&summary_with(10, 10, 0));
        assert_eq!(v.status, VerdictStatus::Fail);
        assert_eq!(v.exit_code, 2);
        assert_eq!(v.grade, Grade::NeedsImprovement);
    }

    #[test]
    fn verdict_critical_failure_breaches_gate() {
        // 19/20 = 95% pass, but one critical-priority failure
        let v = VerdictPolicy::lenient().verdict(&summary_with(19, 0, 1));
        assert_eq!(v.status, VerdictStatus::Fail);
        assert_eq!(v.exit_code, 2);
        assert!(v.reason.contains("1 critical-priority failures"));
    }

    #[test]
    fn verdict_critical_gate_can_be_disabled() {
        let policy = VerdictPolicy {
            critical_must_pass: false,
            ..VerdictPolicy::lenient()
        };
        let v = policy.verdict(&summary_with(19, 0, 1));
        assert_eq!(v.status, VerdictStatus::Pass);
        assert_eq!(v.exit_code, 0);
    }

    #[test]
    fn verdict_custom_rate_threshold() {
        let policy = VerdictPolicy {
            min_pass_rate: 0.5,
            ..VerdictPolicy::lenient()
        };
        // 60% pass clears a 50% gate
        let v = policy.verdict(&summary_with(12, 8, 0));
        assert_eq!(v.status, VerdictStatus::Pass);
        assert_eq!(v.exit_code, 0);
    }

    #[test]
    fn verdict_serialization() {
        let v = VerdictPolicy::default().verdict(&summary_with(5, 0, 0));
        let json = serde_json::to_string(&v).unwrap();
        assert!(json.contains("\"PASS\""));
        assert!(json.contains("\"excellent\""));
    }
}
