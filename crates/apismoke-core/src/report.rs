//! Run report: the serializable record of one run, and its renderings
//!
//! The JSON form is the interchange format; `generate_schema` exports its
//! JSON Schema for consumers (CI annotations, dashboards).

use std::path::Path;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::outcome::CaseOutcome;
use crate::tally::{RunSummary, format_pct};
use crate::verdict::Verdict;

/// Run metadata: where, what, when.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RunMeta {
    /// Base URL the run targeted
    pub base_url: String,
    /// Plan label
    pub plan: String,
    /// ISO 8601 start time
    pub timestamp: String,
    /// Wall-clock duration of the run
    pub duration_secs: f64,
}

/// Complete record of one run.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RunReport {
    pub meta: RunMeta,
    pub verdict: Verdict,
    pub summary: RunSummary,
    /// Every case outcome, in execution order
    pub results: Vec<CaseOutcome>,
}

impl RunReport {
    /// Format as human-readable terminal output.
    ///
    /// Deliberately omits timestamp and duration so output is reproducible.
    #[must_use]
    pub fn to_terminal(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("{} @ {}", self.meta.plan, self.meta.base_url));
        lines.push(String::new());
        lines.push(format!(
            "Cases: {} total, {} passed, {} failed ({}%)",
            self.summary.total,
            self.summary.passed,
            self.summary.failed,
            format_pct(self.summary.pass_rate()),
        ));

        if !self.summary.categories.is_empty() {
            lines.push(String::new());
            lines.push("Categories:".to_string());
            for (name, tally) in &self.summary.categories {
                lines.push(format!(
                    "  {name}: {}/{} passed ({}%)",
                    tally.passed,
                    tally.total,
                    format_pct(tally.pass_rate()),
                ));
            }
        }

        if !self.summary.priorities.is_empty() {
            lines.push(String::new());
            lines.push("Priorities:".to_string());
            for (priority, tally) in &self.summary.priorities {
                lines.push(format!(
                    "  {priority}: {}/{} passed ({}%)",
                    tally.passed,
                    tally.total,
                    format_pct(tally.pass_rate()),
                ));
            }
        }

        let failures: Vec<&CaseOutcome> = self.results.iter().filter(|r| !r.passed).collect();
        if !failures.is_empty() {
            lines.push(String::new());
            lines.push(format!("Failures ({}):", failures.len()));
            for f in &failures {
                let status = f
                    .actual_status
                    .map_or_else(|| "no response".to_string(), |s| s.to_string());
                lines.push(format!(
                    "  [{}] {} {} -> {} ({})",
                    f.priority, f.method, f.path, status, f.name
                ));
                if !f.message.is_empty() {
                    lines.push(format!("         {}", f.message));
                }
            }
        }

        lines.push(String::new());
        lines.push(format!("Grade: {}", self.verdict.grade));
        lines.push(format!("{}: {}", self.verdict.status, self.verdict.reason));

        lines.join("\n")
    }

    /// Write the pretty-printed JSON report.
    ///
    /// # Errors
    ///
    /// Returns error if serialization or the write fails.
    pub fn write_json(&self, path: &Path) -> Result<(), ReportError> {
        let json =
            serde_json::to_string_pretty(self).map_err(|e| ReportError::Serialize(e.to_string()))?;
        std::fs::write(path, json)
            .map_err(|e| ReportError::Io(format!("{}: {e}", path.display())))
    }
}

/// Export the JSON Schema of [`RunReport`] as pretty-printed JSON.
#[must_use]
pub fn generate_schema() -> String {
    let schema = schemars::schema_for!(RunReport);
    serde_json::to_string_pretty(&schema).unwrap_or_default()
}

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Serialization error: {0}")]
    Serialize(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::Priority;
    use crate::verdict::VerdictPolicy;

    fn sample_report() -> RunReport {
        let results = vec![
            CaseOutcome::from_status(
                "health check",
                "infra",
                Priority::Critical,
                "GET",
                "/api/health",
                vec![200],
                200,
            )
            .with_latency(12),
            CaseOutcome::from_status(
                "list tasks",
                "tasks",
                Priority::High,
                "GET",
                "/api/tasks",
                vec![200],
                200,
            )
            .with_latency(35),
            CaseOutcome::from_status(
                "create task",
                "tasks",
                Priority::High,
                "POST",
                "/api/tasks",
                vec![201],
                500,
            )
            .with_latency(102),
        ];

        let mut summary = RunSummary::new();
        for r in &results {
            summary.record(r);
        }
        let verdict = VerdictPolicy::default().verdict(&summary);

        RunReport {
            meta: RunMeta {
                base_url: "http://localhost:8080".into(),
                plan: "backend smoke".into(),
                timestamp: "2026-02-05T19:30:00Z".into(),
                duration_secs: 1.5,
            },
            verdict,
            summary,
            results,
        }
    }

    #[test]
    fn terminal_rendering() {
        let report = sample_report();
        insta::assert_snapshot!(report.to_terminal(), @r"
        backend smoke @ http://localhost:8080

        Cases: 3 total, 2 passed, 1 failed (66.7%)

        Categories:
          infra: 1/1 passed (100%)
          tasks: 1/2 passed (50.0%)

        Priorities:
          critical: 1/1 passed (100%)
          high: 1/2 passed (50.0%)

        Failures (1):
          [high] POST /api/tasks -> 500 (create task)
                 expected [201], got 500

        Grade: NEEDS IMPROVEMENT
        FAIL: 1 of 3 cases failed (66.7% pass)
        ");
    }

    #[test]
    fn terminal_shows_no_response_failures() {
        let mut report = sample_report();
        report.results.push(CaseOutcome::from_error(
            "webhooks list",
            "webhooks",
            Priority::Medium,
            "GET",
            "/api/webhooks",
            vec![200],
            "connection refused",
        ));
        report.summary.record(report.results.last().unwrap());

        let text = report.to_terminal();
        assert!(text.contains("GET /api/webhooks -> no response (webhooks list)"));
        assert!(text.contains("connection refused"));
    }

    #[test]
    fn json_roundtrip() {
        let report = sample_report();
        let json = serde_json::to_string(&report).unwrap();
        let parsed: RunReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.summary.total, 3);
        assert_eq!(parsed.results.len(), 3);
        assert_eq!(parsed.verdict, report.verdict);
    }

    #[test]
    fn write_json_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        sample_report().write_json(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let parsed: RunReport = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed.meta.plan, "backend smoke");
    }

    #[test]
    fn schema_has_title() {
        let schema = generate_schema();
        let parsed: serde_json::Value = serde_json::from_str(&schema).unwrap();
        assert_eq!(
            parsed.get("title").and_then(|v| v.as_str()),
            Some("RunReport")
        );
    }
}
