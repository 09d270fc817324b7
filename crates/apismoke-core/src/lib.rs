//! apismoke-core: Core types, tally, and verdict logic for API smoke testing
//!
//! This crate provides the fundamental types for describing smoke plans,
//! recording per-call outcomes, tallying them by category and priority,
//! and turning a finished run into a verdict and report.

pub mod config;
pub mod dump;
pub mod outcome;
pub mod plan;
pub mod preview;
pub mod report;
pub mod tally;
pub mod verdict;

pub use config::{AuthConfig, Config, ConfigError, ProbeConfig};
pub use dump::{DumpError, DumpIndex};
pub use outcome::{CaseOutcome, Exchange, RequestSnapshot, ResponseSnapshot};
pub use plan::{Case, Plan, PlanError, Priority};
pub use preview::{PlanPreview, Validation, ValidationStatus, build_preview};
pub use report::{ReportError, RunMeta, RunReport, generate_schema};
pub use tally::{GroupTally, RunSummary, format_pct};
pub use verdict::{Grade, Verdict, VerdictPolicy, VerdictStatus};
