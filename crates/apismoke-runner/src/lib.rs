//! apismoke-runner: blocking HTTP execution for smoke plans
//!
//! Authenticates with reqwest, walks the plan sequentially, and offers a
//! small concurrent latency probe.

pub mod auth;
pub mod client;
pub mod exec;
pub mod latency;
pub mod placeholder;

pub use auth::{AuthError, Session};
pub use client::{ApiClient, ClientError, OutboundRequest, Reply};
pub use exec::{RunError, RunOutput, SmokeRunner};
pub use latency::{ProbeError, ProbeStats, render_table, run_probe};
