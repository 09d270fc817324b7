//! Per-call result records
//!
//! One [`CaseOutcome`] is created per HTTP call and never mutated afterwards.
//! A wrong status code and a transport error produce the same kind of record;
//! only the message text differs.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::plan::Priority;

/// Snapshot of the HTTP request as sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RequestSnapshot {
    pub method: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub headers: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

/// Snapshot of the HTTP response as received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ResponseSnapshot {
    pub status_code: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default)]
    pub latency_ms: u64,
}

/// One record of a single HTTP call's outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CaseOutcome {
    /// Test name from the plan
    pub name: String,
    /// Category label
    pub category: String,
    /// Priority segment
    pub priority: Priority,
    /// HTTP method
    pub method: String,
    /// Resolved endpoint path
    pub path: String,
    /// Acceptable status codes
    pub expected: Vec<u16>,
    /// Status actually received; `None` when the call never got a response
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_status: Option<u16>,
    /// Pass or fail
    pub passed: bool,
    /// Free-text detail: check description or transport error text
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
    /// Round-trip time in milliseconds (0 when the call never completed)
    #[serde(default)]
    pub latency_ms: u64,
}

impl CaseOutcome {
    /// Record a completed call. Pass iff `status` is in `expected`.
    #[must_use]
    pub fn from_status(
        name: impl Into<String>,
        category: impl Into<String>,
        priority: Priority,
        method: impl Into<String>,
        path: impl Into<String>,
        expected: Vec<u16>,
        status: u16,
    ) -> Self {
        let passed = expected.contains(&status);
        let message = if passed {
            String::new()
        } else {
            format!("expected {expected:?}, got {status}")
        };
        Self {
            name: name.into(),
            category: category.into(),
            priority,
            method: method.into(),
            path: path.into(),
            expected,
            actual_status: Some(status),
            passed,
            message,
            latency_ms: 0,
        }
    }

    /// Record a call that never produced a response (transport error).
    #[must_use]
    pub fn from_error(
        name: impl Into<String>,
        category: impl Into<String>,
        priority: Priority,
        method: impl Into<String>,
        path: impl Into<String>,
        expected: Vec<u16>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            priority,
            method: method.into(),
            path: path.into(),
            expected,
            actual_status: None,
            passed: false,
            message: error.into(),
            latency_ms: 0,
        }
    }

    /// Demote a status-matched outcome to failure with a check message.
    /// Used when the status was acceptable but a follow-up check was not.
    #[must_use]
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.passed = false;
        self.message = message.into();
        self
    }

    /// Attach the round-trip time.
    #[must_use]
    pub fn with_latency(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    /// Operation label, e.g. "GET /api/tasks"
    #[must_use]
    pub fn operation_label(&self) -> String {
        format!("{} {}", self.method, self.path)
    }
}

/// A full request/response pair with its outcome, for dumps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Exchange {
    /// Test name from the plan
    pub case: String,
    /// Category label
    pub category: String,
    pub request: RequestSnapshot,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<ResponseSnapshot>,
    pub passed: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
}
