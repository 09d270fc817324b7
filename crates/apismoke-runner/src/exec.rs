//! Sequential plan execution
//!
//! Authenticates once, then walks the plan in order over one blocking HTTP
//! session. Failures are recorded and the run moves on; `stop_on_failure`
//! is the single deliberate exception (CI fast-fail).

use std::collections::HashMap;

use rand::SeedableRng;
use rand::rngs::SmallRng;

use apismoke_core::config::Config;
use apismoke_core::outcome::{CaseOutcome, Exchange, RequestSnapshot};
use apismoke_core::plan::{Case, Plan};
use apismoke_core::tally::RunSummary;

use crate::auth::{self, Session};
use crate::client::{ApiClient, OutboundRequest, Reply};
use crate::placeholder::{expand_str, expand_value, fill_path};

/// Everything a finished run produced.
pub struct RunOutput {
    /// Per-case outcomes, in execution order
    pub results: Vec<CaseOutcome>,
    /// Aggregate counters
    pub summary: RunSummary,
    /// Request/response pairs for dumps
    pub exchanges: Vec<Exchange>,
    /// True when `stop_on_failure` cut the run short
    pub stopped_early: bool,
}

/// Sequential smoke-plan executor.
pub struct SmokeRunner {
    config: Config,
    plan: Plan,
    stop_on_failure: bool,
    limit: Option<u32>,
}

impl SmokeRunner {
    #[must_use]
    pub fn new(config: Config, plan: Plan) -> Self {
        Self {
            config,
            plan,
            stop_on_failure: false,
            limit: None,
        }
    }

    /// Stop on first failed case (fast-fail for CI)
    #[must_use]
    pub fn with_stop_on_failure(mut self, stop: bool) -> Self {
        self.stop_on_failure = stop;
        self
    }

    /// Run at most this many cases
    #[must_use]
    pub fn with_limit(mut self, limit: Option<u32>) -> Self {
        self.limit = limit;
        self
    }

    /// Execute the plan.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built or a `required`
    /// login fails. Per-case failures never error; they become outcomes.
    pub fn run(&self) -> Result<RunOutput, RunError> {
        let mut client = ApiClient::new(
            &self.config.base_url,
            self.config.headers.clone(),
            self.config.timeout_secs,
        )
        .map_err(|e| RunError::Http(e.to_string()))?;

        let session = match &self.config.auth {
            Some(auth_cfg) => match auth::login(&client, auth_cfg) {
                Ok(session) => {
                    eprintln!(
                        "Authenticated as {} ({} context ids)",
                        auth_cfg.email,
                        session.context.len()
                    );
                    session
                }
                Err(e) if auth_cfg.required => return Err(RunError::Auth(e.to_string())),
                Err(e) => {
                    eprintln!("Login failed ({e}), continuing unauthenticated");
                    Session::anonymous()
                }
            },
            None => Session::anonymous(),
        };
        client.set_token(session.token.clone());

        // Parameter context: static config params, auth-extracted ids win
        let mut params = self.config.path_params.clone();
        params.extend(session.context);

        let mut rng = SmallRng::from_entropy();
        let mut results: Vec<CaseOutcome> = Vec::new();
        let mut exchanges = Vec::new();
        let mut summary = RunSummary::new();
        let mut stopped_early = false;

        for case in &self.plan.cases {
            if self.limit.is_some_and(|l| results.len() as u32 >= l) {
                break;
            }

            let path = fill_path(&expand_str(&case.path, &mut rng), &params);
            let headers: HashMap<String, String> = case
                .headers
                .iter()
                .map(|(k, v)| (k.clone(), expand_str(v, &mut rng)))
                .collect();
            let body = case.body.as_ref().map(|b| expand_value(b, &mut rng));
            let upload_field = case.upload_field.as_deref().unwrap_or("file");

            let request = OutboundRequest {
                method: &case.method,
                path: &path,
                headers: &headers,
                body: body.as_ref(),
                upload: case.upload.as_deref().map(|p| (p, upload_field)),
                skip_auth: case.skip_auth,
            };

            let (outcome, exchange) = match client.send(&request) {
                Ok(reply) => {
                    let outcome =
                        evaluate(case, &path, &reply, self.config.response_time_limit);
                    let exchange = Exchange {
                        case: case.name.clone(),
                        category: case.category().to_string(),
                        request: reply.request.clone(),
                        response: Some(reply.response_snapshot()),
                        passed: outcome.passed,
                        message: outcome.message.clone(),
                    };
                    (outcome, exchange)
                }
                Err(e) => {
                    let outcome = CaseOutcome::from_error(
                        case.name.clone(),
                        case.category(),
                        case.priority,
                        case.method.to_ascii_uppercase(),
                        path.clone(),
                        case.expect.clone(),
                        e.to_string(),
                    );
                    let exchange = Exchange {
                        case: case.name.clone(),
                        category: case.category().to_string(),
                        request: RequestSnapshot {
                            method: case.method.to_ascii_uppercase(),
                            url: format!("{}{}", client.base_url(), path),
                            headers,
                            body: body.as_ref().and_then(|b| serde_json::to_string(b).ok()),
                        },
                        response: None,
                        passed: false,
                        message: outcome.message.clone(),
                    };
                    (outcome, exchange)
                }
            };

            if outcome.passed {
                eprintln!(
                    "  {}: ok ({} ms)",
                    outcome.operation_label(),
                    outcome.latency_ms
                );
            } else {
                eprintln!("  {}: FAIL ({})", outcome.operation_label(), outcome.message);
            }

            summary.record(&outcome);
            let failed = !outcome.passed;
            results.push(outcome);
            exchanges.push(exchange);

            if self.stop_on_failure && failed {
                stopped_early = true;
                break;
            }
        }

        if stopped_early {
            eprintln!("Stopped early: failure detected (--stop-on-failure)");
        }

        Ok(RunOutput {
            results,
            summary,
            exchanges,
            stopped_early,
        })
    }
}

/// Judge one reply against the case's expectations.
///
/// Status first; when the status is acceptable, follow-up checks (response
/// schema, response time) can still demote the outcome to a failure.
fn evaluate(case: &Case, path: &str, reply: &Reply, response_time_limit: Option<f64>) -> CaseOutcome {
    let mut outcome = CaseOutcome::from_status(
        case.name.clone(),
        case.category(),
        case.priority,
        case.method.to_ascii_uppercase(),
        path,
        case.expect.clone(),
        reply.status,
    )
    .with_latency(reply.latency_ms);

    if outcome.passed {
        if let Some(schema) = &case.response_schema {
            if let Some(message) = check_schema(schema, &reply.body_text) {
                outcome = outcome.failing(message);
            }
        }
    }

    if outcome.passed {
        if let Some(limit) = response_time_limit {
            let elapsed = reply.latency_ms as f64 / 1000.0;
            if elapsed > limit {
                outcome =
                    outcome.failing(format!("response took {elapsed:.3}s, limit {limit:.3}s"));
            }
        }
    }

    outcome
}

/// Validate a response body against a case's JSON Schema.
/// Returns a failure message, or `None` when the body conforms.
fn check_schema(schema: &serde_json::Value, body_text: &str) -> Option<String> {
    let body: serde_json::Value = match serde_json::from_str(body_text) {
        Ok(v) => v,
        Err(_) => return Some("response body is not valid JSON".to_string()),
    };

    let validator = match jsonschema::validator_for(schema) {
        Ok(v) => v,
        Err(e) => return Some(format!("invalid response_schema: {e}")),
    };

    let errors: Vec<String> = validator
        .iter_errors(&body)
        .take(5)
        .map(|e| e.to_string())
        .collect();
    if errors.is_empty() {
        None
    } else {
        Some(format!(
            "response body does not match schema: {}",
            errors.join("; ")
        ))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("authentication failed: {0}")]
    Auth(String),
}
