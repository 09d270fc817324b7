//! Plan preview and config validation
//!
//! Describes what a run *would* do without sending any requests.
//! Used for pre-flight validation and CI previews.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::config::{Config, MAX_PROBE_WORKERS};
use crate::plan::{Plan, template_params};

// ── Preview types ──

/// Complete preview: per-case listing and config/plan validation results.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PlanPreview {
    /// Per-case listing in execution order
    pub cases: Vec<CasePreview>,
    /// Total requests a run would send (login call excluded)
    pub total_requests: u64,
    /// Config/plan validation results
    pub validations: Vec<Validation>,
}

/// What one case would do.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CasePreview {
    /// Test name
    pub name: String,
    /// Operation label, e.g. "GET /api/tasks"
    pub operation: String,
    /// Category label
    pub category: String,
    /// Priority segment
    pub priority: String,
    /// Acceptable status codes
    pub expect: Vec<u16>,
    /// Whether the case sends without the bearer token
    pub skip_auth: bool,
    /// `{param}` templates found in the path
    pub params: Vec<String>,
}

/// A validation check result.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Validation {
    pub check: String,
    pub status: ValidationStatus,
    pub message: String,
}

/// Status of a validation check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    Ok,
    Warning,
    Error,
}

impl std::fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ok => write!(f, "OK"),
            Self::Warning => write!(f, "WARNING"),
            Self::Error => write!(f, "ERROR"),
        }
    }
}

// ── Config validation ──

/// Patterns that suggest a placeholder value rather than a real credential.
/// Smoke configs ship literal credential pairs, so this is a first-class check.
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-token",
    "your_token",
    "YOUR_TOKEN",
    "your-api-key",
    "YOUR_API_KEY",
    "your-password",
    "TODO",
    "CHANGEME",
    "changeme",
    "change-this",
    "placeholder",
    "xxx",
    "XXX",
    "replace-me",
    "REPLACE_ME",
    "insert-",
    "INSERT_",
    "example",
];

fn looks_like_placeholder(value: &str) -> Option<String> {
    if value.contains('<') && value.contains('>') {
        return Some("contains '<...>' placeholder".to_string());
    }
    PLACEHOLDER_PATTERNS
        .iter()
        .find(|p| value.contains(*p))
        .map(|p| format!("contains '{p}' — may be placeholder"))
}

/// Validate config and produce validation results.
#[must_use]
pub fn validate_config(config: &Config) -> Vec<Validation> {
    let mut checks = Vec::new();

    // Base URL
    if config.base_url.starts_with("http://") || config.base_url.starts_with("https://") {
        checks.push(Validation {
            check: "base_url".into(),
            status: ValidationStatus::Ok,
            message: format!("base_url: {}", config.base_url),
        });
    } else {
        checks.push(Validation {
            check: "base_url".into(),
            status: ValidationStatus::Warning,
            message: format!(
                "base_url: {} (missing http:// or https:// prefix)",
                config.base_url
            ),
        });
    }

    // Auth credentials — check for placeholders
    match &config.auth {
        None => checks.push(Validation {
            check: "auth".into(),
            status: ValidationStatus::Ok,
            message: "auth: none configured (all calls unauthenticated)".into(),
        }),
        Some(auth) => {
            let mut issues = Vec::new();
            for (field, value) in [("email", &auth.email), ("password", &auth.password)] {
                if let Some(why) = looks_like_placeholder(value) {
                    issues.push(format!("auth.{field}: {why}"));
                }
            }
            if issues.is_empty() {
                checks.push(Validation {
                    check: "auth".into(),
                    status: ValidationStatus::Ok,
                    message: format!("auth: login as {} via {}", auth.email, auth.login_path),
                });
            } else {
                for issue in issues {
                    checks.push(Validation {
                        check: "auth".into(),
                        status: ValidationStatus::Warning,
                        message: issue,
                    });
                }
            }
        }
    }

    // Headers — check for placeholders
    for (key, value) in &config.headers {
        if let Some(why) = looks_like_placeholder(value) {
            checks.push(Validation {
                check: "headers".into(),
                status: ValidationStatus::Warning,
                message: format!("{key}: {why}"),
            });
        }
    }

    // Probe settings
    if let Some(probe) = &config.probe {
        if probe.paths.is_empty() {
            checks.push(Validation {
                check: "probe".into(),
                status: ValidationStatus::Warning,
                message: "probe: no paths configured".into(),
            });
        } else if probe.workers > MAX_PROBE_WORKERS {
            checks.push(Validation {
                check: "probe".into(),
                status: ValidationStatus::Warning,
                message: format!(
                    "probe: workers {} clamped to {}",
                    probe.workers, MAX_PROBE_WORKERS
                ),
            });
        } else {
            checks.push(Validation {
                check: "probe".into(),
                status: ValidationStatus::Ok,
                message: format!(
                    "probe: {} paths, {} workers",
                    probe.paths.len(),
                    probe.effective_workers()
                ),
            });
        }
    }

    checks
}

/// Validate a plan against the config's parameter context.
#[must_use]
pub fn validate_plan(plan: &Plan, config: &Config) -> Vec<Validation> {
    let mut checks = Vec::new();

    if plan.cases.is_empty() {
        checks.push(Validation {
            check: "plan".into(),
            status: ValidationStatus::Error,
            message: "plan has no cases".into(),
        });
        return checks;
    }

    checks.push(Validation {
        check: "plan".into(),
        status: ValidationStatus::Ok,
        message: format!("plan: {} cases", plan.cases.len()),
    });

    // Duplicate names
    let mut seen = HashSet::new();
    for case in &plan.cases {
        if !seen.insert(case.name.as_str()) {
            checks.push(Validation {
                check: "plan".into(),
                status: ValidationStatus::Warning,
                message: format!("duplicate case name '{}'", case.name),
            });
        }
    }

    // Methods
    for case in &plan.cases {
        if !case.has_known_method() {
            checks.push(Validation {
                check: "plan".into(),
                status: ValidationStatus::Error,
                message: format!("case '{}': unknown method '{}'", case.name, case.method),
            });
        }
    }

    // Path parameter sources: static path_params plus auth-extracted context
    let mut known_params: HashSet<&str> =
        config.path_params.keys().map(String::as_str).collect();
    if let Some(auth) = &config.auth {
        known_params.extend(auth.context_pointers.keys().map(String::as_str));
    }
    for case in &plan.cases {
        for param in template_params(&case.path) {
            if !known_params.contains(param.as_str()) {
                checks.push(Validation {
                    check: "plan".into(),
                    status: ValidationStatus::Warning,
                    message: format!(
                        "case '{}': path parameter '{{{param}}}' has no source",
                        case.name
                    ),
                });
            }
        }
    }

    checks
}

/// Build the full preview: case listing plus all validations.
#[must_use]
pub fn build_preview(config: &Config, plan: &Plan) -> PlanPreview {
    let cases: Vec<CasePreview> = plan
        .cases
        .iter()
        .map(|case| CasePreview {
            name: case.name.clone(),
            operation: case.operation_label(),
            category: case.category().to_string(),
            priority: case.priority.to_string(),
            expect: case.expect.clone(),
            skip_auth: case.skip_auth,
            params: template_params(&case.path),
        })
        .collect();

    let mut validations = validate_config(config);
    validations.extend(validate_plan(plan, config));

    PlanPreview {
        total_requests: cases.len() as u64,
        cases,
        validations,
    }
}

// ── Display helpers ──

impl PlanPreview {
    /// Format as human-readable terminal output.
    #[must_use]
    pub fn to_terminal(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!(
            "Dry run: {} cases, {} requests planned\n",
            self.cases.len(),
            self.total_requests,
        ));

        for case in &self.cases {
            let mut line = format!(
                "  [{}] {}: {} (expect {:?})",
                case.priority, case.operation, case.name, case.expect
            );
            if case.skip_auth {
                line.push_str(" [no auth]");
            }
            lines.push(line);
            if !case.params.is_empty() {
                lines.push(format!("        params: {}", case.params.join(", ")));
            }
        }

        lines.push(String::new());
        lines.push("Validation:".into());
        for v in &self.validations {
            lines.push(format!("  [{}] {}", v.status, v.message));
        }

        lines.join("\n")
    }

    /// Returns true if any validation has Error status.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.validations
            .iter()
            .any(|v| v.status == ValidationStatus::Error)
    }

    /// Returns true if any validation has Warning status.
    #[must_use]
    pub fn has_warnings(&self) -> bool {
        self.validations
            .iter()
            .any(|v| v.status == ValidationStatus::Warning)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuthConfig;
    use crate::plan::parse_plan;
    use std::collections::HashMap;
    use std::path::Path;

    fn config_with_auth(email: &str, password: &str) -> Config {
        Config {
            auth: Some(AuthConfig {
                login_path: "/api/auth/login".into(),
                email: email.into(),
                password: password.into(),
                token_pointer: "/access_token".into(),
                context_pointers: HashMap::new(),
                required: true,
            }),
            ..Config::default()
        }
    }

    fn plan_from_toml(toml: &str) -> Plan {
        parse_plan(Path::new("plan.toml"), toml).unwrap()
    }

    #[test]
    fn validate_placeholder_password() {
        let checks = validate_config(&config_with_auth("qa@example.com", "CHANGEME"));
        let auth_checks: Vec<_> = checks.iter().filter(|c| c.check == "auth").collect();
        assert!(
            auth_checks
                .iter()
                .any(|c| c.status == ValidationStatus::Warning),
            "Should warn about CHANGEME placeholder"
        );
    }

    #[test]
    fn validate_placeholder_angle_brackets() {
        let mut config = Config::default();
        config
            .headers
            .insert("Authorization".into(), "Bearer <your-token-here>".into());
        let checks = validate_config(&config);
        assert!(
            checks
                .iter()
                .any(|c| c.check == "headers" && c.status == ValidationStatus::Warning),
            "Should warn about angle-bracket placeholder"
        );
    }

    #[test]
    fn validate_real_credentials_no_warning() {
        let checks = validate_config(&config_with_auth("qa@corp.io", "s3cure-Pa55!"));
        let auth_checks: Vec<_> = checks.iter().filter(|c| c.check == "auth").collect();
        assert_eq!(auth_checks.len(), 1);
        assert_eq!(auth_checks[0].status, ValidationStatus::Ok);
    }

    #[test]
    fn validate_bad_base_url() {
        let config = Config {
            base_url: "localhost:8080".into(),
            ..Config::default()
        };
        let checks = validate_config(&config);
        let url_check = checks.iter().find(|c| c.check == "base_url").unwrap();
        assert_eq!(url_check.status, ValidationStatus::Warning);
    }

    #[test]
    fn validate_empty_plan_is_error() {
        let plan = Plan {
            name: None,
            cases: vec![],
        };
        let checks = validate_plan(&plan, &Config::default());
        assert_eq!(checks.len(), 1);
        assert_eq!(checks[0].status, ValidationStatus::Error);
    }

    #[test]
    fn validate_duplicate_names() {
        let plan = plan_from_toml(
            r#"
[[cases]]
name = "health"
method = "GET"
path = "/h"

[[cases]]
name = "health"
method = "GET"
path = "/h2"
"#,
        );
        let checks = validate_plan(&plan, &Config::default());
        assert!(
            checks
                .iter()
                .any(|c| c.status == ValidationStatus::Warning
                    && c.message.contains("duplicate case name"))
        );
    }

    #[test]
    fn validate_unknown_method_is_error() {
        let plan = plan_from_toml(
            r#"
[[cases]]
name = "weird"
method = "FETCH"
path = "/h"
"#,
        );
        let checks = validate_plan(&plan, &Config::default());
        assert!(
            checks
                .iter()
                .any(|c| c.status == ValidationStatus::Error && c.message.contains("FETCH"))
        );
    }

    #[test]
    fn validate_unresolved_path_param() {
        let plan = plan_from_toml(
            r#"
[[cases]]
name = "get user"
method = "GET"
path = "/api/users/{user_id}"
"#,
        );
        let checks = validate_plan(&plan, &Config::default());
        assert!(
            checks
                .iter()
                .any(|c| c.status == ValidationStatus::Warning
                    && c.message.contains("{user_id}"))
        );
    }

    #[test]
    fn validate_param_resolved_from_path_params() {
        let mut config = Config::default();
        config.path_params.insert("user_id".into(), "42".into());
        let plan = plan_from_toml(
            r#"
[[cases]]
name = "get user"
method = "GET"
path = "/api/users/{user_id}"
"#,
        );
        let checks = validate_plan(&plan, &config);
        assert!(!checks.iter().any(|c| c.message.contains("{user_id}")));
    }

    #[test]
    fn validate_param_resolved_from_auth_context() {
        let mut config = config_with_auth("qa@corp.io", "pw");
        config
            .auth
            .as_mut()
            .unwrap()
            .context_pointers
            .insert("user_id".into(), "/user/id".into());
        let plan = plan_from_toml(
            r#"
[[cases]]
name = "get user"
method = "GET"
path = "/api/users/{user_id}"
"#,
        );
        let checks = validate_plan(&plan, &config);
        assert!(!checks.iter().any(|c| c.message.contains("{user_id}")));
    }

    #[test]
    fn preview_terminal_output() {
        let mut config = Config::default();
        config.path_params.insert("user_id".into(), "42".into());
        let plan = plan_from_toml(
            r#"
name = "demo"

[[cases]]
name = "login"
category = "auth"
priority = "critical"
method = "POST"
path = "/api/auth/login"
skip_auth = true
expect = [200]

[[cases]]
name = "get user"
method = "GET"
path = "/api/users/{user_id}"
"#,
        );
        let preview = build_preview(&config, &plan);
        let text = preview.to_terminal();

        assert!(text.contains("2 cases, 2 requests planned"));
        assert!(text.contains("[critical] POST /api/auth/login: login (expect [200]) [no auth]"));
        assert!(text.contains("params: user_id"));
        assert!(text.contains("[OK] base_url: http://localhost:8080"));
        assert!(!preview.has_errors());
    }

    #[test]
    fn preview_has_errors() {
        let preview = build_preview(
            &Config::default(),
            &Plan {
                name: None,
                cases: vec![],
            },
        );
        assert!(preview.has_errors());
        assert_eq!(preview.total_requests, 0);
    }
}
