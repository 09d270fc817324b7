//! Smoke plan: the declarative inventory of HTTP calls to run
//!
//! A plan is a list of cases. Each case is one request with the statuses it
//! is allowed to answer with. Plans load from TOML, JSON, or YAML.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// HTTP methods a case may use.
pub const KNOWN_METHODS: &[&str] = &["GET", "POST", "PUT", "DELETE", "PATCH", "HEAD", "OPTIONS"];

/// A smoke plan: named list of cases, executed in order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    /// Plan name, shown in reports
    #[serde(default)]
    pub name: Option<String>,

    /// Cases in execution order
    pub cases: Vec<Case>,
}

/// One HTTP call and its expectations.
///
/// ```toml
/// [[cases]]
/// name = "list tasks"
/// category = "tasks"
/// priority = "critical"
/// method = "GET"
/// path = "/api/tasks"
/// expect = [200]
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Case {
    /// Test name (unique within the plan)
    pub name: String,

    /// Category label for the tally breakdown
    #[serde(default)]
    pub category: Option<String>,

    /// Priority segment for verdict gating
    #[serde(default)]
    pub priority: Priority,

    /// HTTP method
    pub method: String,

    /// Endpoint path; may contain `{param}` templates and `{{placeholders}}`
    pub path: String,

    /// JSON request body
    #[serde(default)]
    pub body: Option<serde_json::Value>,

    /// Per-case extra headers
    #[serde(default)]
    pub headers: HashMap<String, String>,

    /// Acceptable status codes (default: [200])
    #[serde(default = "default_expect")]
    pub expect: Vec<u16>,

    /// JSON Schema the response body must satisfy
    #[serde(default)]
    pub response_schema: Option<serde_json::Value>,

    /// File to send as a multipart upload
    #[serde(default)]
    pub upload: Option<PathBuf>,

    /// Multipart field name for the upload (default: "file")
    #[serde(default)]
    pub upload_field: Option<String>,

    /// Send without the bearer token (login/register cases)
    #[serde(default)]
    pub skip_auth: bool,
}

/// Priority segment. Ordering is by urgency: critical sorts first.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
    JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Critical,
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    /// Human-readable label
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_expect() -> Vec<u16> {
    vec![200]
}

impl Case {
    /// Operation label, e.g. "GET /api/tasks"
    #[must_use]
    pub fn operation_label(&self) -> String {
        format!("{} {}", self.method, self.path)
    }

    /// Category label, defaulting to "general".
    #[must_use]
    pub fn category(&self) -> &str {
        self.category.as_deref().unwrap_or("general")
    }

    /// Whether the given status satisfies this case's expectation.
    #[must_use]
    pub fn matches_status(&self, status: u16) -> bool {
        self.expect.contains(&status)
    }

    /// Whether the method is one the runner can dispatch.
    #[must_use]
    pub fn has_known_method(&self) -> bool {
        KNOWN_METHODS.contains(&self.method.to_ascii_uppercase().as_str())
    }
}

impl Plan {
    /// Plan label for reports.
    #[must_use]
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or("smoke plan")
    }

    /// Load a plan from file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, PlanError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| PlanError::Io(path.to_path_buf(), e.to_string()))?;
        parse_plan(path, &content)
    }

    /// Create example plan file
    pub fn example() -> &'static str {
        r#"# apismoke plan

name = "backend smoke"

[[cases]]
name = "health check"
category = "infra"
priority = "critical"
method = "GET"
path = "/api/health"
expect = [200]

[[cases]]
name = "register user"
category = "auth"
priority = "high"
method = "POST"
path = "/api/auth/register"
skip_auth = true
expect = [200, 201]

[cases.body]
email = "qa+{{uuid}}@example.com"
password = "Sm0ke!{{alnum}}"

[[cases]]
name = "list tasks"
category = "tasks"
priority = "high"
method = "GET"
path = "/api/tasks"

[[cases]]
name = "get current user"
category = "auth"
method = "GET"
path = "/api/users/{user_id}"
expect = [200]
"#
    }
}

/// Parse a plan from TOML, JSON, or YAML.
///
/// Detection strategy: try extension first (`.toml`/`.json`/`.yaml`/`.yml`),
/// then fall back to content sniffing (leading `{` → JSON, otherwise TOML).
pub fn parse_plan(path: &Path, content: &str) -> Result<Plan, PlanError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "toml" => {
            toml::from_str(content).map_err(|e| PlanError::Parse(format!("Invalid TOML: {e}")))
        }
        "json" => {
            serde_json::from_str(content).map_err(|e| PlanError::Parse(format!("Invalid JSON: {e}")))
        }
        "yaml" | "yml" => {
            serde_yml::from_str(content).map_err(|e| PlanError::Parse(format!("Invalid YAML: {e}")))
        }
        _ => {
            if content.trim_start().starts_with('{') {
                serde_json::from_str(content)
                    .map_err(|e| PlanError::Parse(format!("Invalid JSON: {e}")))
            } else {
                toml::from_str(content).map_err(|e| PlanError::Parse(format!("Invalid TOML: {e}")))
            }
        }
    }
}

/// Extract `{param}` template names from a path.
///
/// Double-brace `{{placeholder}}` spans belong to the value generator and
/// are skipped: "/api/users/{user_id}/notes/{{uuid}}" → ["user_id"].
#[must_use]
pub fn template_params(path: &str) -> Vec<String> {
    let mut params = Vec::new();
    let bytes = path.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'{' {
            if i + 1 < bytes.len() && bytes[i + 1] == b'{' {
                // placeholder: skip past the closing "}}"
                if let Some(end) = path[i + 2..].find("}}") {
                    i += end + 4;
                    continue;
                }
                break;
            }
            if let Some(end) = path[i + 1..].find('}') {
                params.push(path[i + 1..i + 1 + end].to_string());
                i += end + 2;
                continue;
            }
            break;
        }
        i += 1;
    }
    params
}

#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error("Cannot read {0}: {1}")]
    Io(PathBuf, String),
    #[error("Parse error: {0}")]
    Parse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_toml_plan() {
        let toml = r#"
name = "demo"

[[cases]]
name = "health"
method = "GET"
path = "/api/health"

[[cases]]
name = "create task"
category = "tasks"
priority = "critical"
method = "POST"
path = "/api/tasks"
expect = [201]

[cases.body]
title = "from smoke"
"#;
        let plan = parse_plan(Path::new("plan.toml"), toml).unwrap();
        assert_eq!(plan.label(), "demo");
        assert_eq!(plan.cases.len(), 2);

        let health = &plan.cases[0];
        assert_eq!(health.expect, vec![200]);
        assert_eq!(health.category(), "general");
        assert_eq!(health.priority, Priority::Medium);
        assert!(!health.skip_auth);

        let create = &plan.cases[1];
        assert_eq!(create.operation_label(), "POST /api/tasks");
        assert_eq!(create.category(), "tasks");
        assert_eq!(create.priority, Priority::Critical);
        assert!(create.matches_status(201));
        assert!(!create.matches_status(200));
        assert_eq!(create.body.as_ref().unwrap()["title"], "from smoke");
    }

    #[test]
    fn parse_json_plan() {
        let json = r#"{
  "cases": [
    {"name": "health", "method": "GET", "path": "/health", "expect": [200, 204]}
  ]
}"#;
        let plan = parse_plan(Path::new("plan.json"), json).unwrap();
        assert_eq!(plan.label(), "smoke plan");
        assert_eq!(plan.cases[0].expect, vec![200, 204]);
    }

    #[test]
    fn parse_yaml_plan() {
        let yaml = r#"
name: yaml demo
cases:
  - name: health
    method: GET
    path: /health
  - name: login
    method: POST
    path: /api/auth/login
    skip_auth: true
    priority: high
"#;
        let plan = parse_plan(Path::new("plan.yaml"), yaml).unwrap();
        assert_eq!(plan.cases.len(), 2);
        assert!(plan.cases[1].skip_auth);
        assert_eq!(plan.cases[1].priority, Priority::High);
    }

    #[test]
    fn parse_sniff_json_without_extension() {
        let json = r#"{"cases": [{"name": "a", "method": "GET", "path": "/a"}]}"#;
        let plan = parse_plan(Path::new("plan"), json).unwrap();
        assert_eq!(plan.cases.len(), 1);
    }

    #[test]
    fn parse_sniff_toml_without_extension() {
        let toml = "[[cases]]\nname = \"a\"\nmethod = \"GET\"\npath = \"/a\"\n";
        let plan = parse_plan(Path::new("plan.txt"), toml).unwrap();
        assert_eq!(plan.cases.len(), 1);
    }

    #[test]
    fn parse_invalid_toml_error() {
        let err = parse_plan(Path::new("plan.toml"), "[[cases\n");
        assert!(err.is_err());
        assert!(err.unwrap_err().to_string().contains("Invalid TOML"));
    }

    #[test]
    fn example_plan_parses() {
        let plan = parse_plan(Path::new("smoke-plan.toml"), Plan::example()).unwrap();
        assert!(plan.cases.len() >= 3);
        assert!(plan.cases.iter().any(|c| c.skip_auth));
    }

    #[test]
    fn template_params_simple() {
        assert_eq!(template_params("/api/users/{user_id}"), vec!["user_id"]);
        assert_eq!(
            template_params("/api/{org_id}/tasks/{task_id}"),
            vec!["org_id", "task_id"]
        );
        assert!(template_params("/api/tasks").is_empty());
    }

    #[test]
    fn template_params_skips_placeholders() {
        assert_eq!(
            template_params("/api/users/{user_id}/notes/{{uuid}}"),
            vec!["user_id"]
        );
        assert!(template_params("/search?q={{alnum}}").is_empty());
    }

    #[test]
    fn template_params_unterminated_brace() {
        assert!(template_params("/api/{broken").is_empty());
    }

    #[test]
    fn priority_ordering() {
        assert!(Priority::Critical < Priority::High);
        assert!(Priority::High < Priority::Medium);
        assert!(Priority::Medium < Priority::Low);
    }

    #[test]
    fn priority_serialization() {
        let json = serde_json::to_string(&Priority::Critical).unwrap();
        assert_eq!(json, "\"critical\"");
        let parsed: Priority = serde_json::from_str("\"high\"").unwrap();
        assert_eq!(parsed, Priority::High);
    }

    #[test]
    fn known_methods() {
        let case = Case {
            name: "x".into(),
            category: None,
            priority: Priority::default(),
            method: "get".into(),
            path: "/x".into(),
            body: None,
            headers: HashMap::new(),
            expect: default_expect(),
            response_schema: None,
            upload: None,
            upload_field: None,
            skip_auth: false,
        };
        assert!(case.has_known_method());

        let mut bad = case.clone();
        bad.method = "FETCH".into();
        assert!(!bad.has_known_method());
    }
}
