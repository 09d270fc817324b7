//! Run configuration: target environment, credentials, probe settings

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Environment variable that overrides `base_url` when set.
pub const BASE_URL_ENV: &str = "APISMOKE_BASE_URL";

/// Hard ceiling on latency probe workers.
pub const MAX_PROBE_WORKERS: usize = 5;

/// Run configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Smoke plan path (local file)
    #[serde(default = "default_plan")]
    pub plan: PathBuf,

    /// Base URL of the environment under test
    pub base_url: String,

    /// Login credentials and token extraction
    #[serde(default)]
    pub auth: Option<AuthConfig>,

    /// HTTP headers attached to every request
    #[serde(default)]
    pub headers: HashMap<String, String>,

    /// Path parameters (entity IDs, etc.) for `{name}` templates
    #[serde(default)]
    pub path_params: HashMap<String, String>,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Response time limit in seconds (optional, disabled by default)
    #[serde(default)]
    pub response_time_limit: Option<f64>,

    /// Write the JSON report here after a run
    #[serde(default)]
    pub report_path: Option<PathBuf>,

    /// Dump all exchanges to JSONL files
    #[serde(default)]
    pub dump: bool,

    /// Directory for dump files (default: ".apismoke/dumps")
    #[serde(default)]
    pub dump_dir: Option<PathBuf>,

    /// Latency probe settings
    #[serde(default)]
    pub probe: Option<ProbeConfig>,
}

/// Login call settings: credentials, token and context extraction.
///
/// ```toml
/// [auth]
/// login_path = "/api/auth/login"
/// email = "qa@example.com"
/// password = "secret"
/// token_pointer = "/access_token"
/// required = true
///
/// [auth.context_pointers]
/// user_id = "/user/id"
/// org_id = "/user/organization_id"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Login endpoint path
    #[serde(default = "default_login_path")]
    pub login_path: String,

    /// Login email
    pub email: String,

    /// Login password
    pub password: String,

    /// JSON pointer to the bearer token in the login response
    #[serde(default = "default_token_pointer")]
    pub token_pointer: String,

    /// Name → JSON pointer; extracted values join the path-parameter context
    #[serde(default)]
    pub context_pointers: HashMap<String, String>,

    /// Abort the run when login fails (otherwise continue without a token)
    #[serde(default = "default_true")]
    pub required: bool,
}

/// Latency probe settings: concurrent GETs against a handful of paths.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// GET targets to probe
    pub paths: Vec<String>,

    /// Worker threads (clamped to [`MAX_PROBE_WORKERS`])
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Requests per path
    #[serde(default = "default_rounds")]
    pub rounds: u32,
}

impl ProbeConfig {
    /// Worker count after clamping to the 1..=5 range.
    #[must_use]
    pub fn effective_workers(&self) -> usize {
        self.workers.clamp(1, MAX_PROBE_WORKERS)
    }
}

fn default_plan() -> PathBuf {
    PathBuf::from("smoke-plan.toml")
}

fn default_timeout() -> u64 {
    10
}

fn default_login_path() -> String {
    "/api/auth/login".to_string()
}

fn default_token_pointer() -> String {
    "/access_token".to_string()
}

fn default_true() -> bool {
    true
}

fn default_workers() -> usize {
    4
}

fn default_rounds() -> u32 {
    5
}

impl Default for Config {
    fn default() -> Self {
        Self {
            plan: default_plan(),
            base_url: "http://localhost:8080".to_string(),
            auth: None,
            headers: HashMap::new(),
            path_params: HashMap::new(),
            timeout_secs: default_timeout(),
            response_time_limit: None,
            report_path: None,
            dump: false,
            dump_dir: None,
            probe: None,
        }
    }
}

impl Config {
    /// Load config from file
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or parsed
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e.to_string()))?;

        let mut config: Self = if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?
        } else {
            toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default location (.apismoke.toml)
    pub fn load_default() -> Result<Self, ConfigError> {
        let candidates = [".apismoke.toml", ".apismoke.json", "apismoke.toml"];

        for name in candidates {
            let path = Path::new(name);
            if path.exists() {
                return Self::load(path);
            }
        }

        // No config file, return default (env override still applies)
        let mut config = Self::default();
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply process-environment overrides (`APISMOKE_BASE_URL`).
    pub fn apply_env_overrides(&mut self) {
        self.override_base_url(std::env::var(BASE_URL_ENV).ok());
    }

    fn override_base_url(&mut self, value: Option<String>) {
        if let Some(url) = value {
            if !url.trim().is_empty() {
                self.base_url = url.trim().to_string();
            }
        }
    }

    /// Create example config file
    pub fn example() -> &'static str {
        r#"# apismoke configuration

# Environment under test (APISMOKE_BASE_URL overrides this)
base_url = "http://localhost:8080"

# Smoke plan (local file path; .toml, .json, or .yaml)
plan = "smoke-plan.toml"

# Per-request timeout in seconds
timeout_secs = 10

# Fail any case slower than this (seconds, disabled by default)
# response_time_limit = 2.0

# Extra headers on every request
# [headers]
# X-API-Key = "your-api-key"

# Static path parameters for {name} templates
[path_params]
# project_id = "1"

# Login call; token is attached as "Authorization: Bearer <token>"
[auth]
login_path = "/api/auth/login"
email = "qa@example.com"
password = "change-this-password"
token_pointer = "/access_token"
# Abort the run when login fails (set false to continue without a token)
required = true

# Extract identifiers from the login body into the path-parameter context
# [auth.context_pointers]
# user_id = "/user/id"
# org_id = "/user/organization_id"

# Concurrent latency probe (`apismoke probe`)
# [probe]
# paths = ["/api/health", "/api/tasks"]
# workers = 4
# rounds = 5

# Dump all exchanges to JSONL files (default: false)
# dump = true
# dump_dir = ".apismoke/dumps"

# Write the JSON report here after every run
# report_path = "smoke-report.json"
"#
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Cannot read {0}: {1}")]
    Io(PathBuf, String),
    #[error("Parse error: {0}")]
    Parse(String),
}
