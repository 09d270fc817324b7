//! Request runner: one blocking HTTP session for the whole run
//!
//! Attaches the bearer token, dispatches the method, and captures status,
//! body, and round-trip time. No retries, no backoff; a transport error is
//! returned to the caller, who records it as a failed case.

use std::collections::HashMap;
use std::path::Path;
use std::time::{Duration, Instant};

use apismoke_core::outcome::{RequestSnapshot, ResponseSnapshot};

/// Response bodies stored in snapshots are truncated to this many bytes.
const MAX_BODY_BYTES: usize = 4096;

/// One outbound request, fully resolved.
pub struct OutboundRequest<'a> {
    pub method: &'a str,
    /// Resolved path (templates already filled)
    pub path: &'a str,
    /// Per-case extra headers
    pub headers: &'a HashMap<String, String>,
    /// JSON body
    pub body: Option<&'a serde_json::Value>,
    /// File upload: (path, multipart field name)
    pub upload: Option<(&'a Path, &'a str)>,
    /// Send without the bearer token
    pub skip_auth: bool,
}

/// What came back from one call.
#[derive(Debug)]
pub struct Reply {
    pub status: u16,
    /// Full response body text (snapshots truncate it)
    pub body_text: String,
    pub latency_ms: u64,
    /// Request as sent, for dumps
    pub request: RequestSnapshot,
}

impl Reply {
    /// Response snapshot with the body truncated for storage.
    #[must_use]
    pub fn response_snapshot(&self) -> ResponseSnapshot {
        ResponseSnapshot {
            status_code: self.status,
            body: truncate_body(&self.body_text),
            latency_ms: self.latency_ms,
        }
    }
}

/// The shared HTTP session: one client, one base URL, one optional token.
pub struct ApiClient {
    client: reqwest::blocking::Client,
    base_url: String,
    default_headers: HashMap<String, String>,
    token: Option<String>,
}

impl ApiClient {
    /// Build the client with the configured timeout.
    ///
    /// # Errors
    ///
    /// Returns error if the underlying client cannot be constructed.
    pub fn new(
        base_url: &str,
        default_headers: HashMap<String, String>,
        timeout_secs: u64,
    ) -> Result<Self, ClientError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ClientError::Build(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            default_headers,
            token: None,
        })
    }

    /// Attach (or clear) the bearer token for subsequent calls.
    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Dispatch one request and capture the reply.
    ///
    /// # Errors
    ///
    /// Returns error on unknown method, unreadable upload file, or any
    /// transport failure (connect, timeout, TLS).
    pub fn send(&self, out: &OutboundRequest) -> Result<Reply, ClientError> {
        let method = reqwest::Method::from_bytes(out.method.to_ascii_uppercase().as_bytes())
            .map_err(|_| ClientError::InvalidMethod(out.method.to_string()))?;

        let url = format!("{}{}", self.base_url, out.path);
        let headers = self.merged_headers(out.headers, out.skip_auth);

        let mut req = self.client.request(method, &url);
        for (k, v) in &headers {
            // Skip header values reqwest would reject (control characters etc.)
            if reqwest::header::HeaderValue::from_str(v).is_ok() {
                req = req.header(k, v);
            }
        }

        let mut body_stored = None;
        if let Some((file, field)) = out.upload {
            let mut form = reqwest::blocking::multipart::Form::new();
            // String fields of the JSON body ride along as text parts
            if let Some(serde_json::Value::Object(obj)) = out.body {
                for (k, v) in obj {
                    if let serde_json::Value::String(s) = v {
                        form = form.text(k.clone(), s.clone());
                    }
                }
            }
            form = form
                .file(field.to_string(), file)
                .map_err(|e| ClientError::Upload(format!("{}: {e}", file.display())))?;
            body_stored = Some(format!("<multipart upload: {}>", file.display()));
            req = req.multipart(form);
        } else if let Some(body) = out.body {
            body_stored = serde_json::to_string(body).ok();
            req = req.header("Content-Type", "application/json");
            req = req.json(body);
        }

        let request = RequestSnapshot {
            method: out.method.to_ascii_uppercase(),
            url: url.clone(),
            headers,
            body: body_stored,
        };

        let start = Instant::now();
        let resp = req.send().map_err(|e| ClientError::Transport(e.to_string()))?;
        let status = resp.status().as_u16();
        let body_text = resp.text().unwrap_or_default();
        let latency_ms = start.elapsed().as_millis() as u64;

        Ok(Reply {
            status,
            body_text,
            latency_ms,
            request,
        })
    }

    /// Merge header layers: defaults, then bearer token, then per-case.
    fn merged_headers(
        &self,
        case_headers: &HashMap<String, String>,
        skip_auth: bool,
    ) -> HashMap<String, String> {
        let mut headers = self.default_headers.clone();
        if !skip_auth {
            if let Some(token) = &self.token {
                headers.insert("Authorization".to_string(), format!("Bearer {token}"));
            }
        }
        for (k, v) in case_headers {
            headers.insert(k.clone(), v.clone());
        }
        headers
    }
}

/// Truncate a body for storage, walking back to a char boundary.
fn truncate_body(body_text: &str) -> Option<String> {
    if body_text.is_empty() {
        None
    } else if body_text.len() <= MAX_BODY_BYTES {
        Some(body_text.to_string())
    } else {
        let mut end = MAX_BODY_BYTES;
        while end > 0 && !body_text.is_char_boundary(end) {
            end -= 1;
        }
        Some(format!(
            "{}…({} bytes total)",
            &body_text[..end],
            body_text.len()
        ))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP client error: {0}")]
    Build(String),
    #[error("invalid HTTP method '{0}'")]
    InvalidMethod(String),
    #[error("upload error: {0}")]
    Upload(String),
    #[error("{0}")]
    Transport(String),
}
