//! Authenticator: login call, token and context extraction
//!
//! Performs the configured login call and extracts the bearer token plus any
//! configured identifiers (user id, organization id) from the response body.
//! Whether a failed login aborts the run is the caller's decision, driven by
//! `auth.required`.

use std::collections::HashMap;

use apismoke_core::config::AuthConfig;

use crate::client::{ApiClient, OutboundRequest};

/// Credentials state for a run.
#[derive(Debug, Clone)]
pub struct Session {
    /// Bearer token, absent for anonymous runs
    pub token: Option<String>,
    /// Identifiers extracted from the login body, merged into path params
    pub context: HashMap<String, String>,
}

impl Session {
    /// A session with no token. Subsequent calls go out unauthenticated.
    #[must_use]
    pub fn anonymous() -> Self {
        Self {
            token: None,
            context: HashMap::new(),
        }
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }
}

/// Perform the login call and build a [`Session`].
///
/// # Errors
///
/// Returns error on transport failure, non-2xx status, unparseable body,
/// or a token pointer that resolves to nothing.
pub fn login(client: &ApiClient, auth: &AuthConfig) -> Result<Session, AuthError> {
    let body = serde_json::json!({
        "email": auth.email,
        "password": auth.password,
    });

    let reply = client
        .send(&OutboundRequest {
            method: "POST",
            path: &auth.login_path,
            headers: &HashMap::new(),
            body: Some(&body),
            upload: None,
            skip_auth: true,
        })
        .map_err(|e| AuthError::Transport(e.to_string()))?;

    if !(200..300).contains(&reply.status) {
        return Err(AuthError::Rejected {
            status: reply.status,
        });
    }

    let json: serde_json::Value = serde_json::from_str(&reply.body_text)
        .map_err(|_| AuthError::MalformedBody)?;

    extract_session(&json, auth)
}

/// Pull the token and configured context identifiers out of the login body.
pub(crate) fn extract_session(
    json: &serde_json::Value,
    auth: &AuthConfig,
) -> Result<Session, AuthError> {
    let token = json
        .pointer(&auth.token_pointer)
        .and_then(|v| v.as_str())
        .map(String::from)
        .ok_or_else(|| AuthError::TokenMissing(auth.token_pointer.clone()))?;

    let mut context = HashMap::new();
    for (name, pointer) in &auth.context_pointers {
        if let Some(value) = json.pointer(pointer) {
            context.insert(name.clone(), value_to_param(value));
        }
    }

    Ok(Session {
        token: Some(token),
        context,
    })
}

fn value_to_param(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("login request failed: {0}")]
    Transport(String),
    #[error("login rejected with status {status}")]
    Rejected { status: u16 },
    #[error("login response body is not JSON")]
    MalformedBody,
    #[error("no token at pointer '{0}' in login response")]
    TokenMissing(String),
}
