//! Dynamic value generation for plan templates
//!
//! Two template layers, expanded in this order:
//! 1. `{{placeholder}}` — generated values (unique emails, UUIDs, timestamps)
//!    so repeat runs don't collide on server-side uniqueness constraints.
//! 2. `{param}` — filled from the path-parameter context (config plus
//!    auth-extracted identifiers). Unknown `{param}` templates are left
//!    intact for the server to reject.

use std::collections::HashMap;
use std::time::SystemTime;

use rand::Rng;

/// Expand every `{{placeholder}}` occurrence in a string.
///
/// Supported: `{{uuid}}`, `{{email}}`, `{{timestamp}}`, `{{alnum}}`.
/// Unknown placeholders are left intact.
pub fn expand_str(input: &str, rng: &mut impl Rng) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("{{") {
        let Some(end) = rest[start + 2..].find("}}") else {
            break;
        };
        let token = &rest[start + 2..start + 2 + end];
        out.push_str(&rest[..start]);
        match token {
            "uuid" => out.push_str(&gen_uuid(rng)),
            "email" => out.push_str(&gen_email(rng)),
            "timestamp" => out.push_str(&epoch_secs().to_string()),
            "alnum" => out.push_str(&random_alnum(rng, 8)),
            _ => {
                // Unknown placeholder: keep verbatim
                out.push_str(&rest[start..start + 4 + end]);
            }
        }
        rest = &rest[start + 4 + end..];
    }
    out.push_str(rest);
    out
}

/// Expand placeholders in every string leaf of a JSON value.
pub fn expand_value(value: &serde_json::Value, rng: &mut impl Rng) -> serde_json::Value {
    match value {
        serde_json::Value::String(s) => serde_json::Value::String(expand_str(s, rng)),
        serde_json::Value::Array(items) => {
            serde_json::Value::Array(items.iter().map(|v| expand_value(v, rng)).collect())
        }
        serde_json::Value::Object(obj) => serde_json::Value::Object(
            obj.iter()
                .map(|(k, v)| (k.clone(), expand_value(v, rng)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Fill `{param}` templates from the parameter context.
pub fn fill_path(path: &str, params: &HashMap<String, String>) -> String {
    let mut resolved = path.to_string();
    for (name, value) in params {
        resolved = resolved.replace(&format!("{{{name}}}"), value);
    }
    resolved
}

/// UUID v4 layout from random bits.
fn gen_uuid(rng: &mut impl Rng) -> String {
    format!(
        "{:08x}-{:04x}-4{:03x}-{:04x}-{:012x}",
        rng.r#gen::<u32>(),
        rng.r#gen::<u16>(),
        rng.r#gen::<u16>() & 0x0FFF,
        (rng.r#gen::<u16>() & 0x3FFF) | 0x8000,
        rng.r#gen::<u64>() & 0xFFFF_FFFF_FFFF,
    )
}

fn gen_email(rng: &mut impl Rng) -> String {
    format!("user-{}@example.com", random_alnum(rng, 10))
}

fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

fn random_alnum(rng: &mut impl Rng, len: usize) -> String {
    const CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
    (0..len)
        .map(|_| CHARS[rng.gen_range(0..CHARS.len())] as char)
        .collect()
}
