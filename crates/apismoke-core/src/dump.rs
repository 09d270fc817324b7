//! Full exchange dump to JSONL files
//!
//! Writes every exchange (not just failures) to per-category JSONL files
//! for post-hoc analysis. Bearer tokens and API keys are masked; smoke
//! configs carry live credentials and dumps must not leak them.
//!
//! ```text
//! .apismoke/dumps/
//! ├── auth.jsonl
//! ├── tasks.jsonl
//! └── index.json
//! ```

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::outcome::Exchange;

/// Header names whose values never reach a dump file.
const SENSITIVE_HEADERS: &[&str] = &[
    "authorization",
    "x-api-key",
    "x-auth-token",
    "cookie",
    "set-cookie",
    "proxy-authorization",
];

const MASK: &str = "***";

/// Summary of a dump operation, written as `index.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DumpIndex {
    /// Total exchanges dumped
    pub total: u64,
    /// Per-category file listing
    pub categories: Vec<DumpCategoryEntry>,
    /// Directory where files were written
    pub dump_dir: PathBuf,
}

/// An entry in the dump index for one category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DumpCategoryEntry {
    /// Category label, e.g. "tasks"
    pub category: String,
    /// Filename within the dump directory
    pub file: String,
    /// Number of exchanges in this file
    pub count: u64,
}

/// Write all exchanges to per-category JSONL files plus an `index.json`.
///
/// # Errors
///
/// Returns error when the dump directory cannot be created or a file
/// cannot be written.
pub fn write_dump(
    exchanges: &[Exchange],
    dump_dir: &Path,
    mask_headers: bool,
) -> Result<DumpIndex, DumpError> {
    std::fs::create_dir_all(dump_dir).map_err(|e| DumpError::io(dump_dir, &e))?;

    // BTreeMap keeps the category files in a deterministic order
    let mut by_category: BTreeMap<&str, Vec<&Exchange>> = BTreeMap::new();
    for exchange in exchanges {
        by_category
            .entry(&exchange.category)
            .or_default()
            .push(exchange);
    }

    let mut index = DumpIndex {
        total: exchanges.len() as u64,
        categories: Vec::with_capacity(by_category.len()),
        dump_dir: dump_dir.to_path_buf(),
    };

    for (category, group) in by_category {
        let file = sanitize_filename(category);
        write_category_file(&dump_dir.join(&file), &group, mask_headers)?;
        index.categories.push(DumpCategoryEntry {
            category: category.to_string(),
            file,
            count: group.len() as u64,
        });
    }

    let index_path = dump_dir.join("index.json");
    let json = serde_json::to_string_pretty(&index).map_err(DumpError::serialize)?;
    std::fs::write(&index_path, json).map_err(|e| DumpError::io(&index_path, &e))?;

    Ok(index)
}

/// One JSONL file: one exchange per line.
fn write_category_file(
    path: &Path,
    group: &[&Exchange],
    mask_headers: bool,
) -> Result<(), DumpError> {
    let file = std::fs::File::create(path).map_err(|e| DumpError::io(path, &e))?;
    let mut out = std::io::BufWriter::new(file);

    for exchange in group {
        let line = if mask_headers {
            serde_json::to_string(&mask_exchange(exchange))
        } else {
            serde_json::to_string(exchange)
        }
        .map_err(DumpError::serialize)?;
        writeln!(out, "{line}").map_err(|e| DumpError::io(path, &e))?;
    }

    out.flush().map_err(|e| DumpError::io(path, &e))
}

/// Maximum characters kept from the category label in the filename.
const MAX_FILENAME_LEN: usize = 200;

/// Category labels become filenames; anything outside a safe set is `_`.
/// "time tracking" → "time_tracking.jsonl"
fn sanitize_filename(category: &str) -> String {
    let safe: String = category
        .chars()
        .take(MAX_FILENAME_LEN)
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{safe}.jsonl")
}

/// Copy of the exchange with sensitive request headers redacted.
fn mask_exchange(exchange: &Exchange) -> Exchange {
    let mut masked = exchange.clone();
    for (name, value) in &mut masked.request.headers {
        if SENSITIVE_HEADERS.iter().any(|h| name.eq_ignore_ascii_case(h)) {
            *value = MASK.to_string();
        }
    }
    masked
}

#[derive(Debug, thiserror::Error)]
pub enum DumpError {
    #[error("dump write failed at {path}: {reason}")]
    Io { path: PathBuf, reason: String },
    #[error("dump serialization failed: {0}")]
    Serialize(String),
}

impl DumpError {
    fn io(path: &Path, e: &std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            reason: e.to_string(),
        }
    }

    fn serialize(e: serde_json::Error) -> Self {
        Self::Serialize(e.to_string())
    }
}
