//! Persistent report storage under `~/.apismoke/reports/`
//!
//! Every `apismoke run` is saved regardless of `--output` mode, one
//! directory per run: `{host_port}_{timestamp}/` holding a config snapshot
//! (password masked), `summary.json`, and `results.json`.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use apismoke_core::{Config, RunReport};

/// Everything needed to persist a run.
pub struct ReportData<'a> {
    pub config: &'a Config,
    pub report: &'a RunReport,
}

/// Save a run. Returns the report directory path on success.
pub fn save_report(data: &ReportData) -> Result<PathBuf, std::io::Error> {
    let dir = reports_root()?.join(run_dir_name(&data.config.base_url));
    std::fs::create_dir_all(&dir)?;

    write_config_snapshot(&dir, data.config)?;
    write_summary(&dir, data.report)?;

    let results = serde_json::to_string_pretty(&data.report.results).unwrap_or_default();
    std::fs::write(dir.join("results.json"), results)?;

    Ok(dir)
}

/// `config.toml`: the config as used, with the login password masked.
fn write_config_snapshot(dir: &Path, config: &Config) -> Result<(), std::io::Error> {
    let mut snapshot = config.clone();
    if let Some(auth) = &mut snapshot.auth {
        auth.password = "***".to_string();
    }
    let toml =
        toml::to_string_pretty(&snapshot).map_err(|e| std::io::Error::other(e.to_string()))?;
    std::fs::write(dir.join("config.toml"), toml)
}

/// `summary.json`: verdict, stats, and run metadata.
fn write_summary(dir: &Path, report: &RunReport) -> Result<(), std::io::Error> {
    let summary = serde_json::json!({
        "verdict": {
            "status": report.verdict.status.to_string(),
            "grade": report.verdict.grade.to_string(),
            "exit_code": report.verdict.exit_code,
            "reason": report.verdict.reason,
        },
        "stats": {
            "total": report.summary.total,
            "passed": report.summary.passed,
            "failed": report.summary.failed,
            "pass_rate": report.summary.pass_rate(),
        },
        "meta": {
            "timestamp": report.meta.timestamp,
            "duration_secs": report.meta.duration_secs,
            "base_url": report.meta.base_url,
            "plan": report.meta.plan,
        },
    });
    std::fs::write(
        dir.join("summary.json"),
        serde_json::to_string_pretty(&summary).unwrap_or_default(),
    )
}

fn reports_root() -> Result<PathBuf, std::io::Error> {
    let home = std::env::var("HOME")
        .map_err(|_| std::io::Error::new(std::io::ErrorKind::NotFound, "HOME not set"))?;
    Ok(PathBuf::from(home).join(".apismoke").join("reports"))
}

/// `"http://localhost:8080"` → `"localhost_8080_20260205T193000"`
fn run_dir_name(base_url: &str) -> String {
    format!("{}_{}", host_segment(base_url), timestamp_compact())
}

/// Host and port of the base URL, made filesystem safe.
fn host_segment(url: &str) -> String {
    let rest = url.split_once("://").map_or(url, |(_, r)| r);
    rest.split('/')
        .next()
        .filter(|h| !h.is_empty())
        .unwrap_or("unknown")
        .replace(':', "_")
}

/// `"2026-02-05T19:30:00Z"` — ISO 8601 for JSON.
pub fn timestamp_iso() -> String {
    let t = UtcTime::now();
    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}Z",
        t.year, t.month, t.day, t.hour, t.minute, t.second
    )
}

/// `"20260205T193000"` — the same instant, filesystem safe.
fn timestamp_compact() -> String {
    let t = UtcTime::now();
    format!(
        "{:04}{:02}{:02}T{:02}{:02}{:02}",
        t.year, t.month, t.day, t.hour, t.minute, t.second
    )
}

/// Broken-down UTC time, derived from the epoch without a date crate.
struct UtcTime {
    year: i32,
    month: u32,
    day: u32,
    hour: u32,
    minute: u32,
    second: u32,
}

impl UtcTime {
    fn now() -> Self {
        let secs = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        let (year, month, day) = civil_from_days((secs / 86400) as i64);
        let tod = secs % 86400;
        Self {
            year,
            month,
            day,
            hour: (tod / 3600) as u32,
            minute: (tod % 3600 / 60) as u32,
            second: (tod % 60) as u32,
        }
    }
}

/// Howard Hinnant's `civil_from_days` — epoch days → (year, month, day).
///
/// Reference: <https://howardhinnant.github.io/date_algorithms.html#civil_from_days>
fn civil_from_days(days: i64) -> (i32, u32, u32) {
    let z = days + 719_468;
    let era = (if z >= 0 { z } else { z - 146_096 }) / 146_097;
    let doe = (z - era * 146_097) as u32;
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146096) / 365;
    let y = yoe as i64 + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = doy - (153 * mp + 2) / 5 + 1;
    let m = if mp < 10 { mp + 3 } else { mp - 9 };
    let y = if m <= 2 { y + 1 } else { y };
    (y as i32, m, d)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_segment_standard() {
        assert_eq!(host_segment("http://localhost:8080"), "localhost_8080");
        assert_eq!(host_segment("https://api.example.com"), "api.example.com");
        assert_eq!(
            host_segment("https://preview-42.example.dev/v1"),
            "preview-42.example.dev"
        );
    }

    #[test]
    fn host_segment_degenerate_url() {
        assert_eq!(host_segment("https://"), "unknown");
    }

    #[test]
    fn civil_from_days_epoch() {
        assert_eq!(civil_from_days(0), (1970, 1, 1));
    }

    #[test]
    fn civil_from_days_known_date() {
        // 2026-02-05 = day 20489 from epoch
        assert_eq!(civil_from_days(20_489), (2026, 2, 5));
    }

    #[test]
    fn dir_name_format() {
        let name = run_dir_name("http://localhost:8080");
        assert!(name.starts_with("localhost_8080_"));
    }
}
