//! Concurrent latency probe
//!
//! Fires a handful of GETs at each configured path from a small worker pool
//! (at most 5 threads) and reports min/avg/max round-trip times. Purely
//! observational: results never affect a verdict. Work is partitioned
//! statically across workers; results come back over an mpsc channel.

use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use serde::Serialize;

use apismoke_core::config::{Config, ProbeConfig};

/// Latency summary for one probed path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeStats {
    pub path: String,
    /// Requests attempted
    pub rounds: u32,
    /// Requests that got any response
    pub ok: u32,
    pub min_ms: u64,
    pub avg_ms: u64,
    pub max_ms: u64,
}

/// Probe every configured path concurrently.
///
/// # Errors
///
/// Returns error if the HTTP client cannot be built. Individual request
/// failures just reduce the `ok` count.
pub fn run_probe(config: &Config, probe: &ProbeConfig) -> Result<Vec<ProbeStats>, ProbeError> {
    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
        .map_err(|e| ProbeError::Http(e.to_string()))?;

    let base_url = config.base_url.trim_end_matches('/');
    let workers = probe.effective_workers();

    // One job per (path, round); round-robin partition, no shared queue
    let jobs: Vec<usize> = (0..probe.rounds)
        .flat_map(|_| 0..probe.paths.len())
        .collect();
    let mut per_worker: Vec<Vec<usize>> = vec![Vec::new(); workers];
    for (n, path_idx) in jobs.into_iter().enumerate() {
        per_worker[n % workers].push(path_idx);
    }

    let mut samples: Vec<Vec<Option<u64>>> = vec![Vec::new(); probe.paths.len()];

    thread::scope(|s| {
        let (tx, rx) = mpsc::channel::<(usize, Option<u64>)>();

        for worker_jobs in per_worker {
            let tx = tx.clone();
            let client = &client;
            let paths = &probe.paths;
            s.spawn(move || {
                for path_idx in worker_jobs {
                    let url = format!("{base_url}{}", paths[path_idx]);
                    let mut request = client.get(&url);
                    for (k, v) in &config.headers {
                        request = request.header(k, v);
                    }
                    let start = Instant::now();
                    let sample = request
                        .send()
                        .ok()
                        .map(|_| start.elapsed().as_millis() as u64);
                    let _ = tx.send((path_idx, sample));
                }
            });
        }
        drop(tx);

        for (path_idx, sample) in rx {
            samples[path_idx].push(sample);
        }
    });

    Ok(probe
        .paths
        .iter()
        .zip(&samples)
        .map(|(path, path_samples)| aggregate(path, path_samples))
        .collect())
}

/// Fold one path's samples into min/avg/max.
fn aggregate(path: &str, samples: &[Option<u64>]) -> ProbeStats {
    let latencies: Vec<u64> = samples.iter().flatten().copied().collect();
    let ok = latencies.len() as u32;

    let (min_ms, avg_ms, max_ms) = if latencies.is_empty() {
        (0, 0, 0)
    } else {
        let sum: u64 = latencies.iter().sum();
        (
            *latencies.iter().min().unwrap_or(&0),
            sum / latencies.len() as u64,
            *latencies.iter().max().unwrap_or(&0),
        )
    };

    ProbeStats {
        path: path.to_string(),
        rounds: samples.len() as u32,
        ok,
        min_ms,
        avg_ms,
        max_ms,
    }
}

/// Format probe results as a terminal table.
#[must_use]
pub fn render_table(stats: &[ProbeStats]) -> String {
    let mut lines = vec!["Latency probe:".to_string()];
    for s in stats {
        if s.ok == 0 {
            lines.push(format!("  {}: 0/{} ok", s.path, s.rounds));
        } else {
            lines.push(format!(
                "  {}: {}/{} ok, min {} ms, avg {} ms, max {} ms",
                s.path, s.ok, s.rounds, s.min_ms, s.avg_ms, s.max_ms
            ));
        }
    }
    lines.join("\n")
}

#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("HTTP error: {0}")]
    Http(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregate_mixed_samples() {
        let stats = aggregate(
            "/api/health",
            &[Some(10), Some(20), None, Some(30), Some(20)],
        );
        assert_eq!(stats.rounds, 5);
        assert_eq!(stats.ok, 4);
        assert_eq!(stats.min_ms, 10);
        assert_eq!(stats.avg_ms, 20);
        assert_eq!(stats.max_ms, 30);
    }

    #[test]
    fn aggregate_all_failed() {
        let stats = aggregate("/api/down", &[None, None]);
        assert_eq!(stats.rounds, 2);
        assert_eq!(stats.ok, 0);
        assert_eq!(stats.min_ms, 0);
        assert_eq!(stats.max_ms, 0);
    }

    #[test]
    fn aggregate_empty() {
        let stats = aggregate("/api/none", &[]);
        assert_eq!(stats.rounds, 0);
        assert_eq!(stats.ok, 0);
    }

    #[test]
    fn render_table_rows() {
        let stats = vec![
            aggregate("/api/health", &[Some(10), Some(12)]),
            aggregate("/api/down", &[None]),
        ];
        let table = render_table(&stats);
        assert!(table.contains("Latency probe:"));
        assert!(table.contains("/api/health: 2/2 ok, min 10 ms, avg 11 ms, max 12 ms"));
        assert!(table.contains("/api/down: 0/1 ok"));
    }
}
