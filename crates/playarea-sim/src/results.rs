//! Results collection and output for play area simulations.
//!
//! Captures per-run metadata alongside the kernel's outcome, and summarizes
//! batches of runs:
//! - Requests processed before a winner emerged
//! - Evictions and reinstatements
//! - Wins per player name

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use playarea_kernel::SimulationOutcome;

/// Configuration a single run was executed with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub trial: usize,
    pub players: usize,
    pub grid_size: usize,
    pub queue_capacity: usize,
    pub move_delay_ms: u64,
    pub reinstatement_delay_ms: u64,
    /// Seed actually used, whether configured or drawn
    pub seed: u64,
}

/// Results from a single run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub config: RunConfig,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    /// Wall-clock duration of the run
    pub elapsed_ms: u64,
    pub outcome: SimulationOutcome,
}

/// Aggregate statistics over a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSummary {
    pub trials: usize,
    pub avg_processed: f64,
    /// Standard error of `avg_processed`
    pub avg_processed_se: f64,
    pub min_processed: u64,
    pub max_processed: u64,
    pub avg_evictions: f64,
    pub avg_reinstatements: f64,
    pub avg_elapsed_ms: f64,
    /// Wins keyed by player name
    pub wins: BTreeMap<String, usize>,
}

/// Results from a batch of runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchResults {
    pub runs: Vec<RunResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<BatchSummary>,
}

impl BatchResults {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, result: RunResult) {
        self.runs.push(result);
    }

    pub fn compute_summary(&mut self) {
        if self.runs.is_empty() {
            self.summary = None;
            return;
        }

        let trials = self.runs.len();
        let n = trials as f64;
        let processed: Vec<f64> = self
            .runs
            .iter()
            .map(|r| r.outcome.stats.processed as f64)
            .collect();
        let avg_processed = processed.iter().sum::<f64>() / n;

        // Standard error: SE = std_dev / sqrt(n)
        let avg_processed_se = if trials > 1 {
            let variance = processed
                .iter()
                .map(|p| (p - avg_processed).powi(2))
                .sum::<f64>()
                / (n - 1.0);
            variance.sqrt() / n.sqrt()
        } else {
            0.0
        };

        let stats = self.runs.iter().map(|r| &r.outcome.stats);
        let min_processed = stats.clone().map(|s| s.processed).min().unwrap_or(0);
        let max_processed = stats.clone().map(|s| s.processed).max().unwrap_or(0);
        let avg_evictions = stats.clone().map(|s| s.evictions as f64).sum::<f64>() / n;
        let avg_reinstatements = stats.map(|s| s.reinstatements as f64).sum::<f64>() / n;
        let avg_elapsed_ms = self.runs.iter().map(|r| r.elapsed_ms as f64).sum::<f64>() / n;

        let mut wins = BTreeMap::new();
        for run in &self.runs {
            *wins.entry(run.outcome.winner.name.clone()).or_insert(0) += 1;
        }

        self.summary = Some(BatchSummary {
            trials,
            avg_processed,
            avg_processed_se,
            min_processed,
            max_processed,
            avg_evictions,
            avg_reinstatements,
            avg_elapsed_ms,
            wins,
        });
    }

    /// Save results to a JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load results from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let results = serde_json::from_str(&json)?;
        Ok(results)
    }
}

/// Format a duration in milliseconds for display.
pub fn format_duration(ms: u64) -> String {
    if ms < 1000 {
        format!("{}ms", ms)
    } else if ms < 60_000 {
        format!("{:.1}s", ms as f64 / 1000.0)
    } else {
        format!("{:.1}m", ms as f64 / 60_000.0)
    }
}

#[cfg(test)]
mod tests {
    use playarea_kernel::{CoordinatorStats, PlayerId, PlayerStatus, PlayerSummary};

    use super::*;

    fn run(trial: usize, winner: &str, processed: u64, evictions: u64) -> RunResult {
        let summary = PlayerSummary {
            id: PlayerId(0),
            name: winner.to_string(),
            status: PlayerStatus::Active,
            position: None,
            flag_count: 0,
            eviction_count: 0,
        };
        RunResult {
            config: RunConfig {
                trial,
                players: 2,
                grid_size: 4,
                queue_capacity: 100,
                move_delay_ms: 1000,
                reinstatement_delay_ms: 10_000,
                seed: trial as u64,
            },
            started_at: Utc::now(),
            ended_at: Utc::now(),
            elapsed_ms: 100 * (trial as u64 + 1),
            outcome: SimulationOutcome {
                winner: summary.clone(),
                stats: CoordinatorStats {
                    processed,
                    evictions,
                    ..Default::default()
                },
                players: vec![summary],
            },
        }
    }

    #[test]
    fn test_batch_summary() {
        let mut results = BatchResults::new();
        results.add(run(0, "Jhon0", 10, 1));
        results.add(run(1, "Jhon1", 20, 3));
        results.add(run(2, "Jhon0", 30, 2));
        results.compute_summary();

        let summary = results.summary.as_ref().unwrap();
        assert_eq!(summary.trials, 3);
        assert!((summary.avg_processed - 20.0).abs() < 1e-9);
        assert!(summary.avg_processed_se > 0.0);
        assert_eq!(summary.min_processed, 10);
        assert_eq!(summary.max_processed, 30);
        assert!((summary.avg_evictions - 2.0).abs() < 1e-9);
        assert!((summary.avg_elapsed_ms - 200.0).abs() < 1e-9);
        assert_eq!(summary.wins.get("Jhon0"), Some(&2));
        assert_eq!(summary.wins.get("Jhon1"), Some(&1));
    }

    #[test]
    fn test_empty_batch_has_no_summary() {
        let mut results = BatchResults::new();
        results.compute_summary();
        assert!(results.summary.is_none());
    }

    #[test]
    fn test_save_and_load() {
        let mut results = BatchResults::new();
        results.add(run(0, "Jhon3", 12, 1));
        results.compute_summary();

        let path = std::env::temp_dir().join(format!("playarea-results-{}.json", std::process::id()));
        results.save(&path).unwrap();
        let loaded = BatchResults::load(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(loaded.runs.len(), 1);
        assert_eq!(loaded.runs[0].outcome.winner.name, "Jhon3");
        assert_eq!(loaded.summary.unwrap().wins.get("Jhon3"), Some(&1));
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(250), "250ms");
        assert_eq!(format_duration(1500), "1.5s");
        assert_eq!(format_duration(90_000), "1.5m");
    }
}
