use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::alert::{AlertedRecord, Severity};

/// Per-run counters and stage timings.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunMetrics {
    /// When the run started.
    pub started_at: Option<DateTime<Utc>>,
    /// Rows returned by the source.
    pub rows_loaded: usize,
    /// Days flagged by at least one rule.
    pub alerts: usize,
    /// Flagged days per severity tier.
    pub by_severity: BTreeMap<Severity, usize>,
    /// Source fetch and validation, in milliseconds.
    pub load_ms: u64,
    /// Baseline, scoring and fusion, in milliseconds.
    pub score_ms: u64,
}

impl RunMetrics {
    pub fn start() -> Self {
        Self {
            started_at: Some(Utc::now()),
            ..Default::default()
        }
    }

    pub fn record_load(&mut self, rows: usize, elapsed: Duration) {
        self.rows_loaded = rows;
        self.load_ms = elapsed.as_millis() as u64;
    }

    pub fn record_scoring(&mut self, alerts: &[AlertedRecord], elapsed: Duration) {
        self.score_ms = elapsed.as_millis() as u64;
        self.alerts = alerts.len();
        self.by_severity.clear();
        for alert in alerts {
            *self.by_severity.entry(alert.severity).or_default() += 1;
        }
    }

    pub fn severity_count(&self, severity: Severity) -> usize {
        self.by_severity.get(&severity).copied().unwrap_or(0)
    }
}
