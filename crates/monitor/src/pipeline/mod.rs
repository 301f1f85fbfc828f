//! Monitoring pipeline orchestrator.
//!
//! Runs the three stages over the full history on every invocation:
//!
//! - **Load**: fetch every daily row from a [`KpiSource`] and validate it.
//! - **Score**: trailing baselines and z-scores per monitored metric.
//! - **Fuse**: rule flags, `alert_any` and severity; keep the flagged days.

pub mod alert;
pub mod baseline;
pub mod metrics;
pub mod scoring;

use std::time::Instant;

use tracing::{debug, info, warn};

use kpiwatch_core::{KpiRecord, MonitorConfig, MonitorError};

use crate::source::{load_records, KpiSource};

use self::alert::{flagged, fuse, AlertedRecord};
use self::metrics::RunMetrics;
use self::scoring::score_series;

/// Result of one monitoring run.
#[derive(Debug)]
pub enum RunOutcome {
    /// The source returned no rows; nothing was scored.
    NoData { source: String },
    Completed(RunReport),
}

impl RunOutcome {
    /// Flagged days, empty for `NoData`.
    pub fn alerts(&self) -> &[AlertedRecord] {
        match self {
            RunOutcome::NoData { .. } => &[],
            RunOutcome::Completed(report) => &report.alerts,
        }
    }
}

/// Output of a run over a non-empty series.
#[derive(Debug)]
pub struct RunReport {
    pub source: String,
    /// Days with at least one fired rule, ascending by date.
    pub alerts: Vec<AlertedRecord>,
    pub metrics: RunMetrics,
}

/// Daily KPI anomaly monitor.
#[derive(Debug, Clone)]
pub struct Monitor {
    config: MonitorConfig,
}

impl Monitor {
    /// Create a monitor; the config is validated here.
    pub fn new(config: MonitorConfig) -> Result<Self, MonitorError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Score and fuse every day of the series, flagged or not.
    pub fn evaluate(&self, records: Vec<KpiRecord>) -> Vec<AlertedRecord> {
        let c = &self.config;
        let scored = score_series(records, c.window, c.min_periods);
        fuse(scored, &c.thresholds, &c.severity)
    }

    /// Days where any rule fired, ascending by date.
    pub fn detect(&self, records: Vec<KpiRecord>) -> Vec<AlertedRecord> {
        flagged(self.evaluate(records))
    }

    /// Load the full history from `source` and detect anomalies.
    pub async fn run(&self, source: &dyn KpiSource) -> Result<RunOutcome, MonitorError> {
        let mut metrics = RunMetrics::start();

        let load_start = Instant::now();
        let records = load_records(source).await?;
        metrics.record_load(records.len(), load_start.elapsed());

        if records.is_empty() {
            warn!(source = source.name(), "source returned no rows");
            return Ok(RunOutcome::NoData { source: source.name().to_string() });
        }

        let first = records.first().map(|r| r.date);
        let last = records.last().map(|r| r.date);
        info!(
            source = source.name(),
            rows = records.len(),
            first = ?first,
            last = ?last,
            "KPI history loaded"
        );

        let score_start = Instant::now();
        let alerts = self.detect(records);
        metrics.record_scoring(&alerts, score_start.elapsed());

        debug!(
            load_ms = metrics.load_ms,
            score_ms = metrics.score_ms,
            "pipeline stages complete"
        );
        info!(
            alerts = metrics.alerts,
            high = metrics.severity_count(alert::Severity::High),
            medium = metrics.severity_count(alert::Severity::Medium),
            low = metrics.severity_count(alert::Severity::Low),
            "anomaly detection complete"
        );

        Ok(RunOutcome::Completed(RunReport {
            source: source.name().to_string(),
            alerts,
            metrics,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemoryKpiSource;

    #[test]
    fn invalid_config_rejected_at_construction() {
        let cfg = MonitorConfig { window: 2, min_periods: 3, ..Default::default() };
        assert!(matches!(Monitor::new(cfg), Err(MonitorError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn empty_source_is_no_data() {
        let monitor = Monitor::new(MonitorConfig::default()).unwrap();
        let source = MemoryKpiSource::new("empty", Vec::new());
        let outcome = monitor.run(&source).await.unwrap();
        assert!(matches!(outcome, RunOutcome::NoData { ref source } if source == "empty"));
        assert!(outcome.alerts().is_empty());
    }

    #[test]
    fn evaluate_empty_series() {
        let monitor = Monitor::new(MonitorConfig::default()).unwrap();
        assert!(monitor.evaluate(Vec::new()).is_empty());
    }
}
