use serde::Serialize;
use tracing::debug;

use kpiwatch_core::{KpiRecord, Metric};

use super::baseline::rolling_stats;

/// Rolling baseline and z-score of one metric on one day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MetricScore {
    pub roll_mean: Option<f64>,
    pub roll_std: Option<f64>,
    pub z: Option<f64>,
}

/// A day's KPIs with their rolling baselines.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredRecord {
    pub record: KpiRecord,
    pub success_rate_pct: MetricScore,
    pub txn_cnt: MetricScore,
    pub total_value: MetricScore,
    /// Success rate minus its rolling mean, in percentage points.
    pub success_rate_drop_pp: Option<f64>,
}

impl ScoredRecord {
    pub fn score(&self, metric: Metric) -> &MetricScore {
        match metric {
            Metric::SuccessRatePct => &self.success_rate_pct,
            Metric::TxnCnt => &self.txn_cnt,
            Metric::TotalValue => &self.total_value,
        }
    }

    fn score_mut(&mut self, metric: Metric) -> &mut MetricScore {
        match metric {
            Metric::SuccessRatePct => &mut self.success_rate_pct,
            Metric::TxnCnt => &mut self.txn_cnt,
            Metric::TotalValue => &mut self.total_value,
        }
    }
}

/// Score every day of the series against its trailing window.
///
/// Records are sorted by date first; rolling windows are positional over
/// that order.
pub fn score_series(mut records: Vec<KpiRecord>, window: usize, min_periods: usize) -> Vec<ScoredRecord> {
    records.sort_by_key(|r| r.date);

    let mut scored: Vec<ScoredRecord> = records
        .into_iter()
        .map(|record| ScoredRecord {
            record,
            success_rate_pct: MetricScore::default(),
            txn_cnt: MetricScore::default(),
            total_value: MetricScore::default(),
            success_rate_drop_pp: None,
        })
        .collect();

    for metric in Metric::ALL {
        let values: Vec<f64> = scored.iter().map(|s| s.record.metric(metric)).collect();
        let stats = rolling_stats(&values, window, min_periods);
        let mut defined = 0usize;

        for ((row, stats), value) in scored.iter_mut().zip(stats).zip(values) {
            let z = stats.z_score(value);
            if z.is_some() {
                defined += 1;
            }
            *row.score_mut(metric) = MetricScore {
                roll_mean: stats.mean,
                roll_std: stats.std,
                z,
            };
        }

        debug!(metric = %metric, rows = scored.len(), z_defined = defined, "metric scored");
    }

    for row in &mut scored {
        row.success_rate_drop_pp = row
            .success_rate_pct
            .roll_mean
            .map(|mean| row.record.success_rate_pct - mean);
    }

    scored
}
