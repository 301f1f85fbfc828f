//! Daily KPI row model.
//!
//! Sources hand over [`RawKpiRow`]s with every field optional; validation
//! turns them into [`KpiRecord`]s or fails with `MalformedRow`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::MonitorError;

/// Untrusted daily aggregate as read from a source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawKpiRow {
    #[serde(alias = "date")]
    pub txn_date: Option<NaiveDate>,
    pub txn_cnt: Option<i64>,
    pub total_value: Option<f64>,
    pub success_cnt: Option<i64>,
    pub failure_cnt: Option<i64>,
    pub success_rate_pct: Option<f64>,
    pub failure_rate_pct: Option<f64>,
    pub success_value: Option<f64>,
}

/// One calendar day of aggregated payment activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiRecord {
    pub date: NaiveDate,
    pub txn_cnt: u64,
    pub total_value: f64,
    pub success_cnt: u64,
    pub failure_cnt: u64,
    pub success_rate_pct: f64,
    pub failure_rate_pct: f64,
    pub success_value: f64,
}

impl KpiRecord {
    /// Validate a raw row. `row` is the row's position in the source, used
    /// only for error reporting.
    pub fn from_raw(row: usize, raw: &RawKpiRow) -> Result<Self, MonitorError> {
        let date = raw.txn_date;
        let date_value = date.ok_or_else(|| MonitorError::malformed(row, None, "missing field txn_date"))?;

        let count = |name: &str, v: Option<i64>| -> Result<u64, MonitorError> {
            let v = v.ok_or_else(|| MonitorError::malformed(row, date, format!("missing field {}", name)))?;
            u64::try_from(v)
                .map_err(|_| MonitorError::malformed(row, date, format!("{} must be non-negative (got {})", name, v)))
        };
        let amount = |name: &str, v: Option<f64>| -> Result<f64, MonitorError> {
            let v = v.ok_or_else(|| MonitorError::malformed(row, date, format!("missing field {}", name)))?;
            if !v.is_finite() || v < 0.0 {
                return Err(MonitorError::malformed(
                    row,
                    date,
                    format!("{} must be a non-negative number (got {})", name, v),
                ));
            }
            Ok(v)
        };
        let pct = |name: &str, v: Option<f64>| -> Result<f64, MonitorError> {
            let v = amount(name, v)?;
            if v > 100.0 {
                return Err(MonitorError::malformed(row, date, format!("{} must be within [0, 100] (got {})", name, v)));
            }
            Ok(v)
        };

        Ok(Self {
            date: date_value,
            txn_cnt: count("txn_cnt", raw.txn_cnt)?,
            total_value: amount("total_value", raw.total_value)?,
            success_cnt: count("success_cnt", raw.success_cnt)?,
            failure_cnt: count("failure_cnt", raw.failure_cnt)?,
            success_rate_pct: pct("success_rate_pct", raw.success_rate_pct)?,
            failure_rate_pct: pct("failure_rate_pct", raw.failure_rate_pct)?,
            success_value: amount("success_value", raw.success_value)?,
        })
    }

    /// Current value of a monitored metric.
    pub fn metric(&self, metric: Metric) -> f64 {
        match metric {
            Metric::SuccessRatePct => self.success_rate_pct,
            Metric::TxnCnt => self.txn_cnt as f64,
            Metric::TotalValue => self.total_value,
        }
    }
}

impl From<&KpiRecord> for RawKpiRow {
    fn from(r: &KpiRecord) -> Self {
        Self {
            txn_date: Some(r.date),
            txn_cnt: i64::try_from(r.txn_cnt).ok(),
            total_value: Some(r.total_value),
            success_cnt: i64::try_from(r.success_cnt).ok(),
            failure_cnt: i64::try_from(r.failure_cnt).ok(),
            success_rate_pct: Some(r.success_rate_pct),
            failure_rate_pct: Some(r.failure_rate_pct),
            success_value: Some(r.success_value),
        }
    }
}

/// Metrics that get a rolling baseline and a z-score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    SuccessRatePct,
    TxnCnt,
    TotalValue,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::SuccessRatePct, Metric::TxnCnt, Metric::TotalValue];

    /// Column prefix used in reports (`{name}_roll_mean`, `{name}_z`, ...).
    pub fn name(self) -> &'static str {
        match self {
            Metric::SuccessRatePct => "success_rate_pct",
            Metric::TxnCnt => "txn_cnt",
            Metric::TotalValue => "total_value",
        }
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
