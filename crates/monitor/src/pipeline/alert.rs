//! Rule evaluation, alert fusion and severity bucketing.
//!
//! Three independent rules run per day:
//! - success-rate drop: `success_rate_pct_z <= z` or `success_rate_drop_pp <= pp`
//! - volume anomaly: `|txn_cnt_z| >= z`
//! - value anomaly: `|total_value_z| >= z`
//!
//! A rule whose input is null never fires.

use serde::{Deserialize, Serialize};

use kpiwatch_core::{AlertThresholds, SeverityScale};

use super::scoring::ScoredRecord;

/// Ordinal alert severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    None,
    Low,
    Medium,
    High,
}

impl Severity {
    /// Bucket the weighted sum of fired rules.
    pub fn from_flags(flags: AlertFlags, scale: &SeverityScale) -> Self {
        let mut score: u32 = 0;
        if flags.success_rate_drop {
            score = score.saturating_add(scale.drop_weight);
        }
        if flags.volume_anomaly {
            score = score.saturating_add(scale.volume_weight);
        }
        if flags.value_anomaly {
            score = score.saturating_add(scale.value_weight);
        }

        if score >= scale.high {
            Self::High
        } else if score >= scale.medium {
            Self::Medium
        } else if score >= scale.low {
            Self::Low
        } else {
            Self::None
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which rules fired for a day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AlertFlags {
    pub success_rate_drop: bool,
    pub volume_anomaly: bool,
    pub value_anomaly: bool,
}

impl AlertFlags {
    pub fn evaluate(scored: &ScoredRecord, t: &AlertThresholds) -> Self {
        Self {
            success_rate_drop: at_or_below(scored.success_rate_pct.z, t.success_rate_z)
                || at_or_below(scored.success_rate_drop_pp, t.success_rate_drop_pp),
            volume_anomaly: abs_at_least(scored.txn_cnt.z, t.volume_z),
            value_anomaly: abs_at_least(scored.total_value.z, t.value_z),
        }
    }

    pub fn any(self) -> bool {
        self.success_rate_drop || self.volume_anomaly || self.value_anomaly
    }
}

fn at_or_below(value: Option<f64>, threshold: f64) -> bool {
    value.is_some_and(|v| v <= threshold)
}

fn abs_at_least(value: Option<f64>, threshold: f64) -> bool {
    value.is_some_and(|v| v.abs() >= threshold)
}

/// A scored day with its fused alert verdict.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertedRecord {
    pub scored: ScoredRecord,
    pub flags: AlertFlags,
    pub alert_any: bool,
    pub severity: Severity,
}

impl AlertedRecord {
    pub fn date(&self) -> chrono::NaiveDate {
        self.scored.record.date
    }
}

/// Evaluate all rules for every scored day.
pub fn fuse(scored: Vec<ScoredRecord>, thresholds: &AlertThresholds, scale: &SeverityScale) -> Vec<AlertedRecord> {
    scored
        .into_iter()
        .map(|scored| {
            let flags = AlertFlags::evaluate(&scored, thresholds);
            AlertedRecord {
                scored,
                flags,
                alert_any: flags.any(),
                severity: Severity::from_flags(flags, scale),
            }
        })
        .collect()
}

/// Keep only days where a rule fired, ascending by date.
pub fn flagged(alerted: Vec<AlertedRecord>) -> Vec<AlertedRecord> {
    let mut alerts: Vec<AlertedRecord> = alerted.into_iter().filter(|a| a.alert_any).collect();
    alerts.sort_by_key(|a| a.date());
    alerts
}
