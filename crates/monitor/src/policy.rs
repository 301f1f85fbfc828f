//! AlertPolicy document — YAML overrides for window, thresholds and
//! severity scale.
//!
//! ```yaml
//! apiVersion: v1
//! kind: AlertPolicy
//! metadata:
//!   id: payments-daily
//!   name: Payments daily KPIs
//! spec:
//!   window: 14
//!   thresholds:
//!     volume_z: 2.5
//! ```
//!
//! Every field under `spec:` is optional; omitted fields keep their current value.

use std::path::Path;

use serde::{Deserialize, Serialize};

use kpiwatch_core::{MonitorConfig, MonitorError};

pub const POLICY_KIND: &str = "AlertPolicy";

// ── YAML-level types ────────────────────────────────────────────────

/// Top-level AlertPolicy document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct AlertPolicy {
    #[serde(rename = "apiVersion")]
    pub api_version: String,
    pub kind: String,
    pub metadata: PolicyMetadata,
    #[serde(default)]
    pub spec: AlertPolicySpec,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PolicyMetadata {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct AlertPolicySpec {
    pub window: Option<usize>,
    pub min_periods: Option<usize>,
    #[serde(default)]
    pub thresholds: ThresholdOverrides,
    #[serde(default)]
    pub severity: SeverityOverrides,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ThresholdOverrides {
    pub success_rate_z: Option<f64>,
    pub success_rate_drop_pp: Option<f64>,
    pub volume_z: Option<f64>,
    pub value_z: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SeverityOverrides {
    pub drop_weight: Option<u32>,
    pub volume_weight: Option<u32>,
    pub value_weight: Option<u32>,
    pub high: Option<u32>,
    pub medium: Option<u32>,
    pub low: Option<u32>,
}

impl AlertPolicy {
    pub fn from_yaml(yaml: &str) -> Result<Self, MonitorError> {
        let policy: Self = serde_yaml::from_str(yaml).map_err(|e| MonitorError::Policy(e.to_string()))?;
        if policy.kind != POLICY_KIND {
            return Err(MonitorError::Policy(format!(
                "expected kind '{}', found '{}'",
                POLICY_KIND, policy.kind
            )));
        }
        Ok(policy)
    }

    pub fn load(path: &Path) -> Result<Self, MonitorError> {
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| MonitorError::Policy(format!("{}: {}", path.display(), e)))?;
        Self::from_yaml(&yaml)
    }

    /// Apply overrides onto `base` and validate the result.
    pub fn apply(&self, base: &MonitorConfig) -> Result<MonitorConfig, MonitorError> {
        let s = &self.spec;
        let mut cfg = base.clone();

        cfg.window = s.window.unwrap_or(cfg.window);
        cfg.min_periods = s.min_periods.unwrap_or(cfg.min_periods);

        let t = &s.thresholds;
        let th = &mut cfg.thresholds;
        th.success_rate_z = t.success_rate_z.unwrap_or(th.success_rate_z);
        th.success_rate_drop_pp = t.success_rate_drop_pp.unwrap_or(th.success_rate_drop_pp);
        th.volume_z = t.volume_z.unwrap_or(th.volume_z);
        th.value_z = t.value_z.unwrap_or(th.value_z);

        let v = &s.severity;
        let sc = &mut cfg.severity;
        sc.drop_weight = v.drop_weight.unwrap_or(sc.drop_weight);
        sc.volume_weight = v.volume_weight.unwrap_or(sc.volume_weight);
        sc.value_weight = v.value_weight.unwrap_or(sc.value_weight);
        sc.high = v.high.unwrap_or(sc.high);
        sc.medium = v.medium.unwrap_or(sc.medium);
        sc.low = v.low.unwrap_or(sc.low);

        cfg.validate()?;
        Ok(cfg)
    }
}
