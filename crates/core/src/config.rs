use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::MonitorError;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_parse<T: std::str::FromStr>(profile: &str, key: &str, default: T) -> T {
    match profiled_env_opt(profile, key) {
        Some(v) => v.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %v, "unparsable config value, using default");
            default
        }),
        None => default,
    }
}

/// Like `profiled_env_parse`, but an unparsable value is an error.
fn profiled_env_require<T: std::str::FromStr>(profile: &str, key: &str, default: T) -> Result<T, MonitorError> {
    match profiled_env_opt(profile, key) {
        Some(v) => v
            .trim()
            .parse()
            .map_err(|_| MonitorError::InvalidConfig(format!("{} is not a valid number: '{}'", key, v))),
        None => Ok(default),
    }
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub postgres: PostgresConfig,
    pub source: SourceConfig,
    pub export: ExportConfig,
    pub monitor: MonitorConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `KPIWATCH_PROFILE`. When set (e.g. `PROD`),
    /// every key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    ///
    /// Unparsable monitor options (`KPI_WINDOW`, thresholds) are rejected;
    /// other unparsable keys log a warning and keep their default.
    pub fn from_env() -> Result<Self, MonitorError> {
        let profile = env_or("KPIWATCH_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Result<Self, MonitorError> {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Ok(Self {
            profile: p.to_string(),
            postgres: PostgresConfig::from_env_profiled(p),
            source: SourceConfig::from_env_profiled(p),
            export: ExportConfig::from_env_profiled(p),
            monitor: MonitorConfig::from_env_profiled(p)?,
        })
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        let m = &self.monitor;
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!("  postgres:  host={}, port={}, db={}", self.postgres.host, self.postgres.port, self.postgres.database);
        tracing::info!("  source:    relation={}", self.source.relation);
        tracing::info!("  export:    path={}, tail_rows={}", self.export.output_path().display(), self.export.tail_rows);
        tracing::info!("  monitor:   window={}, min_periods={}", m.window, m.min_periods);
        tracing::info!(
            "  thresholds: success_rate_z={}, drop_pp={}, volume_z={}, value_z={}",
            m.thresholds.success_rate_z,
            m.thresholds.success_rate_drop_pp,
            m.thresholds.volume_z,
            m.thresholds.value_z
        );
    }
}

// ── PostgreSQL ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostgresConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: Option<String>,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    pub ssl_mode: String,
    pub max_connections: u32,
}

impl PostgresConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            host: profiled_env_or(p, "PG_HOST", "localhost"),
            port: profiled_env_parse(p, "PG_PORT", 5432),
            database: profiled_env_or(p, "PG_DB", "payments"),
            username: profiled_env_opt(p, "PG_USER"),
            password: profiled_env_opt(p, "PG_PASSWORD"),
            ssl_mode: profiled_env_or(p, "PG_SSL_MODE", "prefer"),
            max_connections: profiled_env_parse(p, "PG_MAX_CONNECTIONS", 2),
        }
    }

    pub fn connection_string(&self) -> String {
        let user = self.username.as_deref().unwrap_or("postgres");
        let pass = self.password.as_deref().unwrap_or("");
        format!(
            "postgres://{}:{}@{}:{}/{}?sslmode={}",
            user, pass, self.host, self.port, self.database, self.ssl_mode
        )
    }
}

// ── Source ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Relation holding one aggregated row per day.
    pub relation: String,
}

impl SourceConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            relation: profiled_env_or(p, "KPI_SOURCE_RELATION", "gold.fact_payments_daily"),
        }
    }
}

// ── Export ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    pub dir: PathBuf,
    pub file_name: String,
    /// Number of most recent alerts shown on the console.
    pub tail_rows: usize,
}

impl ExportConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            dir: PathBuf::from(profiled_env_or(p, "KPI_EXPORT_DIR", "00_docs/exports")),
            file_name: profiled_env_or(p, "KPI_EXPORT_FILE", "alerts_daily.csv"),
            tail_rows: profiled_env_parse(p, "KPI_TAIL_ROWS", 30),
        }
    }

    pub fn output_path(&self) -> PathBuf {
        self.dir.join(&self.file_name)
    }
}

// ── Monitor ───────────────────────────────────────────────────

/// Rolling-baseline and alerting parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Trailing window size in days, current day included.
    pub window: usize,
    /// Minimum samples in a window before a metric is scored.
    pub min_periods: usize,
    pub thresholds: AlertThresholds,
    pub severity: SeverityScale,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            window: 7,
            min_periods: 3,
            thresholds: AlertThresholds::default(),
            severity: SeverityScale::default(),
        }
    }
}

impl MonitorConfig {
    fn from_env_profiled(p: &str) -> Result<Self, MonitorError> {
        let d = Self::default();
        let t = &d.thresholds;
        Ok(Self {
            window: profiled_env_require(p, "KPI_WINDOW", d.window)?,
            min_periods: profiled_env_require(p, "KPI_MIN_PERIODS", d.min_periods)?,
            thresholds: AlertThresholds {
                success_rate_z: profiled_env_require(p, "KPI_SUCCESS_RATE_Z", t.success_rate_z)?,
                success_rate_drop_pp: profiled_env_require(p, "KPI_SUCCESS_RATE_DROP_PP", t.success_rate_drop_pp)?,
                volume_z: profiled_env_require(p, "KPI_VOLUME_Z", t.volume_z)?,
                value_z: profiled_env_require(p, "KPI_VALUE_Z", t.value_z)?,
            },
            severity: d.severity.clone(),
        })
    }

    /// Reject parameter combinations the scorer cannot honour.
    pub fn validate(&self) -> Result<(), MonitorError> {
        if self.window < 1 {
            return Err(MonitorError::InvalidConfig("window must be at least 1".into()));
        }
        if self.min_periods < 1 || self.min_periods > self.window {
            return Err(MonitorError::InvalidConfig(format!(
                "min_periods must be within 1..={} (got {})",
                self.window, self.min_periods
            )));
        }
        self.thresholds.validate()?;
        self.severity.validate()
    }
}

/// Per-rule alert thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertThresholds {
    /// success_rate_pct_z <= this fires the drop rule.
    pub success_rate_z: f64,
    /// success_rate_drop_pp <= this (percentage points) fires the drop rule.
    pub success_rate_drop_pp: f64,
    /// |txn_cnt_z| >= this fires the volume rule.
    pub volume_z: f64,
    /// |total_value_z| >= this fires the value rule.
    pub value_z: f64,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            success_rate_z: -2.0,
            success_rate_drop_pp: -5.0,
            volume_z: 2.0,
            value_z: 2.0,
        }
    }
}

impl AlertThresholds {
    fn validate(&self) -> Result<(), MonitorError> {
        let all = [
            ("success_rate_z", self.success_rate_z),
            ("success_rate_drop_pp", self.success_rate_drop_pp),
            ("volume_z", self.volume_z),
            ("value_z", self.value_z),
        ];
        for (name, value) in all {
            if !value.is_finite() {
                return Err(MonitorError::InvalidConfig(format!("{} must be finite", name)));
            }
        }
        if self.volume_z < 0.0 || self.value_z < 0.0 {
            return Err(MonitorError::InvalidConfig(
                "volume_z and value_z compare against |z| and must be non-negative".into(),
            ));
        }
        Ok(())
    }
}

/// Rule weights and score boundaries for severity bucketing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityScale {
    pub drop_weight: u32,
    pub volume_weight: u32,
    pub value_weight: u32,
    /// score >= high → HIGH.
    pub high: u32,
    /// score >= medium → MEDIUM.
    pub medium: u32,
    /// score >= low → LOW, below → NONE.
    pub low: u32,
}

impl Default for SeverityScale {
    fn default() -> Self {
        Self {
            drop_weight: 2,
            volume_weight: 1,
            value_weight: 1,
            high: 3,
            medium: 2,
            low: 1,
        }
    }
}

impl SeverityScale {
    /// Score when every rule fires; `None` if the weights overflow.
    pub fn max_score(&self) -> Option<u32> {
        self.drop_weight
            .checked_add(self.volume_weight)?
            .checked_add(self.value_weight)
    }

    fn validate(&self) -> Result<(), MonitorError> {
        if self.max_score().is_none() {
            return Err(MonitorError::InvalidConfig(format!(
                "severity weights overflow when summed (got {}/{}/{})",
                self.drop_weight, self.volume_weight, self.value_weight
            )));
        }
        if self.low < 1 || self.low > self.medium || self.medium > self.high {
            return Err(MonitorError::InvalidConfig(format!(
                "severity boundaries must satisfy 1 <= low <= medium <= high (got {}/{}/{})",
                self.low, self.medium, self.high
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(MonitorConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_window_rejected() {
        let cfg = MonitorConfig { window: 0, min_periods: 0, ..Default::default() };
        assert!(matches!(cfg.validate(), Err(MonitorError::InvalidConfig(_))));
    }

    #[test]
    fn min_periods_above_window_rejected() {
        let cfg = MonitorConfig { window: 3, min_periods: 4, ..Default::default() };
        assert!(matches!(cfg.validate(), Err(MonitorError::InvalidConfig(_))));
    }

    #[test]
    fn non_finite_threshold_rejected() {
        let mut cfg = MonitorConfig::default();
        cfg.thresholds.success_rate_z = f64::NAN;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn unordered_severity_boundaries_rejected() {
        let mut cfg = MonitorConfig::default();
        cfg.severity.medium = 5;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn overflowing_severity_weights_rejected() {
        let mut cfg = MonitorConfig::default();
        cfg.severity.drop_weight = u32::MAX;
        cfg.severity.volume_weight = 1;
        assert!(matches!(cfg.validate(), Err(MonitorError::InvalidConfig(_))));

        cfg.severity.volume_weight = 0;
        cfg.severity.value_weight = 0;
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.severity.max_score(), Some(u32::MAX));
    }

    #[test]
    fn monitor_keys_read_from_profile() {
        env::set_var("MONKEYS_KPI_WINDOW", "14");
        env::set_var("MONKEYS_KPI_VOLUME_Z", " 2.5 ");
        let cfg = MonitorConfig::from_env_profiled("MONKEYS").unwrap();
        assert_eq!(cfg.window, 14);
        assert_eq!(cfg.thresholds.volume_z, 2.5);
        assert_eq!(cfg.thresholds.value_z, 2.0);
        assert_eq!(cfg.min_periods, 3);
        env::remove_var("MONKEYS_KPI_WINDOW");
        env::remove_var("MONKEYS_KPI_VOLUME_Z");
    }

    #[test]
    fn unparsable_threshold_rejected() {
        env::set_var("BADNUM_KPI_VOLUME_Z", "2,5");
        let err = MonitorConfig::from_env_profiled("BADNUM").unwrap_err();
        env::remove_var("BADNUM_KPI_VOLUME_Z");
        match err {
            MonitorError::InvalidConfig(msg) => assert!(msg.contains("KPI_VOLUME_Z"), "{msg}"),
            other => panic!("expected InvalidConfig, got {:?}", other),
        }
    }

    #[test]
    fn unparsable_export_key_keeps_default() {
        env::set_var("BADTAIL_KPI_TAIL_ROWS", "many");
        let export = ExportConfig::from_env_profiled("BADTAIL");
        env::remove_var("BADTAIL_KPI_TAIL_ROWS");
        assert_eq!(export.tail_rows, 30);
    }

    #[test]
    fn profile_prefix_wins_over_plain_key() {
        // Unique key names keep this independent of other tests' env state.
        env::set_var("KPIWATCH_TEST_ONLY_KEY", "plain");
        env::set_var("STAGE_KPIWATCH_TEST_ONLY_KEY", "staged");
        assert_eq!(profiled_env_or("STAGE", "KPIWATCH_TEST_ONLY_KEY", "x"), "staged");
        assert_eq!(profiled_env_or("", "KPIWATCH_TEST_ONLY_KEY", "x"), "plain");
        env::remove_var("KPIWATCH_TEST_ONLY_KEY");
        env::remove_var("STAGE_KPIWATCH_TEST_ONLY_KEY");
    }

    #[test]
    fn connection_string_defaults_user() {
        let pg = PostgresConfig {
            host: "db".into(),
            port: 5433,
            database: "payments".into(),
            username: None,
            password: None,
            ssl_mode: "disable".into(),
            max_connections: 1,
        };
        assert_eq!(pg.connection_string(), "postgres://postgres:@db:5433/payments?sslmode=disable");
    }
}
