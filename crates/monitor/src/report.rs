//! Alert artifact writers and console rendering.
//!
//! The CSV and JSON artifacts share one flat row shape whose field order is
//! the column order downstream consumers key off.

use std::fmt::Write as _;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Serialize;

use kpiwatch_core::MonitorError;

use crate::pipeline::alert::{AlertedRecord, Severity};
use crate::pipeline::metrics::RunMetrics;

/// Artifact encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ReportFormat {
    #[default]
    Csv,
    Json,
}

/// One alerted day as written to the artifact.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertRow {
    pub date: NaiveDate,
    pub severity: Severity,
    pub txn_cnt: u64,
    pub total_value: f64,
    pub success_rate_pct: f64,
    pub alert_success_rate_drop: bool,
    pub alert_volume_anomaly: bool,
    pub alert_value_anomaly: bool,
    pub success_rate_drop_pp: Option<f64>,
    pub success_rate_pct_z: Option<f64>,
    pub txn_cnt_z: Option<f64>,
    pub total_value_z: Option<f64>,
    pub success_cnt: u64,
    pub failure_cnt: u64,
    pub failure_rate_pct: f64,
    pub success_value: f64,
    pub success_rate_pct_roll_mean: Option<f64>,
    pub success_rate_pct_roll_std: Option<f64>,
    pub txn_cnt_roll_mean: Option<f64>,
    pub txn_cnt_roll_std: Option<f64>,
    pub total_value_roll_mean: Option<f64>,
    pub total_value_roll_std: Option<f64>,
    pub alert_any: bool,
}

impl AlertRow {
    /// Header, in field order.
    pub const COLUMNS: [&'static str; 23] = [
        "date",
        "severity",
        "txn_cnt",
        "total_value",
        "success_rate_pct",
        "alert_success_rate_drop",
        "alert_volume_anomaly",
        "alert_value_anomaly",
        "success_rate_drop_pp",
        "success_rate_pct_z",
        "txn_cnt_z",
        "total_value_z",
        "success_cnt",
        "failure_cnt",
        "failure_rate_pct",
        "success_value",
        "success_rate_pct_roll_mean",
        "success_rate_pct_roll_std",
        "txn_cnt_roll_mean",
        "txn_cnt_roll_std",
        "total_value_roll_mean",
        "total_value_roll_std",
        "alert_any",
    ];
}

impl From<&AlertedRecord> for AlertRow {
    fn from(a: &AlertedRecord) -> Self {
        let s = &a.scored;
        let r = &s.record;
        Self {
            date: r.date,
            severity: a.severity,
            txn_cnt: r.txn_cnt,
            total_value: r.total_value,
            success_rate_pct: r.success_rate_pct,
            alert_success_rate_drop: a.flags.success_rate_drop,
            alert_volume_anomaly: a.flags.volume_anomaly,
            alert_value_anomaly: a.flags.value_anomaly,
            success_rate_drop_pp: s.success_rate_drop_pp,
            success_rate_pct_z: s.success_rate_pct.z,
            txn_cnt_z: s.txn_cnt.z,
            total_value_z: s.total_value.z,
            success_cnt: r.success_cnt,
            failure_cnt: r.failure_cnt,
            failure_rate_pct: r.failure_rate_pct,
            success_value: r.success_value,
            success_rate_pct_roll_mean: s.success_rate_pct.roll_mean,
            success_rate_pct_roll_std: s.success_rate_pct.roll_std,
            txn_cnt_roll_mean: s.txn_cnt.roll_mean,
            txn_cnt_roll_std: s.txn_cnt.roll_std,
            total_value_roll_mean: s.total_value.roll_mean,
            total_value_roll_std: s.total_value.roll_std,
            alert_any: a.alert_any,
        }
    }
}

/// Write alerts as CSV. The header is written even when there are no alerts.
pub fn write_alerts_csv<W: Write>(alerts: &[AlertedRecord], out: W) -> Result<(), MonitorError> {
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(out);
    writer.write_record(AlertRow::COLUMNS).map_err(csv_err)?;
    for alert in alerts {
        writer.serialize(AlertRow::from(alert)).map_err(csv_err)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write alerts as a pretty-printed JSON array.
pub fn write_alerts_json<W: Write>(alerts: &[AlertedRecord], mut out: W) -> Result<(), MonitorError> {
    let rows: Vec<AlertRow> = alerts.iter().map(AlertRow::from).collect();
    serde_json::to_writer_pretty(&mut out, &rows)?;
    out.write_all(b"\n")?;
    out.flush()?;
    Ok(())
}

/// Write the artifact to `path`, creating parent directories.
pub fn export_alerts(alerts: &[AlertedRecord], path: &Path, format: ReportFormat) -> Result<PathBuf, MonitorError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::io::BufWriter::new(std::fs::File::create(path)?);
    match format {
        ReportFormat::Csv => write_alerts_csv(alerts, file)?,
        ReportFormat::Json => write_alerts_json(alerts, file)?,
    }
    Ok(path.to_path_buf())
}

fn csv_err(e: csv::Error) -> MonitorError {
    MonitorError::Serialize(e.to_string())
}

// ── Console rendering ───────────────────────────────────────────────

const TAIL_HEADERS: [&str; 12] = [
    "date",
    "severity",
    "txn_cnt",
    "total_value",
    "success_rate_pct",
    "alert_success_rate_drop",
    "alert_volume_anomaly",
    "alert_value_anomaly",
    "success_rate_drop_pp",
    "success_rate_pct_z",
    "txn_cnt_z",
    "total_value_z",
];

fn fmt_opt(v: Option<f64>, decimals: usize) -> String {
    match v {
        Some(v) => format!("{:.*}", decimals, v),
        None => "-".to_string(),
    }
}

/// Right-aligned text table of the last `n` alerts.
pub fn render_tail(alerts: &[AlertedRecord], n: usize) -> String {
    let skip = alerts.len().saturating_sub(n);
    let rows: Vec<[String; 12]> = alerts[skip..]
        .iter()
        .map(|a| {
            let s = &a.scored;
            let r = &s.record;
            [
                r.date.to_string(),
                a.severity.to_string(),
                r.txn_cnt.to_string(),
                format!("{:.2}", r.total_value),
                format!("{:.2}", r.success_rate_pct),
                a.flags.success_rate_drop.to_string(),
                a.flags.volume_anomaly.to_string(),
                a.flags.value_anomaly.to_string(),
                fmt_opt(s.success_rate_drop_pp, 2),
                fmt_opt(s.success_rate_pct.z, 3),
                fmt_opt(s.txn_cnt.z, 3),
                fmt_opt(s.total_value.z, 3),
            ]
        })
        .collect();

    let mut widths: Vec<usize> = TAIL_HEADERS.iter().map(|h| h.len()).collect();
    for row in &rows {
        for (w, cell) in widths.iter_mut().zip(row.iter()) {
            *w = (*w).max(cell.len());
        }
    }

    let mut out = String::new();
    push_line(&mut out, TAIL_HEADERS.iter().copied(), &widths);
    for row in &rows {
        push_line(&mut out, row.iter().map(String::as_str), &widths);
    }
    out
}

fn push_line<'a>(out: &mut String, cells: impl Iterator<Item = &'a str>, widths: &[usize]) {
    let joined: Vec<String> = cells
        .zip(widths)
        .map(|(c, w)| format!("{:>width$}", c, width = *w))
        .collect();
    let _ = writeln!(out, "{}", joined.join(" "));
}

/// Console summary printed after a completed run.
pub fn render_summary(source: &str, metrics: &RunMetrics, artifact: Option<&Path>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== Payments KPI Monitoring ===");
    let _ = writeln!(out, "Source: {} | Rows: {}", source, metrics.rows_loaded);
    if let Some(started) = metrics.started_at {
        let _ = writeln!(
            out,
            "Run: {} | load {} ms, scoring {} ms",
            started.format("%Y-%m-%d %H:%M:%S UTC"),
            metrics.load_ms,
            metrics.score_ms
        );
    }
    let _ = writeln!(out, "Alerts found: {}", metrics.alerts);
    let _ = writeln!(
        out,
        "Severity: HIGH={} MEDIUM={} LOW={}",
        metrics.severity_count(Severity::High),
        metrics.severity_count(Severity::Medium),
        metrics.severity_count(Severity::Low)
    );
    if let Some(path) = artifact {
        let _ = writeln!(out, "Saved: {}", path.display());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::alert::AlertFlags;
    use crate::pipeline::scoring::{MetricScore, ScoredRecord};
    use kpiwatch_core::KpiRecord;

    fn alert(day: u32, severity: Severity) -> AlertedRecord {
        AlertedRecord {
            scored: ScoredRecord {
                record: KpiRecord {
                    date: NaiveDate::from_ymd_opt(2026, 4, day).unwrap(),
                    txn_cnt: 500,
                    total_value: 12_500.25,
                    success_cnt: 400,
                    failure_cnt: 100,
                    success_rate_pct: 80.0,
                    failure_rate_pct: 20.0,
                    success_value: 10_000.0,
                },
                success_rate_pct: MetricScore { roll_mean: Some(95.0), roll_std: Some(5.0), z: Some(-3.0) },
                txn_cnt: MetricScore { roll_mean: Some(480.0), roll_std: Some(0.0), z: None },
                total_value: MetricScore::default(),
                success_rate_drop_pp: Some(-15.0),
            },
            flags: AlertFlags { success_rate_drop: true, volume_anomaly: false, value_anomaly: false },
            alert_any: true,
            severity,
        }
    }

    #[test]
    fn csv_header_has_fixed_order() {
        let mut buf = Vec::new();
        write_alerts_csv(&[], &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text.trim_end(), AlertRow::COLUMNS.join(","));
        assert!(text.starts_with(
            "date,severity,txn_cnt,total_value,success_rate_pct,alert_success_rate_drop,\
             alert_volume_anomaly,alert_value_anomaly,success_rate_drop_pp,success_rate_pct_z,txn_cnt_z,total_value_z"
        ));
    }

    #[test]
    fn serialized_fields_match_columns() {
        let value = serde_json::to_value(AlertRow::from(&alert(1, Severity::Medium))).unwrap();
        let obj = value.as_object().unwrap();
        assert_eq!(obj.len(), AlertRow::COLUMNS.len());
        for col in AlertRow::COLUMNS {
            assert!(obj.contains_key(col), "{col}");
        }
    }

    #[test]
    fn csv_row_encodes_nulls_as_empty() {
        let mut buf = Vec::new();
        write_alerts_csv(&[alert(2, Severity::Medium)], &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let row = text.lines().nth(1).unwrap();
        let cells: Vec<&str> = row.split(',').collect();
        assert_eq!(cells.len(), AlertRow::COLUMNS.len());
        assert_eq!(cells[0], "2026-04-02");
        assert_eq!(cells[1], "MEDIUM");
        assert_eq!(cells[5], "true");
        assert_eq!(cells[10], "");
        assert_eq!(cells[11], "");
        assert_eq!(cells[22], "true");
    }

    #[test]
    fn json_is_array_of_rows() {
        let mut buf = Vec::new();
        write_alerts_json(&[alert(3, Severity::High)], &mut buf).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(value[0]["severity"], "HIGH");
        assert_eq!(value[0]["txn_cnt_z"], serde_json::Value::Null);
    }

    #[test]
    fn tail_keeps_most_recent() {
        let alerts: Vec<_> = (1..=5).map(|d| alert(d, Severity::Medium)).collect();
        let table = render_tail(&alerts, 2);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("severity"));
        assert!(lines[1].contains("2026-04-04"));
        assert!(lines[2].contains("2026-04-05"));
        assert!(lines[2].contains("-15.00"));
    }

    #[test]
    fn summary_reports_run_start_and_counts() {
        let mut metrics = RunMetrics::start();
        metrics.record_load(40, std::time::Duration::from_millis(12));
        let alerts = [alert(1, Severity::High), alert(2, Severity::Medium), alert(3, Severity::Medium)];
        metrics.record_scoring(&alerts, std::time::Duration::from_millis(3));
        let text = render_summary("fixture", &metrics, Some(Path::new("out/alerts.csv")));
        assert!(text.contains("Source: fixture | Rows: 40"));
        assert!(text.contains("load 12 ms, scoring 3 ms"));
        assert!(text.contains("HIGH=1 MEDIUM=2 LOW=0"));
        assert!(text.contains("Saved: out/alerts.csv"));

        let quiet = render_summary("fixture", &RunMetrics::default(), None);
        assert!(!quiet.contains("Run:"));
        assert!(!quiet.contains("Saved:"));
    }

    #[test]
    fn json_export_is_repeatable() {
        let dir = tempfile::TempDir::new().expect("create tempdir");
        let alerts = [alert(1, Severity::Medium), alert(2, Severity::High)];
        let first = dir.path().join("run1/alerts.json");
        let second = dir.path().join("run2/alerts.json");
        export_alerts(&alerts, &first, ReportFormat::Json).unwrap();
        export_alerts(&alerts, &second, ReportFormat::Json).unwrap();

        let a = std::fs::read(&first).unwrap();
        assert_eq!(a, std::fs::read(&second).unwrap());
        let value: serde_json::Value = serde_json::from_slice(&a).unwrap();
        assert_eq!(value.as_array().unwrap().len(), 2);
        assert_eq!(value[1]["date"], "2026-04-02");

        // Overwriting the same path leaves identical bytes.
        export_alerts(&alerts, &first, ReportFormat::Json).unwrap();
        assert_eq!(std::fs::read(&first).unwrap(), a);
    }

    #[test]
    fn export_creates_parent_dirs() {
        let dir = tempfile::TempDir::new().expect("create tempdir");
        let path = dir.path().join("exports/nested/alerts.csv");
        export_alerts(&[alert(1, Severity::Medium)], &path, ReportFormat::Csv).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 2);
    }
}
