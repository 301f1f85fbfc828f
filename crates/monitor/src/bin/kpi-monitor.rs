//! kpi-monitor — one-shot daily payments KPI anomaly run.
//!
//! Reads the full daily KPI history (PostgreSQL by default, or a CSV export),
//! writes the flagged days to an artifact and prints a console summary.

use std::path::PathBuf;

use clap::Parser;
use tracing::info;

use kpiwatch_core::config::{load_dotenv, Config};
use kpiwatch_monitor::report::{export_alerts, render_summary, render_tail};
use kpiwatch_monitor::{AlertPolicy, CsvKpiSource, KpiSource, Monitor, PgKpiSource, ReportFormat, RunOutcome};

// ── CLI ─────────────────────────────────────────────────────────────

/// Daily payments KPI anomaly monitor.
#[derive(Parser, Debug)]
#[command(name = "kpi-monitor", version, about)]
struct Cli {
    /// Config profile; keys are looked up as {PROFILE}_{KEY} first.
    #[arg(long, env = "KPIWATCH_PROFILE")]
    profile: Option<String>,

    /// Read daily KPIs from a CSV export instead of PostgreSQL.
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Source relation in PostgreSQL (overrides KPI_SOURCE_RELATION).
    #[arg(long)]
    relation: Option<String>,

    /// AlertPolicy YAML overriding window, thresholds and severity scale.
    #[arg(long, env = "KPI_POLICY_FILE")]
    policy: Option<PathBuf>,

    /// Artifact path (defaults to KPI_EXPORT_DIR/KPI_EXPORT_FILE).
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Artifact encoding.
    #[arg(long, value_enum, default_value_t = ReportFormat::Csv)]
    format: ReportFormat,

    /// Number of most recent alerts printed to the console.
    #[arg(long)]
    tail: Option<usize>,
}

// ── main ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config = match &cli.profile {
        Some(profile) => Config::for_profile(profile)?,
        None => Config::from_env()?,
    };
    config.log_summary();

    let monitor_config = match &cli.policy {
        Some(path) => {
            let policy = AlertPolicy::load(path)?;
            info!(policy = %policy.metadata.id, path = %path.display(), "alert policy applied");
            policy.apply(&config.monitor)?
        }
        None => config.monitor.clone(),
    };
    let monitor = Monitor::new(monitor_config)?;

    let source: Box<dyn KpiSource> = match &cli.csv {
        Some(path) => Box::new(CsvKpiSource::new(path)),
        None => {
            let relation = cli.relation.as_deref().unwrap_or(&config.source.relation);
            Box::new(PgKpiSource::connect(&config.postgres, relation).await?)
        }
    };

    let report = match monitor.run(source.as_ref()).await? {
        RunOutcome::NoData { source } => {
            println!("No rows found in {}. Load the daily aggregates first.", source);
            return Ok(());
        }
        RunOutcome::Completed(report) => report,
    };

    let output = cli.output.clone().unwrap_or_else(|| config.export.output_path());
    let saved = export_alerts(&report.alerts, &output, cli.format)?;
    info!(path = %saved.display(), alerts = report.alerts.len(), "alerts exported");

    print!("{}", render_summary(&report.source, &report.metrics, Some(&saved)));

    if report.alerts.is_empty() {
        println!("No anomalies detected with current thresholds.");
    } else {
        let tail = cli.tail.unwrap_or(config.export.tail_rows);
        println!("\n--- Recent alerts (tail) ---");
        print!("{}", render_tail(&report.alerts, tail));
    }

    Ok(())
}
