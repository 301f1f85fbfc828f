use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

use kpiwatch_core::config::PostgresConfig;
use kpiwatch_core::{MonitorError, RawKpiRow};

use super::KpiSource;

/// Daily aggregate relation in PostgreSQL (a table or view).
pub struct PgKpiSource {
    pool: PgPool,
    relation: String,
    name: String,
}

#[derive(Debug, sqlx::FromRow)]
struct PgKpiRow {
    txn_date: Option<NaiveDate>,
    txn_cnt: Option<i64>,
    total_value: Option<f64>,
    success_cnt: Option<i64>,
    failure_cnt: Option<i64>,
    success_rate_pct: Option<f64>,
    failure_rate_pct: Option<f64>,
    success_value: Option<f64>,
}

impl From<PgKpiRow> for RawKpiRow {
    fn from(r: PgKpiRow) -> Self {
        Self {
            txn_date: r.txn_date,
            txn_cnt: r.txn_cnt,
            total_value: r.total_value,
            success_cnt: r.success_cnt,
            failure_cnt: r.failure_cnt,
            success_rate_pct: r.success_rate_pct,
            failure_rate_pct: r.failure_rate_pct,
            success_value: r.success_value,
        }
    }
}

impl PgKpiSource {
    /// Wrap an existing pool. `relation` must be a plain, optionally
    /// schema-qualified identifier.
    pub fn new(pool: PgPool, relation: &str) -> Result<Self, MonitorError> {
        validate_relation(relation)?;
        Ok(Self {
            pool,
            relation: relation.to_string(),
            name: format!("postgres:{}", relation),
        })
    }

    /// Open a small pool from config. Connection failures are `SourceUnavailable`.
    pub async fn connect(config: &PostgresConfig, relation: &str) -> Result<Self, MonitorError> {
        validate_relation(relation)?;
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections.max(1))
            .connect(&config.connection_string())
            .await
            .map_err(|e| MonitorError::unavailable(format!("postgres:{}", relation), e))?;
        info!("PostgreSQL connected: {}", config.host);
        Self::new(pool, relation)
    }

    fn query(&self) -> String {
        query_for(&self.relation)
    }
}

fn query_for(relation: &str) -> String {
    format!(
        "SELECT \
           txn_date::date AS txn_date, \
           txn_cnt::bigint AS txn_cnt, \
           total_value::float8 AS total_value, \
           success_cnt::bigint AS success_cnt, \
           failure_cnt::bigint AS failure_cnt, \
           success_rate_pct::float8 AS success_rate_pct, \
           failure_rate_pct::float8 AS failure_rate_pct, \
           success_value::float8 AS success_value \
         FROM {} \
         ORDER BY txn_date",
        relation
    )
}

fn validate_relation(relation: &str) -> Result<(), MonitorError> {
    let parts: Vec<&str> = relation.split('.').collect();
    let valid_part = |p: &str| {
        let mut chars = p.chars();
        matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
    };
    if parts.len() > 2 || !parts.iter().all(|p| valid_part(p)) {
        return Err(MonitorError::InvalidConfig(format!(
            "source relation '{}' must be [schema.]name using letters, digits and underscores",
            relation
        )));
    }
    Ok(())
}

#[async_trait]
impl KpiSource for PgKpiSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> Result<Vec<RawKpiRow>, MonitorError> {
        let sql = self.query();
        let rows = sqlx::query_as::<_, PgKpiRow>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| MonitorError::unavailable(&self.name, e))?;
        Ok(rows.into_iter().map(RawKpiRow::from).collect())
    }
}
