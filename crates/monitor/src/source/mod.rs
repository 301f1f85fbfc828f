//! KPI row sources.
//!
//! A [`KpiSource`] performs one atomic fetch of every daily row; it does not
//! filter, paginate or retry. [`load_records`] validates what it returns.

mod csv_file;
mod memory;
mod postgres;

use std::collections::HashMap;

use async_trait::async_trait;
use tracing::debug;

use kpiwatch_core::{KpiRecord, MonitorError, RawKpiRow};

pub use csv_file::{parse_csv, CsvKpiSource};
pub use memory::MemoryKpiSource;
pub use postgres::PgKpiSource;

/// External provider of daily KPI rows.
#[async_trait]
pub trait KpiSource: Send + Sync {
    /// Human-readable name used in logs and errors.
    fn name(&self) -> &str;

    /// Fetch every row. Transport failures are `SourceUnavailable`.
    async fn fetch(&self) -> Result<Vec<RawKpiRow>, MonitorError>;
}

/// Fetch, validate and sort all rows of a source.
///
/// Fails on the first malformed row and on repeated dates.
pub async fn load_records(source: &dyn KpiSource) -> Result<Vec<KpiRecord>, MonitorError> {
    let raw = source.fetch().await?;
    debug!(source = source.name(), rows = raw.len(), "rows fetched");
    validate_rows(&raw)
}

/// Validate raw rows into records sorted ascending by date.
pub fn validate_rows(raw: &[RawKpiRow]) -> Result<Vec<KpiRecord>, MonitorError> {
    let mut seen: HashMap<chrono::NaiveDate, usize> = HashMap::with_capacity(raw.len());
    let mut records = Vec::with_capacity(raw.len());

    for (row, r) in raw.iter().enumerate() {
        let record = KpiRecord::from_raw(row, r)?;
        if let Some(first) = seen.insert(record.date, row) {
            return Err(MonitorError::malformed(
                row,
                Some(record.date),
                format!("duplicate date, already present at row {}", first),
            ));
        }
        records.push(record);
    }

    records.sort_by_key(|r| r.date);
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn raw(day: u32) -> RawKpiRow {
        RawKpiRow {
            txn_date: NaiveDate::from_ymd_opt(2026, 1, day),
            txn_cnt: Some(100),
            total_value: Some(1000.0),
            success_cnt: Some(95),
            failure_cnt: Some(5),
            success_rate_pct: Some(95.0),
            failure_rate_pct: Some(5.0),
            success_value: Some(950.0),
        }
    }

    #[test]
    fn validate_sorts_by_date() {
        let records = validate_rows(&[raw(3), raw(1), raw(2)]).unwrap();
        let days: Vec<_> = records.iter().map(|r| r.date).collect();
        assert_eq!(
            days,
            vec![
                NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2026, 1, 2).unwrap(),
                NaiveDate::from_ymd_opt(2026, 1, 3).unwrap(),
            ]
        );
    }

    #[test]
    fn duplicate_date_is_malformed() {
        match validate_rows(&[raw(1), raw(2), raw(1)]) {
            Err(MonitorError::MalformedRow { row, reason, .. }) => {
                assert_eq!(row, 2);
                assert!(reason.contains("row 0"));
            }
            other => panic!("expected MalformedRow, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn load_from_memory_source() {
        let source = MemoryKpiSource::new("fixture", vec![raw(2), raw(1)]);
        let records = load_records(&source).await.unwrap();
        assert_eq!(records.len(), 2);
        assert!(records[0].date < records[1].date);
    }

    #[tokio::test]
    async fn malformed_row_surfaces_from_load() {
        let mut bad = raw(4);
        bad.txn_cnt = Some(-3);
        let source = MemoryKpiSource::new("fixture", vec![raw(1), bad]);
        let err = load_records(&source).await.unwrap_err();
        assert!(matches!(err, MonitorError::MalformedRow { row: 1, .. }));
    }
}
