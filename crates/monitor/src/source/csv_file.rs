use std::path::PathBuf;

use async_trait::async_trait;

use kpiwatch_core::{MonitorError, RawKpiRow};

use super::KpiSource;

/// Daily KPI rows exported to a CSV file with a header row.
///
/// Columns are matched by name (`txn_date` or `date`, `txn_cnt`, ...);
/// extra columns are ignored and empty cells read as missing.
#[derive(Debug, Clone)]
pub struct CsvKpiSource {
    path: PathBuf,
    name: String,
}

impl CsvKpiSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = format!("csv:{}", path.display());
        Self { path, name }
    }
}

/// Parse CSV bytes into raw rows. Row numbers in errors are zero-based data rows.
pub fn parse_csv(data: &[u8]) -> Result<Vec<RawKpiRow>, MonitorError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(data);

    let mut rows = Vec::new();
    for (row, result) in reader.deserialize::<RawKpiRow>().enumerate() {
        let raw = result.map_err(|e| MonitorError::malformed(row, None, e.to_string()))?;
        rows.push(raw);
    }
    Ok(rows)
}

#[async_trait]
impl KpiSource for CsvKpiSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> Result<Vec<RawKpiRow>, MonitorError> {
        let data = tokio::fs::read(&self.path)
            .await
            .map_err(|e| MonitorError::unavailable(&self.name, e))?;
        parse_csv(&data)
    }
}
