use async_trait::async_trait;

use kpiwatch_core::{KpiRecord, MonitorError, RawKpiRow};

use super::KpiSource;

/// Fixed set of rows held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryKpiSource {
    name: String,
    rows: Vec<RawKpiRow>,
}

impl MemoryKpiSource {
    pub fn new(name: impl Into<String>, rows: Vec<RawKpiRow>) -> Self {
        Self { name: name.into(), rows }
    }

    pub fn from_records(name: impl Into<String>, records: &[KpiRecord]) -> Self {
        Self::new(name, records.iter().map(RawKpiRow::from).collect())
    }
}

#[async_trait]
impl KpiSource for MemoryKpiSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> Result<Vec<RawKpiRow>, MonitorError> {
        Ok(self.rows.clone())
    }
}
