pub mod pipeline;
pub mod policy;
pub mod report;
pub mod source;

pub use pipeline::alert::{AlertFlags, AlertedRecord, Severity};
pub use pipeline::scoring::{MetricScore, ScoredRecord};
pub use pipeline::{Monitor, RunOutcome, RunReport};
pub use policy::AlertPolicy;
pub use report::ReportFormat;
pub use source::{CsvKpiSource, KpiSource, MemoryKpiSource, PgKpiSource};
