pub mod config;
pub mod error;
pub mod record;

pub use config::{AlertThresholds, Config, MonitorConfig, SeverityScale};
pub use error::*;
pub use record::*;
