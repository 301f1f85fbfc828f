use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("source '{source_name}' unavailable: {message}")]
    SourceUnavailable { source_name: String, message: String },

    #[error("malformed row {row}{}: {reason}", .date.map(|d| format!(" ({})", d)).unwrap_or_default())]
    MalformedRow {
        row: usize,
        date: Option<NaiveDate>,
        reason: String,
    },

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("policy error: {0}")]
    Policy(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(String),
}

impl MonitorError {
    pub fn malformed(row: usize, date: Option<NaiveDate>, reason: impl Into<String>) -> Self {
        Self::MalformedRow { row, date, reason: reason.into() }
    }

    pub fn unavailable(source_name: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::SourceUnavailable {
            source_name: source_name.into(),
            message: message.to_string(),
        }
    }
}

impl From<serde_json::Error> for MonitorError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialize(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, MonitorError>;
