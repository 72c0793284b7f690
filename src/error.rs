use thiserror::Error;

/// Failures surfaced by ingestion and the analytics core.
///
/// Most gaps in the data (missing seasons, missing drive numbers, an
/// unparseable spread) are handled by omission and never reach this type.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("Malformed play at row {row}: missing {field}")]
    MalformedPlay { row: usize, field: &'static str },

    #[error("Invalid comparison scope '{0}': expected game, week, season or all")]
    InvalidScope(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Season loader task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, AnalyticsError>;
