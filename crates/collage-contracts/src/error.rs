use thiserror::Error;

/// Failures while persisting run records (event log, summary).
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("run record i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("run record encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("event writer lock poisoned")]
    Poisoned,
}
