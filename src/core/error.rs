use crate::core::block::ProcessId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PartitionError {
    #[error("Invalid request size: {requested} units (must be within {min}..={max})")]
    InvalidSize { requested: u32, min: u32, max: u32 },

    #[error("Insufficient space: no free block of {requested} units ({examined} blocks examined)")]
    InsufficientSpace { requested: u32, examined: usize },

    #[error("Unknown process: {0} holds no block")]
    UnknownProcess(ProcessId),

    #[error("Process {0} already holds a block")]
    DuplicateProcess(ProcessId),

    #[error("Corrupt ledger: {0}")]
    CorruptLedger(String),

    #[error("Invalid placement strategy: {0} (expected first-fit or best-fit)")]
    InvalidStrategy(String),

    #[error("Invalid simulation config: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PartitionError {
    /// True for the request-level failures the engine reports as `-1`.
    /// These never mutate the ledger.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            PartitionError::InvalidSize { .. }
                | PartitionError::InsufficientSpace { .. }
                | PartitionError::UnknownProcess(_)
                | PartitionError::DuplicateProcess(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, PartitionError>;
