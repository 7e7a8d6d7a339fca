use crate::planner::{Planner, PlannerData, PlannerError};
use crate::record_validation::RecordValidationError;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[cfg(feature = "sqlite")]
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("invalid data: {0}")]
    InvalidData(String),
    #[error("line {line}: {message}")]
    InvalidRecord { line: u64, message: String },
}

impl From<RecordValidationError> for PersistenceError {
    fn from(value: RecordValidationError) -> Self {
        Self::InvalidData(value.to_string())
    }
}

impl From<PlannerError> for PersistenceError {
    fn from(value: PlannerError) -> Self {
        Self::InvalidData(value.to_string())
    }
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// Durable home of a whole planner.
pub trait PlannerStore: Send + Sync {
    fn save_planner(&self, planner: &Planner) -> PersistenceResult<()>;
    /// `None` when nothing was saved yet.
    fn load_planner(&self) -> PersistenceResult<Option<Planner>>;
}

pub fn validate_data(data: &PlannerData) -> PersistenceResult<()> {
    data.validate().map_err(PersistenceError::from)
}

pub mod file;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use file::{
    ImportSummary, export_assignments_csv, export_persons_csv, import_assignments_csv,
    import_persons_csv, load_planner_from_json, save_planner_to_json,
};
#[cfg(feature = "sqlite")]
pub use sqlite::SqlitePlannerStore;
