use std::io;
use std::path::PathBuf;

use config::ConfigError;
use input_analyser::random_forest::ForestError;
use input_analyser::table::TableError;

pub type Result<T, E = PredictorError> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum PredictorError {
    #[error("Input log not found: {}", .0.display())]
    DatasetNotFound(PathBuf),

    #[error("Input log has no rows")]
    EmptyDataset,

    #[error("Input log error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Table error: {0}")]
    Table(#[from] TableError),

    #[error("Forest error: {0}")]
    Forest(#[from] ForestError),

    #[error("Invalid model artifact: {0}")]
    InvalidModel(String),

    #[error("Unknown input label: {0}")]
    UnknownLabel(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl PredictorError {
    pub fn invalid_model<S: Into<String>>(message: S) -> Self {
        Self::InvalidModel(message.into())
    }

    pub fn invalid_argument<S: Into<String>>(message: S) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub fn is_not_found(&self) -> bool {
        match self {
            PredictorError::DatasetNotFound(_) => true,
            PredictorError::Io(e) => e.kind() == io::ErrorKind::NotFound,
            _ => false,
        }
    }
}
