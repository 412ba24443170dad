use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum BiomodelsError {
    #[error("cache directory must be provided")]
    MissingCacheDir,

    #[error("invalid model id: {0:?}")]
    InvalidModelId(String),

    #[error("model not found: {0}")]
    ModelNotFound(String),

    #[error("import file not found: {}", .0.display())]
    ImportFileNotFound(PathBuf),

    #[error("BioModels request failed: {0}")]
    Http(String),

    #[error("BioModels returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("invalid cache data: {0}")]
    Format(String),

    #[error("cannot normalize record: {0}")]
    Normalization(String),

    #[error("invalid date in search filters: {0:?} (expected YYYY-MM-DD)")]
    InvalidFilterDate(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}
