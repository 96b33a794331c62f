use std::path::PathBuf;

use formpack_model::ModelError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {context}: {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to read CSV {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("failed to read workbook {path}: {source}")]
    Workbook {
        path: PathBuf,
        #[source]
        source: calamine::XlsxError,
    },

    #[error("worksheet '{sheet}' not found in {path}")]
    MissingSheet { path: PathBuf, sheet: String },

    #[error("unsupported file type: {path}")]
    UnsupportedFile { path: PathBuf },

    #[error("invalid form schema: {message}")]
    Schema { message: String },

    #[error("invalid locking profiles: {message}")]
    Locking { message: String },

    #[error(transparent)]
    Model(#[from] ModelError),
}

pub type Result<T> = std::result::Result<T, IngestError>;
