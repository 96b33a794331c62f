use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write output: {source}")]
    Stream {
        #[from]
        source: std::io::Error,
    },

    #[error("CSV write failed: {source}")]
    Csv {
        #[from]
        source: csv::Error,
    },

    #[error("workbook write failed: {source}")]
    Workbook {
        #[from]
        source: rust_xlsxwriter::XlsxError,
    },

    #[error("JSON write failed: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },

    #[error("CSV output holds exactly one table, this export has {count} ({tables})")]
    MultipleTables { count: usize, tables: String },

    #[error("table '{table}' has {columns} columns, a worksheet holds at most {limit}")]
    TooManyColumns {
        table: String,
        columns: usize,
        limit: usize,
    },

    #[error("no geo field '{name}' in the export")]
    UnknownGeoField { name: String },

    #[error("the export has no geo field")]
    NoGeoField,
}

pub type Result<T> = std::result::Result<T, OutputError>;
