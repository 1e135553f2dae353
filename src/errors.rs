use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error reading config file {path}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to parse JSON configuration in {path}: {source}")]
    JsonParseError {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Configuration file not found at {path}")]
    NotFound { path: PathBuf },
    #[error("Invalid configuration for field '{field}': {message}")]
    Invalid { field: String, message: String },
}

/// Fatal ingest failures. Everything else met while parsing an export is
/// recovered locally and counted in `IngestMetrics`.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("IO error reading data file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Unknown character encoding label '{label}'")]
    UnknownEncoding { label: String },
    #[error("Failed to tokenize delimited text at record {record}: {source}")]
    Tokenize {
        record: usize,
        #[source]
        source: csv::Error,
    },
    #[error("Ingest configuration rejected: {0}")]
    Config(#[from] ConfigError),
    #[error("No input files could be ingested")]
    NothingIngested,
}

#[derive(Error, Debug, PartialEq)]
pub enum AnalysisError {
    #[error("Slope is undefined over a range spanning zero elapsed time")]
    DivisionUndefined,
    #[error("Analysis range contains no samples")]
    EmptyRange,
    #[error("Unknown variable '{0}'")]
    UnknownVariable(String),
}

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("CSV write failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error during export: {0}")]
    Io(#[from] io::Error),
    #[error("Nothing to export: {0}")]
    Analysis(#[from] AnalysisError),
}
