use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Source directory does not exist or is not readable: {}", .0.display())]
    SourceMissing(PathBuf),

    #[error("Invalid date format pattern {pattern:?}")]
    InvalidFormat { pattern: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("ExifTool error: {0}")]
    ExifTool(String),

    #[error("Run was not confirmed; no files were touched")]
    NotConfirmed,
}

pub type Result<T> = std::result::Result<T, Error>;
