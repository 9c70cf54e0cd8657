use std::io;
use std::result;

use csv;
use rayon;
use regex;
use serde_json;
use thiserror::Error;

pub type Result<T> = result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid pattern: {0}")]
    Regex(#[from] regex::Error),

    #[error("failed to start worker threads: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("invalid argument `{name}`: {reason}")]
    InvalidArgument { name: &'static str, reason: String },

    #[error("column `{0}` not found in the CSV header")]
    MissingColumn(String),

    #[error("no documents left after preprocessing")]
    EmptyCorpus,
}

impl Error {
    pub fn invalid_argument<S: Into<String>>(name: &'static str, reason: S) -> Error {
        Error::InvalidArgument { name: name, reason: reason.into() }
    }
}
