// Error types for the fund store and the ingestion pipeline
//
// Every failure reaches the caller typed; nothing is retried or swallowed.

use thiserror::Error;
use uuid::Uuid;

/// Coarse classification used by presentation layers to pick a response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Decoding,
    MalformedRow,
    Validation,
    Store,
    NotFound,
}

/// A single field that failed validation or type coercion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Line in the uploaded file, when the value came from one
    pub line: Option<u64>,
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        ValidationError {
            line: None,
            field: field.to_string(),
            message: message.into(),
        }
    }

    pub fn at_line(mut self, line: Option<u64>) -> Self {
        self.line = line;
        self
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(line) = self.line {
            write!(f, "line {}: ", line)?;
        }
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Error)]
pub enum FundError {
    #[error("file is not valid UTF-8 text: {0}")]
    Decoding(#[from] std::str::Utf8Error),

    #[error("line {line}: expected {expected} fields, found {found}")]
    MalformedRow {
        line: u64,
        expected: usize,
        found: usize,
    },

    #[error("could not parse CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("invalid fund data: {0}")]
    Validation(#[from] ValidationError),

    #[error("a fund named '{0}' already exists")]
    DuplicateName(String),

    #[error("fund {0} not found")]
    NotFound(Uuid),

    #[error("storage error: {0}")]
    Store(#[from] rusqlite::Error),
}

impl FundError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FundError::Decoding(_) => ErrorKind::Decoding,
            FundError::MalformedRow { .. } | FundError::Csv(_) => ErrorKind::MalformedRow,
            FundError::Validation(_) => ErrorKind::Validation,
            FundError::DuplicateName(_) | FundError::Store(_) => ErrorKind::Store,
            FundError::NotFound(_) => ErrorKind::NotFound,
        }
    }
}
