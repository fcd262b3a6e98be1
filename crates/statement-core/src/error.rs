//! Error type shared by every stage of the statement pipeline.

use std::path::PathBuf;

use thiserror::Error;

/// Coarse classification reported at the HTTP/CLI boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// No spreadsheet or metadata record is available.
    NotFound,
    /// The input exists but lacks the expected structure.
    MalformedInput,
    /// Reading or writing persisted files or the output stream failed.
    Io,
}

#[derive(Debug, Error)]
pub enum StatementError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error("unsupported spreadsheet format: {}", .0.display())]
    UnsupportedFormat(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("spreadsheet error: {0}")]
    Spreadsheet(#[from] calamine::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("metadata record error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("PDF encoding error: {0}")]
    Pdf(#[from] lopdf::Error),
}

impl StatementError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StatementError::NotFound(_) => ErrorKind::NotFound,
            StatementError::MalformedInput(_)
            | StatementError::UnsupportedFormat(_)
            | StatementError::Spreadsheet(_)
            | StatementError::Csv(_)
            | StatementError::Json(_) => ErrorKind::MalformedInput,
            StatementError::Io(_) | StatementError::Pdf(_) => ErrorKind::Io,
        }
    }
}

impl From<tempfile::PersistError> for StatementError {
    fn from(err: tempfile::PersistError) -> Self {
        StatementError::Io(err.error)
    }
}

pub type Result<T> = std::result::Result<T, StatementError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds() {
        assert_eq!(StatementError::NotFound("x".into()).kind(), ErrorKind::NotFound);
        assert_eq!(
            StatementError::MalformedInput("no worksheets".into()).kind(),
            ErrorKind::MalformedInput
        );
        assert_eq!(
            StatementError::UnsupportedFormat("a.pages".into()).kind(),
            ErrorKind::MalformedInput
        );
        let io = std::io::Error::other("disk full");
        assert_eq!(StatementError::from(io).kind(), ErrorKind::Io);
    }
}
