//! Errors raised while building, parsing or reshaping containers.

/// Errors that can occur in container operations and codecs.
#[derive(Debug, thiserror::Error)]
pub enum ContainerError {
    /// A text line could not be parsed.
    #[error("parse error at line {line}: {message}")]
    Parse {
        /// One-based line number in the source.
        line: usize,
        /// What was wrong with the line.
        message: String,
    },

    /// A row had a different number of columns than the table.
    #[error("column mismatch: expected {expected} columns, found {found}")]
    ColumnMismatch {
        /// Column count fixed by the container.
        expected: usize,
        /// Column count of the offending row.
        found: usize,
    },

    /// A region or increment does not describe a non-empty lattice.
    #[error("invalid region: {0}")]
    InvalidRegion(String),

    /// The payload length does not match the declared shape.
    #[error("shape mismatch: expected {expected} elements, found {found}")]
    ShapeMismatch {
        /// Element count implied by the header.
        expected: usize,
        /// Element count actually present.
        found: usize,
    },

    /// A payload could not be allocated.
    #[error("allocation failed: {0}")]
    Memory(#[from] std::collections::TryReserveError),

    /// A raster header line was not valid JSON.
    #[error("header error: {0}")]
    Header(#[from] serde_json::Error),

    /// The underlying reader or writer failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl ContainerError {
    pub(crate) fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            line,
            message: message.into(),
        }
    }
}
