//! Error types for undbc

use std::sync::Arc;
use thiserror::Error;

use crate::dbd::Build;

/// Main error type for undbc operations
///
/// The enum is `Clone` so a decode session can yield its terminal error
/// through the iterator and still retain it for [`err`] inspection after the
/// loop; the io variant is wrapped in an `Arc` to keep that possible.
///
/// [`err`]: crate::dbc::DbcReader::err
#[derive(Error, Debug, Clone)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[source] Arc<std::io::Error>),

    #[error("schema syntax error at line {line}: {reason}")]
    SchemaSyntax { line: usize, reason: String },

    #[error("invalid build format: {0:?} (expected four dotted components, e.g. \"1.12.1.5875\")")]
    InvalidBuildFormat(String),

    #[error("no layout definition matches build {0}")]
    LayoutNotFound(Build),

    #[error("bad magic: expected \"WDBC\", found {found:02X?}")]
    BadMagic { found: [u8; 4] },

    #[error("truncated stream: {section} needs {needed} bytes, got {got}")]
    TruncatedStream {
        section: &'static str,
        needed: u64,
        got: u64,
    },

    #[error("record {record}, field {column:?}: width of {bits} bits exceeds storage unit capacity")]
    FieldWidthOverflow {
        record: usize,
        column: String,
        bits: u32,
    },

    #[error("record {record}, field {column:?}: string offset {offset} invalid for a {block_len} byte string block")]
    InvalidStringOffset {
        record: usize,
        column: String,
        offset: u32,
        block_len: usize,
    },

    #[error("record {record}: consumed {consumed} bytes, record width is {expected}")]
    RecordWidthMismatch {
        record: usize,
        expected: u32,
        consumed: u32,
    },
}

impl Error {
    /// Stamps the failing record index (and column name, where one applies)
    /// onto a decode error raised below the layer that knows them.
    pub(crate) fn at_field(mut self, index: usize, name: &str) -> Self {
        match &mut self {
            Error::FieldWidthOverflow { record, column, .. }
            | Error::InvalidStringOffset { record, column, .. } => {
                *record = index;
                if column.is_empty() {
                    *column = name.to_string();
                }
            }
            Error::RecordWidthMismatch { record, .. } => *record = index,
            _ => {}
        }
        self
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(Arc::new(err))
    }
}

/// Result type alias for undbc operations
pub type Result<T> = std::result::Result<T, Error>;
