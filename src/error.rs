use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Required columns are absent from a loaded source.
    #[error("{kind} dataset missing columns: {}", .missing.join(", "))]
    Schema {
        kind: &'static str,
        missing: Vec<String>,
    },
    /// Raised by the strict dataset selection only.
    #[error("query contains unknown tags: {}", .0.join(", "))]
    UnknownTags(Vec<String>),
    #[error("invalid configuration: {0}")]
    Configuration(String),
    #[error("file {} already exists", .0.display())]
    FileExists(PathBuf),
    #[error("can not decode column '{column}' value {value:?}: {reason}")]
    Decode {
        column: String,
        value: String,
        reason: String,
    },
    #[error("unknown column '{0}'")]
    UnknownColumn(String),
    #[error("malformed frame: {0}")]
    Shape(String),
    #[error("index {index} is out of range for {len} rows")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("unsupported dump format '{0}'")]
    UnsupportedFormat(String),
    #[error("can not find tags and posts dumps in {}", .0.display())]
    DumpNotFound(PathBuf),
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
    #[error(transparent)]
    Parquet(#[from] parquet::errors::ParquetError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Regex(#[from] regex::Error),
}

impl Error {
    pub(crate) fn decode(column: &str, value: &str, reason: impl ToString) -> Self {
        Error::Decode {
            column: column.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
