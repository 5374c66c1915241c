use thiserror::Error;

#[derive(Debug, Error)]
pub enum DataError {
    /// A record field exists but cannot be read as a number.
    #[error("field {field:?} is not numeric: {value:?}")]
    Coercion { field: String, value: String },

    #[error("parse error: {0}")]
    Parse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type DataResult<T> = Result<T, DataError>;
