use thiserror::Error;

/// Errors raised while reading or writing delimited text.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("line {line}: {message}")]
    Malformed { line: u64, message: String },
    #[error("line {line}: field {field} is not valid {encoding}")]
    Decode {
        line: u64,
        field: usize,
        encoding: &'static str,
    },
    #[error("value in column '{column}' cannot be represented in {encoding}")]
    Unencodable {
        column: String,
        encoding: &'static str,
    },
    #[error("unknown encoding: {0}")]
    UnknownEncoding(String),
    #[error("encoding {0} cannot be used for delimited text")]
    UnsupportedEncoding(&'static str),
    #[error("invalid header: {0}")]
    InvalidHeader(String),
}

impl CodecError {
    /// True when the underlying stream is unusable and reading must stop.
    pub fn is_fatal(&self) -> bool {
        match self {
            CodecError::Io(_) => true,
            CodecError::Csv(err) => err.is_io_error(),
            _ => false,
        }
    }
}
