//! Delimited text codec for table files.
//!
//! Reads header-keyed rows lazily from a file in a configurable character
//! encoding, and writes typed rows back out for export.

pub mod encoding;
pub mod errors;
pub mod reader;
pub mod writer;

pub use encoding::{DEFAULT_ENCODING, resolve_encoding};
pub use errors::CodecError;
pub use reader::{TableReader, open_for_read};
pub use writer::{TableWriter, WriteSummary};

pub use encoding_rs::Encoding;
