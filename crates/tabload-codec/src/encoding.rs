use encoding_rs::Encoding;

use crate::errors::CodecError;

pub const DEFAULT_ENCODING: &str = "utf-8";

/// Resolve a WHATWG encoding label such as `utf-8`, `gbk` or `windows-1252`.
///
/// Encodings that are not ASCII-compatible (UTF-16, ISO-2022-JP) are rejected
/// because delimiters and quotes are matched on raw bytes.
pub fn resolve_encoding(label: &str) -> Result<&'static Encoding, CodecError> {
    let encoding = Encoding::for_label(label.trim().as_bytes())
        .ok_or_else(|| CodecError::UnknownEncoding(label.to_string()))?;

    if !encoding.is_ascii_compatible() {
        return Err(CodecError::UnsupportedEncoding(encoding.name()));
    }

    Ok(encoding)
}
