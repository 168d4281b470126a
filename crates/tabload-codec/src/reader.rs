use std::collections::HashSet;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use csv::{ByteRecord, Reader, ReaderBuilder};
use encoding_rs::Encoding;
use tabload_core::RawRow;

use crate::errors::CodecError;

const UTF8_BOM: char = '\u{feff}';

/// Forward-only reader over the data rows of one delimited text file.
///
/// The file handle is owned by the reader and released when the reader is
/// dropped, whether or not every row was consumed.
pub struct TableReader {
    path: PathBuf,
    header: Arc<[String]>,
    records: Reader<File>,
    encoding: &'static Encoding,
    record: ByteRecord,
    finished: bool,
}

/// Open `path` and read its header line.
pub fn open_for_read(path: &Path, encoding: &'static Encoding) -> Result<TableReader, CodecError> {
    let file = File::open(path)?;
    let mut records = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(file);

    let mut record = ByteRecord::new();
    if !records.read_byte_record(&mut record)? {
        return Err(CodecError::InvalidHeader(format!(
            "{} has no header row",
            path.display()
        )));
    }

    let mut header = decode_record(&record, encoding)?;
    if let Some(first) = header.first_mut() {
        if let Some(stripped) = first.strip_prefix(UTF8_BOM) {
            *first = stripped.to_string();
        }
    }
    validate_header(&header)?;

    Ok(TableReader {
        path: path.to_path_buf(),
        header: header.into(),
        records,
        encoding,
        record,
        finished: false,
    })
}

fn validate_header(header: &[String]) -> Result<(), CodecError> {
    let mut seen = HashSet::with_capacity(header.len());
    for (idx, name) in header.iter().enumerate() {
        if name.trim().is_empty() {
            return Err(CodecError::InvalidHeader(format!(
                "column {} has an empty name",
                idx + 1
            )));
        }
        if !seen.insert(name.to_lowercase()) {
            return Err(CodecError::InvalidHeader(format!(
                "duplicate column name '{name}'"
            )));
        }
    }
    Ok(())
}

fn decode_record(
    record: &ByteRecord,
    encoding: &'static Encoding,
) -> Result<Vec<String>, CodecError> {
    let line = record.position().map(|pos| pos.line()).unwrap_or(0);
    record
        .iter()
        .enumerate()
        .map(|(idx, field)| {
            encoding
                .decode_without_bom_handling_and_without_replacement(field)
                .map(|text| text.into_owned())
                .ok_or(CodecError::Decode {
                    line,
                    field: idx + 1,
                    encoding: encoding.name(),
                })
        })
        .collect()
}

impl TableReader {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    /// Release the file handle without reading further rows.
    pub fn close(self) {}

    fn decode_row(&self) -> Result<RawRow, CodecError> {
        if self.record.len() > self.header.len() {
            return Err(CodecError::Malformed {
                line: self.record.position().map(|pos| pos.line()).unwrap_or(0),
                message: format!(
                    "record has {} fields but the header has {}",
                    self.record.len(),
                    self.header.len()
                ),
            });
        }

        let values = decode_record(&self.record, self.encoding)?
            .into_iter()
            .map(Some)
            .collect();
        Ok(RawRow::new(Arc::clone(&self.header), values))
    }
}

impl Iterator for TableReader {
    type Item = Result<RawRow, CodecError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        match self.records.read_byte_record(&mut self.record) {
            Ok(true) => Some(self.decode_row()),
            Ok(false) => {
                self.finished = true;
                None
            }
            Err(err) => {
                let err = CodecError::from(err);
                if err.is_fatal() {
                    self.finished = true;
                }
                Some(Err(err))
            }
        }
    }
}

impl std::fmt::Debug for TableReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableReader")
            .field("path", &self.path)
            .field("header", &self.header)
            .field("encoding", &self.encoding.name())
            .finish()
    }
}
