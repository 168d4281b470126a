use std::borrow::Cow;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use encoding_rs::Encoding;
use tabload_core::TypedValue;

use crate::errors::CodecError;

/// Totals reported once a file is complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WriteSummary {
    pub rows: u64,
    pub bytes: u64,
}

/// Writes a header line and typed rows as delimited text.
pub struct TableWriter<W: Write> {
    writer: csv::Writer<CountingWriter<W>>,
    encoding: &'static Encoding,
    header: Vec<String>,
    rows: u64,
}

impl TableWriter<BufWriter<File>> {
    /// Create (or truncate) `path` for writing.
    pub fn create(path: &Path, encoding: &'static Encoding) -> Result<Self, CodecError> {
        let file = File::create(path)?;
        Ok(Self::from_writer(BufWriter::new(file), encoding))
    }
}

impl<W: Write> TableWriter<W> {
    pub fn from_writer(inner: W, encoding: &'static Encoding) -> Self {
        let writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(CountingWriter::new(inner));
        Self {
            writer,
            encoding,
            header: Vec::new(),
            rows: 0,
        }
    }

    pub fn write_header(&mut self, header: &[String]) -> Result<(), CodecError> {
        let fields = header
            .iter()
            .map(|name| encode(self.encoding, name, name))
            .collect::<Result<Vec<_>, _>>()?;
        self.writer.write_record(&fields)?;
        self.header = header.to_vec();
        Ok(())
    }

    /// Write one row; nulls become empty fields.
    pub fn write_row(&mut self, values: &[TypedValue]) -> Result<(), CodecError> {
        let mut fields = Vec::with_capacity(values.len());
        for (idx, value) in values.iter().enumerate() {
            let column = self.header.get(idx).map(String::as_str).unwrap_or("?");
            let text = value.render();
            fields.push(encode(self.encoding, column, &text)?.into_owned());
        }
        self.writer.write_record(&fields)?;
        self.rows += 1;
        Ok(())
    }

    /// Flush buffered output and report totals.
    pub fn finish(mut self) -> Result<WriteSummary, CodecError> {
        self.writer.flush()?;
        let mut counting = self.writer.into_inner().map_err(|err| err.into_error())?;
        counting.flush()?;
        Ok(WriteSummary {
            rows: self.rows,
            bytes: counting.bytes_written(),
        })
    }
}

fn encode<'a>(
    encoding: &'static Encoding,
    column: &str,
    text: &'a str,
) -> Result<Cow<'a, [u8]>, CodecError> {
    let (bytes, _, had_errors) = encoding.encode(text);
    if had_errors {
        return Err(CodecError::Unencodable {
            column: column.to_string(),
            encoding: encoding.name(),
        });
    }
    Ok(bytes)
}

struct CountingWriter<W: Write> {
    inner: W,
    bytes: u64,
}

impl<W: Write> CountingWriter<W> {
    fn new(inner: W) -> Self {
        Self { inner, bytes: 0 }
    }

    fn bytes_written(&self) -> u64 {
        self.bytes
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let size = self.inner.write(buf)?;
        self.bytes = self.bytes.saturating_add(size as u64);
        Ok(size)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}
