//! Readers and writers for Arrow's ipc formats.
//!
//! The stream format is a schema message, any number of record batch
//! messages, then an end-of-stream marker. The file format wraps the same
//! messages in `ARROW1` magic bytes and adds a footer locating every batch.
//!
//! [`StreamWriter`], [`StreamReader`], [`FileWriter`] and [`FileReader`]
//! work incrementally. [`write_stream`], [`read_stream`], [`write_file`] and
//! [`read_file`] handle a whole stream or file at once, and the readers
//! return everything read before a failure in [`ReaderError`]. Every entry
//! point takes an [`IpcConfig`].
pub mod file;
pub mod reader;
pub mod writer;

mod batch;
mod message;
mod schema;

use std::fmt;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use bytes::Bytes;
use tessera_error::{Result, TesseraError};
use tracing::debug;

use crate::batch::Batch;
use crate::field::Schema;

use file::{FileReader, FileWriter};
use reader::StreamReader;
use writer::StreamWriter;

pub(crate) const CONTINUATION_MARKER: u32 = 0xFFFFFFFF;

/// Magic bytes at the start and end of an IPC file.
pub(crate) const ARROW_MAGIC: [u8; 6] = *b"ARROW1";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpcConfig {
    /// Require streams to end with an end-of-stream marker. If false, an EOF
    /// at a message boundary is treated as the end of the stream.
    pub require_end_of_stream: bool,

    /// Check that non-null values in utf8 columns are valid utf8 when
    /// reading.
    pub validate_utf8: bool,

    /// Largest message header we'll attempt to read.
    pub max_header_size: usize,
}

impl Default for IpcConfig {
    fn default() -> Self {
        IpcConfig {
            require_end_of_stream: true,
            validate_utf8: true,
            max_header_size: 64 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterKind {
    /// Only the schema is written.
    Schema,
    /// Schema followed by all batches.
    RecordBatch,
}

/// Everything needed to write a complete stream or file in one call.
#[derive(Debug, Clone, PartialEq)]
pub struct WriterInfo {
    pub kind: WriterKind,
    pub schema: Schema,
    pub batches: Vec<Batch>,
}

impl WriterInfo {
    pub fn schema_only(schema: Schema) -> Self {
        WriterInfo {
            kind: WriterKind::Schema,
            schema,
            batches: Vec::new(),
        }
    }

    pub fn record_batches(schema: Schema, batches: Vec<Batch>) -> Self {
        WriterInfo {
            kind: WriterKind::RecordBatch,
            schema,
            batches,
        }
    }
}

/// A fully read stream or file.
#[derive(Debug, Clone, PartialEq)]
pub struct ReaderResult {
    pub schema: Schema,
    pub batches: Vec<Batch>,
}

/// A failed read, along with everything successfully read before the
/// failure.
#[derive(Debug)]
pub struct ReaderError {
    pub error: TesseraError,
    /// Schema, if it was read before the error.
    pub schema: Option<Schema>,
    /// Batches read before the error.
    pub batches: Vec<Batch>,
}

impl ReaderError {
    fn new(error: TesseraError) -> Self {
        ReaderError {
            error,
            schema: None,
            batches: Vec::new(),
        }
    }
}

impl fmt::Display for ReaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (after {} batches)", self.error, self.batches.len())
    }
}

impl std::error::Error for ReaderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

impl From<ReaderError> for TesseraError {
    fn from(value: ReaderError) -> Self {
        value.error
    }
}

/// Write a complete stream to a byte vector.
pub fn write_stream(info: &WriterInfo, conf: &IpcConfig) -> Result<Vec<u8>> {
    let mut writer = StreamWriter::new(Vec::new(), conf);
    writer.write_schema(&info.schema)?;
    if info.kind == WriterKind::RecordBatch {
        for batch in &info.batches {
            writer.write_batch(batch)?;
        }
    }
    writer.finish()?;

    Ok(writer.into_inner())
}

/// Write a complete file to `path`, truncating any existing file.
pub fn write_file(path: impl AsRef<Path>, info: &WriterInfo, conf: &IpcConfig) -> Result<()> {
    let path = path.as_ref();
    debug!(path = %path.display(), "writing ipc file");

    let file = File::create(path)?;
    let mut writer = FileWriter::try_new(BufWriter::new(file), conf)?;
    writer.write_schema(&info.schema)?;
    if info.kind == WriterKind::RecordBatch {
        for batch in &info.batches {
            writer.write_batch(batch)?;
        }
    }
    writer.finish()?;

    Ok(())
}

/// Read a complete stream.
///
/// On failure, the error carries the schema and batches read so far.
pub fn read_stream(data: &[u8], conf: &IpcConfig) -> Result<ReaderResult, ReaderError> {
    let mut reader = StreamReader::try_new(data, conf).map_err(ReaderError::new)?;

    let mut batches = Vec::new();
    loop {
        match reader.try_next_batch() {
            Ok(Some(batch)) => batches.push(batch),
            Ok(None) => break,
            Err(error) => {
                return Err(ReaderError {
                    error,
                    schema: Some(reader.schema().clone()),
                    batches,
                })
            }
        }
    }

    Ok(ReaderResult {
        schema: reader.schema().clone(),
        batches,
    })
}

/// Read a complete file.
///
/// On failure, the error carries the schema and batches read so far.
pub fn read_file(path: impl AsRef<Path>, conf: &IpcConfig) -> Result<ReaderResult, ReaderError> {
    let path = path.as_ref();
    debug!(path = %path.display(), "reading ipc file");

    let data = std::fs::read(path).map_err(|e| ReaderError::new(e.into()))?;
    let reader = FileReader::try_new(Bytes::from(data), conf).map_err(ReaderError::new)?;

    let mut batches = Vec::with_capacity(reader.num_batches());
    for idx in 0..reader.num_batches() {
        match reader.read_batch(idx) {
            Ok(batch) => batches.push(batch),
            Err(error) => {
                return Err(ReaderError {
                    error,
                    schema: Some(reader.schema().clone()),
                    batches,
                })
            }
        }
    }

    Ok(ReaderResult {
        schema: reader.schema().clone(),
        batches,
    })
}
