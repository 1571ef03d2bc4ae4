//! Ipc file format.
//!
//! A file is the stream format wrapped in magic bytes, with a footer at the end
//! recording the schema and where each batch starts:
//!
//! `[ARROW1][pad to 8][stream messages][footer][i32 footer length][ARROW1]`
use std::io::Write;
use std::sync::Arc;

use bytes::Bytes;
use flatbuffers::FlatBufferBuilder;
use tessera_arrow_ipc::file::{root_as_footer, Block, FooterBuilder};
use tessera_arrow_ipc::message::MessageHeader;
use tessera_arrow_ipc::schema::MetadataVersion;
use tessera_error::{not_implemented, ErrorKind, Result, TesseraError};
use tracing::debug;

use super::batch::ipc_to_batch;
use super::message::{corrupt, decode_message, padding_len, split_encapsulated_header};
use super::reader::unsupported_message;
use super::schema::{ipc_to_schema, schema_to_ipc};
use super::writer::StreamWriter;
use super::{IpcConfig, ARROW_MAGIC};
use crate::batch::Batch;
use crate::buffer::Buffer;
use crate::field::Schema;

/// Length of the leading magic plus padding.
const HEADER_LEN: usize = ARROW_MAGIC.len() + padding_len(ARROW_MAGIC.len());

/// Length of the footer length plus trailing magic.
const TRAILER_LEN: usize = 4 + ARROW_MAGIC.len();

/// Writes the ipc file format.
#[derive(Debug)]
pub struct FileWriter<W: Write> {
    stream: StreamWriter<W>,
    blocks: Vec<Block>,
}

impl<W: Write> FileWriter<W> {
    /// Create a new file writer, writing the leading magic bytes.
    pub fn try_new(mut writer: W, conf: &IpcConfig) -> Result<Self> {
        writer.write_all(&ARROW_MAGIC)?;
        writer.write_all(&[0; HEADER_LEN - ARROW_MAGIC.len()])?;

        Ok(FileWriter {
            stream: StreamWriter::with_position(writer, conf, HEADER_LEN),
            blocks: Vec::new(),
        })
    }

    pub fn write_schema(&mut self, schema: &Schema) -> Result<()> {
        self.stream.write_schema(schema)
    }

    pub fn write_batch(&mut self, batch: &Batch) -> Result<()> {
        let block = self.stream.write_batch_block(batch)?;
        self.blocks.push(block);
        Ok(())
    }

    /// Write the end-of-stream marker, footer and trailing magic.
    pub fn finish(&mut self) -> Result<()> {
        if self.stream.is_closed() {
            return Err(TesseraError::of_kind(
                ErrorKind::WriterClosed,
                "Write attempted after file closed",
            ));
        }
        let schema = match self.stream.schema() {
            Some(schema) => schema.clone(),
            None => {
                return Err(TesseraError::of_kind(
                    ErrorKind::UnexpectedMessage,
                    "File closed before schema was written",
                ))
            }
        };

        self.stream.finish()?;

        let mut fbb = FlatBufferBuilder::new();
        let schema_ipc = schema_to_ipc(&mut fbb, &schema)?;
        let blocks = fbb.create_vector(&self.blocks);

        let mut footer = FooterBuilder::new(&mut fbb);
        footer.add_version(MetadataVersion::V5);
        footer.add_schema(schema_ipc);
        footer.add_recordBatches(blocks);
        let footer = footer.finish();
        fbb.finish(footer, None);

        let footer_bytes = fbb.finished_data();
        let footer_len = i32::try_from(footer_bytes.len()).map_err(|_| {
            TesseraError::of_kind(ErrorKind::Encoding, "File footer too large")
        })?;

        let writer = self.stream.get_mut();
        writer.write_all(footer_bytes)?;
        writer.write_all(&footer_len.to_le_bytes())?;
        writer.write_all(&ARROW_MAGIC)?;
        writer.flush()?;

        debug!(num_batches = self.blocks.len(), "closed ipc file");

        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.stream.into_inner()
    }
}

/// Random access reader over a complete ipc file held in memory.
///
/// Batch buffers are zero-copy slices of the file bytes.
#[derive(Debug)]
pub struct FileReader {
    data: Bytes,
    schema: Arc<Schema>,
    blocks: Vec<Block>,
    conf: IpcConfig,
}

impl FileReader {
    /// Validate the magic bytes and read the footer.
    pub fn try_new(data: Bytes, conf: &IpcConfig) -> Result<Self> {
        if data.len() < HEADER_LEN + TRAILER_LEN {
            return Err(TesseraError::of_kind(
                ErrorKind::CorruptStream,
                format!("File too small to be an ipc file: {} bytes", data.len()),
            ));
        }
        if data[..ARROW_MAGIC.len()] != ARROW_MAGIC {
            return Err(corrupt("Missing leading ipc file magic"));
        }
        if data[data.len() - ARROW_MAGIC.len()..] != ARROW_MAGIC {
            return Err(corrupt("Missing trailing ipc file magic"));
        }

        let footer_end = data.len() - TRAILER_LEN;
        let mut raw_len = [0; 4];
        raw_len.copy_from_slice(&data[footer_end..footer_end + 4]);
        let footer_len = usize::try_from(i32::from_le_bytes(raw_len))
            .map_err(|_| corrupt("Negative footer length"))?;
        let footer_start = footer_end
            .checked_sub(footer_len)
            .filter(|start| *start >= HEADER_LEN)
            .ok_or_else(|| {
                TesseraError::of_kind(
                    ErrorKind::CorruptStream,
                    format!("Footer length {footer_len} out of range"),
                )
            })?;

        let (schema, blocks) = {
            let footer = root_as_footer(&data[footer_start..footer_end]).map_err(|e| {
                TesseraError::with_source("Invalid file footer flatbuffer", Box::new(e))
                    .with_kind(ErrorKind::CorruptStream)
            })?;

            match footer.version() {
                MetadataVersion::V4 | MetadataVersion::V5 => (),
                other => not_implemented!("ipc metadata version {other:?}"),
            }
            if footer.dictionaries().is_some_and(|d| d.len() > 0) {
                not_implemented!("ipc dictionary batches");
            }

            let schema = footer
                .schema()
                .ok_or_else(|| corrupt("File footer missing schema"))?;
            let blocks: Vec<Block> = footer
                .recordBatches()
                .map(|blocks| blocks.iter().copied().collect())
                .unwrap_or_default();

            (ipc_to_schema(schema)?, blocks)
        };

        debug!(num_batches = blocks.len(), "opened ipc file");

        Ok(FileReader {
            data,
            schema: Arc::new(schema),
            blocks,
            conf: conf.clone(),
        })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn num_batches(&self) -> usize {
        self.blocks.len()
    }

    /// Read the batch at `idx`.
    pub fn read_batch(&self, idx: usize) -> Result<Batch> {
        let block = self.blocks.get(idx).ok_or_else(|| {
            TesseraError::new(format!(
                "Batch index {idx} out of range, file has {} batches",
                self.blocks.len()
            ))
        })?;

        let offset =
            usize::try_from(block.offset()).map_err(|_| corrupt("Negative block offset"))?;
        let meta_len = usize::try_from(block.metaDataLength())
            .map_err(|_| corrupt("Negative block metadata length"))?;
        let body_len = usize::try_from(block.bodyLength())
            .map_err(|_| corrupt("Negative block body length"))?;

        let body_start = offset
            .checked_add(meta_len)
            .filter(|start| {
                start
                    .checked_add(body_len)
                    .is_some_and(|end| end <= self.data.len())
            })
            .ok_or_else(|| corrupt("Block extends past end of file"))?;

        let (header, prefix_and_header_len) =
            split_encapsulated_header(&self.data[offset..body_start])?;
        if prefix_and_header_len > meta_len {
            return Err(corrupt("Message header longer than block metadata"));
        }

        let message = decode_message(header)?;
        if message.header_type() != MessageHeader::RecordBatch {
            return Err(match message.header_type() {
                MessageHeader::Schema => TesseraError::of_kind(
                    ErrorKind::UnexpectedMessage,
                    "File block points at a schema message",
                ),
                other => unsupported_message(other),
            });
        }
        let ipc = message
            .header_as_record_batch()
            .ok_or_else(|| corrupt("Record batch message missing header"))?;

        let declared_body_len = usize::try_from(message.bodyLength())
            .ok()
            .filter(|len| *len <= body_len)
            .ok_or_else(|| corrupt("Message body length exceeds block"))?;

        let body = Buffer::from_bytes(
            self.data
                .slice(body_start..body_start + declared_body_len),
        );

        ipc_to_batch(ipc, &body, &self.schema, &self.conf)
    }
}
