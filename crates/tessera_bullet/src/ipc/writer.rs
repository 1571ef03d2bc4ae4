use std::io::Write;
use std::sync::Arc;

use flatbuffers::{FlatBufferBuilder, UnionWIPOffset, WIPOffset};
use tessera_arrow_ipc::file::Block;
use tessera_arrow_ipc::message::{MessageBuilder, MessageHeader};
use tessera_arrow_ipc::schema::MetadataVersion;
use tessera_error::{ErrorKind, Result, TesseraError};
use tracing::{debug, trace};

use super::batch::batch_to_ipc;
use super::message::{write_encapsulated, write_end_of_stream};
use super::schema::schema_to_ipc;
use super::IpcConfig;
use crate::batch::{check_field_nulls, Batch};
use crate::field::Schema;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriterState {
    Init,
    SchemaWritten,
    BatchWritten,
    Closed,
}

/// Writes the ipc streaming format.
///
/// A schema must be written first, followed by any number of batches
/// conforming to that schema. `finish` writes the end-of-stream marker.
#[derive(Debug)]
pub struct StreamWriter<W: Write> {
    writer: W,
    state: WriterState,
    schema: Option<Arc<Schema>>,
    conf: IpcConfig,
    /// Bytes written so far, including anything written before this writer
    /// was created.
    position: usize,
}

impl<W: Write> StreamWriter<W> {
    pub fn new(writer: W, conf: &IpcConfig) -> Self {
        Self::with_position(writer, conf, 0)
    }

    pub(crate) fn with_position(writer: W, conf: &IpcConfig, position: usize) -> Self {
        StreamWriter {
            writer,
            state: WriterState::Init,
            schema: None,
            conf: conf.clone(),
            position,
        }
    }

    /// Schema this writer was opened with, if written.
    pub fn schema(&self) -> Option<&Schema> {
        self.schema.as_deref()
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn is_closed(&self) -> bool {
        self.state == WriterState::Closed
    }

    pub fn write_schema(&mut self, schema: &Schema) -> Result<()> {
        match self.state {
            WriterState::Init => (),
            WriterState::Closed => return Err(writer_closed()),
            WriterState::SchemaWritten | WriterState::BatchWritten => {
                return Err(TesseraError::of_kind(
                    ErrorKind::UnexpectedMessage,
                    "Schema already written to stream",
                ))
            }
        }

        let mut fbb = FlatBufferBuilder::new();
        let header = schema_to_ipc(&mut fbb, schema)?.as_union_value();
        self.write_message(&mut fbb, MessageHeader::Schema, header, &[])?;

        debug!(num_fields = schema.num_fields(), "wrote ipc schema");

        self.schema = Some(Arc::new(schema.clone()));
        self.state = WriterState::SchemaWritten;

        Ok(())
    }

    pub fn write_batch(&mut self, batch: &Batch) -> Result<()> {
        self.write_batch_block(batch)?;
        Ok(())
    }

    /// Write a batch, returning where it was written.
    pub(crate) fn write_batch_block(&mut self, batch: &Batch) -> Result<Block> {
        if self.state == WriterState::Closed {
            return Err(writer_closed());
        }
        let schema = match &self.schema {
            Some(schema) => schema.clone(),
            None => {
                return Err(TesseraError::of_kind(
                    ErrorKind::UnexpectedMessage,
                    "Batch written before schema",
                ))
            }
        };
        check_batch_conforms(&schema, batch)?;

        let mut fbb = FlatBufferBuilder::new();
        let (header, body) = batch_to_ipc(&mut fbb, batch)?;
        let block = self.write_message(
            &mut fbb,
            MessageHeader::RecordBatch,
            header.as_union_value(),
            &body,
        )?;

        self.state = WriterState::BatchWritten;

        Ok(block)
    }

    /// Write the end-of-stream marker and flush.
    pub fn finish(&mut self) -> Result<()> {
        if self.state == WriterState::Closed {
            return Err(writer_closed());
        }

        write_end_of_stream(&mut self.writer)?;
        self.position += 8;
        self.writer.flush()?;
        self.state = WriterState::Closed;

        debug!(bytes = self.position, "closed ipc stream");

        Ok(())
    }

    pub(crate) fn get_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_message(
        &mut self,
        fbb: &mut FlatBufferBuilder<'_>,
        header_type: MessageHeader,
        header: WIPOffset<UnionWIPOffset>,
        body: &[u8],
    ) -> Result<Block> {
        let body_len = to_i64(body.len())?;

        let mut message = MessageBuilder::new(fbb);
        message.add_version(MetadataVersion::V5);
        message.add_header_type(header_type);
        message.add_header(header);
        message.add_bodyLength(body_len);
        let message = message.finish();
        fbb.finish(message, None);

        let header_bytes = fbb.finished_data();
        if header_bytes.len() > self.conf.max_header_size {
            return Err(TesseraError::of_kind(
                ErrorKind::Encoding,
                format!(
                    "Message header of {} bytes exceeds maximum of {}",
                    header_bytes.len(),
                    self.conf.max_header_size
                ),
            ));
        }

        let offset = self.position;
        let meta_len = write_encapsulated(&mut self.writer, header_bytes, body)?;
        self.position += meta_len + body.len();

        trace!(?header_type, offset, meta_len, body_len, "wrote ipc message");

        let meta_len = i32::try_from(meta_len).map_err(|_| {
            TesseraError::of_kind(ErrorKind::Encoding, "Message metadata too large")
        })?;

        Ok(Block::new(to_i64(offset)?, meta_len, body_len))
    }
}

fn writer_closed() -> TesseraError {
    TesseraError::of_kind(ErrorKind::WriterClosed, "Write attempted after stream closed")
}

fn to_i64(v: usize) -> Result<i64> {
    i64::try_from(v)
        .map_err(|_| TesseraError::of_kind(ErrorKind::Encoding, format!("Length {v} too large")))
}

/// Check a batch can be written under the stream's schema.
fn check_batch_conforms(schema: &Schema, batch: &Batch) -> Result<()> {
    if schema.num_fields() != batch.num_columns() {
        return Err(TesseraError::of_kind(
            ErrorKind::SchemaViolation,
            format!(
                "Stream schema has {} fields, batch has {} columns",
                schema.num_fields(),
                batch.num_columns()
            ),
        ));
    }

    for (field, col) in schema.iter().zip(batch.columns()) {
        if !col.datatype().is_assignable_to(&field.datatype) {
            return Err(TesseraError::of_kind(
                ErrorKind::TypeMismatch,
                format!(
                    "Column of type {} not assignable to stream field '{}' of type {}",
                    col.datatype(),
                    field.name,
                    field.datatype
                ),
            ));
        }
        check_field_nulls(field, col)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::Array;
    use crate::datatype::DataType;
    use crate::field::Field;

    fn schema() -> Schema {
        Schema::new([Field::new("a", DataType::Int32, false)])
    }

    fn batch() -> Batch {
        Batch::try_new(schema(), vec![Array::from_iter([1i32, 2, 3])]).unwrap()
    }

    #[test]
    fn messages_are_aligned() {
        let mut writer = StreamWriter::new(Vec::new(), &IpcConfig::default());
        writer.write_schema(&schema()).unwrap();
        assert_eq!(0, writer.position() % 8);

        let block = writer.write_batch_block(&batch()).unwrap();
        assert_eq!(0, block.offset() % 8);
        assert_eq!(0, block.metaDataLength() % 8);
        assert_eq!(0, block.bodyLength() % 8);

        writer.finish().unwrap();
        let out = writer.into_inner();
        assert_eq!(0, out.len() % 8);
        assert_eq!(&[0xff, 0xff, 0xff, 0xff, 0, 0, 0, 0], &out[out.len() - 8..]);
    }

    #[test]
    fn batch_before_schema() {
        let mut writer = StreamWriter::new(Vec::new(), &IpcConfig::default());
        let err = writer.write_batch(&batch()).unwrap_err();
        assert_eq!(ErrorKind::UnexpectedMessage, err.kind());
        assert!(writer.into_inner().is_empty());
    }

    #[test]
    fn schema_twice() {
        let mut writer = StreamWriter::new(Vec::new(), &IpcConfig::default());
        writer.write_schema(&schema()).unwrap();
        let err = writer.write_schema(&schema()).unwrap_err();
        assert_eq!(ErrorKind::UnexpectedMessage, err.kind());
    }

    #[test]
    fn write_after_close() {
        let mut writer = StreamWriter::new(Vec::new(), &IpcConfig::default());
        writer.write_schema(&schema()).unwrap();
        writer.finish().unwrap();
        assert!(writer.is_closed());

        assert_eq!(
            ErrorKind::WriterClosed,
            writer.write_batch(&batch()).unwrap_err().kind()
        );
        assert_eq!(
            ErrorKind::WriterClosed,
            writer.write_schema(&schema()).unwrap_err().kind()
        );
        assert_eq!(ErrorKind::WriterClosed, writer.finish().unwrap_err().kind());
    }

    #[test]
    fn batch_not_matching_schema() {
        let mut writer = StreamWriter::new(Vec::new(), &IpcConfig::default());
        writer.write_schema(&schema()).unwrap();

        let wrong_type = Batch::try_new(
            Schema::new([Field::new("a", DataType::Boolean, false)]),
            vec![Array::from_iter([true, false])],
        )
        .unwrap();
        let err = writer.write_batch(&wrong_type).unwrap_err();
        assert_eq!(ErrorKind::TypeMismatch, err.kind());

        let wrong_arity = Batch::try_new(Schema::empty(), Vec::new()).unwrap();
        let err = writer.write_batch(&wrong_arity).unwrap_err();
        assert_eq!(ErrorKind::SchemaViolation, err.kind());
    }

    #[test]
    fn header_larger_than_max() {
        let conf = IpcConfig {
            max_header_size: 16,
            ..Default::default()
        };
        let mut writer = StreamWriter::new(Vec::new(), &conf);
        let err = writer.write_schema(&schema()).unwrap_err();
        assert_eq!(ErrorKind::Encoding, err.kind());
    }
}
