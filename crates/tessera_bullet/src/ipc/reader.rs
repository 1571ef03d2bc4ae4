use std::io::Read;
use std::sync::Arc;

use tessera_arrow_ipc::message::MessageHeader;
use tessera_error::{ErrorKind, Result, TesseraError};
use tracing::{debug, trace, warn};

use super::batch::ipc_to_batch;
use super::message::{corrupt, decode_message, read_body, read_encapsulated_header, HeaderRead};
use super::schema::ipc_to_schema;
use super::IpcConfig;
use crate::batch::Batch;
use crate::buffer::Buffer;
use crate::field::Schema;

/// Reads the ipc streaming format.
#[derive(Debug)]
pub struct StreamReader<R: Read> {
    reader: R,
    /// Header bytes of the message being read.
    buf: Vec<u8>,
    schema: Arc<Schema>,
    conf: IpcConfig,
    /// Set once the end of stream is reached or a read fails.
    done: bool,
}

impl<R: Read> StreamReader<R> {
    /// Try to create a new stream reader.
    ///
    /// This will attempt to read the first message as a schema. Every message
    /// afterwards is expected to be a batch with that schema.
    pub fn try_new(mut reader: R, conf: &IpcConfig) -> Result<Self> {
        let mut buf = Vec::new();
        match read_encapsulated_header(&mut reader, &mut buf, conf)? {
            HeaderRead::Message => (),
            HeaderRead::EndOfStream | HeaderRead::Eof => {
                return Err(corrupt("Stream ended before schema message"))
            }
        }

        let (schema, body_len) = {
            let message = decode_message(&buf)?;
            match message.header_type() {
                MessageHeader::Schema => (),
                MessageHeader::RecordBatch => {
                    return Err(TesseraError::of_kind(
                        ErrorKind::UnexpectedMessage,
                        "Record batch message before schema",
                    ))
                }
                other => return Err(unsupported_message(other)),
            }
            let ipc = message
                .header_as_schema()
                .ok_or_else(|| corrupt("Schema message missing header"))?;
            (ipc_to_schema(ipc)?, message.bodyLength())
        };

        // Schema messages don't carry a body, but skip one if present.
        read_body(&mut reader, body_len)?;

        debug!(num_fields = schema.num_fields(), "read ipc schema");

        Ok(StreamReader {
            reader,
            buf,
            schema: Arc::new(schema),
            conf: conf.clone(),
            done: false,
        })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Read the next batch, returning None at the end of the stream.
    ///
    /// After an error every subsequent call returns None.
    pub fn try_next_batch(&mut self) -> Result<Option<Batch>> {
        if self.done {
            return Ok(None);
        }

        let result = self.read_next_batch();
        if !matches!(result, Ok(Some(_))) {
            self.done = true;
        }

        result
    }

    fn read_next_batch(&mut self) -> Result<Option<Batch>> {
        match read_encapsulated_header(&mut self.reader, &mut self.buf, &self.conf)? {
            HeaderRead::Message => (),
            HeaderRead::EndOfStream => {
                debug!("reached ipc end of stream");
                return Ok(None);
            }
            HeaderRead::Eof => {
                if self.conf.require_end_of_stream {
                    return Err(corrupt("Stream ended without end-of-stream marker"));
                }
                warn!("ipc stream ended without end-of-stream marker");
                return Ok(None);
            }
        }

        let message = decode_message(&self.buf)?;
        match message.header_type() {
            MessageHeader::RecordBatch => (),
            MessageHeader::Schema => {
                return Err(TesseraError::of_kind(
                    ErrorKind::UnexpectedMessage,
                    "Schema message after stream schema",
                ))
            }
            other => return Err(unsupported_message(other)),
        }
        let ipc = message
            .header_as_record_batch()
            .ok_or_else(|| corrupt("Record batch message missing header"))?;

        let body = read_body(&mut self.reader, message.bodyLength())?;
        trace!(body_len = body.len(), "read ipc record batch message");

        let batch = ipc_to_batch(ipc, &Buffer::from_vec(body), &self.schema, &self.conf)?;

        Ok(Some(batch))
    }
}

pub(crate) fn unsupported_message(header_type: MessageHeader) -> TesseraError {
    match header_type {
        MessageHeader::DictionaryBatch | MessageHeader::Tensor | MessageHeader::SparseTensor => {
            TesseraError::of_kind(
                ErrorKind::NotImplemented,
                format!("Not yet implemented: ipc {header_type:?} messages"),
            )
        }
        other => TesseraError::of_kind(
            ErrorKind::CorruptStream,
            format!("Unexpected message header type: {other:?}"),
        ),
    }
}
