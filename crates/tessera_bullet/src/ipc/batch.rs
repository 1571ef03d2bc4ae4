//! Conversion to/from ipc for batches.
//!
//! Arrays are walked in pre-order. Every array contributes one field node;
//! every non-null array contributes a validity buffer (empty when there are no
//! nulls) followed by its data buffers, then its children.
use std::collections::VecDeque;
use std::sync::Arc;

use flatbuffers::{FlatBufferBuilder, WIPOffset};
use tessera_arrow_ipc::message::{
    FieldNode as IpcFieldNode, RecordBatch as IpcRecordBatch,
    RecordBatchBuilder as IpcRecordBatchBuilder,
};
use tessera_arrow_ipc::schema::Buffer as IpcBuffer;
use tessera_error::{not_implemented, ErrorKind, Result, TesseraError};

use super::message::{corrupt, padding_len};
use super::IpcConfig;
use crate::array::{Array, ArrayData};
use crate::batch::Batch;
use crate::bitmap::Bitmap;
use crate::buffer::Buffer;
use crate::datatype::{DataType, PhysicalType};
use crate::field::Schema;
use crate::storage::{
    BooleanStorage, ContiguousVarlenStorage, ListStorage, OffsetIndex, PrimitiveStorage,
    PrimitiveType, StructStorage, UntypedNullStorage,
};

/// Serialize a batch into a record batch header and its padded body.
pub(crate) fn batch_to_ipc<'a>(
    fbb: &mut FlatBufferBuilder<'a>,
    batch: &Batch,
) -> Result<(WIPOffset<IpcRecordBatch<'a>>, Vec<u8>)> {
    let mut body = BodyWriter::default();
    for col in batch.columns() {
        body.push_array(col)?;
    }

    let nodes = fbb.create_vector(&body.nodes);
    let buffers = fbb.create_vector(&body.buffers);

    let mut builder = IpcRecordBatchBuilder::new(fbb);
    builder.add_length(to_i64(batch.num_rows())?);
    builder.add_nodes(nodes);
    builder.add_buffers(buffers);

    Ok((builder.finish(), body.body))
}

fn to_i64(v: usize) -> Result<i64> {
    i64::try_from(v)
        .map_err(|_| TesseraError::of_kind(ErrorKind::Encoding, format!("Length {v} too large")))
}

#[derive(Debug, Default)]
struct BodyWriter {
    nodes: Vec<IpcFieldNode>,
    buffers: Vec<IpcBuffer>,
    body: Vec<u8>,
}

impl BodyWriter {
    fn push_buffer(&mut self, data: &[u8]) -> Result<()> {
        let offset = to_i64(self.body.len())?;
        self.body.extend_from_slice(data);
        self.body.resize(self.body.len() + padding_len(data.len()), 0);
        self.buffers.push(IpcBuffer::new(offset, to_i64(data.len())?));
        Ok(())
    }

    fn push_array(&mut self, array: &Array) -> Result<()> {
        self.nodes.push(IpcFieldNode::new(
            to_i64(array.len())?,
            to_i64(array.null_count())?,
        ));

        if let ArrayData::UntypedNull(_) = array.array_data() {
            return Ok(());
        }

        match array.validity() {
            Some(validity) => self.push_buffer(validity.data())?,
            None => self.push_buffer(&[])?,
        }

        match array.array_data() {
            ArrayData::UntypedNull(_) => (),
            ArrayData::Boolean(s) => self.push_buffer(s.bitmap().data())?,
            ArrayData::Float32(s) => self.push_buffer(s.data())?,
            ArrayData::Float64(s) => self.push_buffer(s.data())?,
            ArrayData::Int8(s) => self.push_buffer(s.data())?,
            ArrayData::Int16(s) => self.push_buffer(s.data())?,
            ArrayData::Int32(s) => self.push_buffer(s.data())?,
            ArrayData::Int64(s) => self.push_buffer(s.data())?,
            ArrayData::UInt8(s) => self.push_buffer(s.data())?,
            ArrayData::UInt16(s) => self.push_buffer(s.data())?,
            ArrayData::UInt32(s) => self.push_buffer(s.data())?,
            ArrayData::UInt64(s) => self.push_buffer(s.data())?,
            ArrayData::Binary(s) => {
                self.push_buffer(s.offsets().data())?;
                self.push_buffer(s.data().as_slice())?;
            }
            ArrayData::LargeBinary(s) => {
                self.push_buffer(s.offsets().data())?;
                self.push_buffer(s.data().as_slice())?;
            }
            ArrayData::List(s) => {
                self.push_buffer(s.offsets().data())?;
                self.push_array(s.child())?;
            }
            ArrayData::Struct(s) => {
                for child in s.children() {
                    self.push_array(child)?;
                }
            }
        }

        Ok(())
    }
}

/// Reconstruct a batch from a record batch header and its body.
///
/// Column buffers are zero-copy slices of `body`.
pub(crate) fn ipc_to_batch(
    batch: IpcRecordBatch,
    body: &Buffer,
    schema: &Arc<Schema>,
    conf: &IpcConfig,
) -> Result<Batch> {
    if batch.compression().is_some() {
        not_implemented!("ipc body compression");
    }

    let mut reader = BufferReader {
        body,
        nodes: batch
            .nodes()
            .map(|nodes| nodes.iter().collect())
            .unwrap_or_default(),
        buffers: batch
            .buffers()
            .map(|buffers| buffers.iter().collect())
            .unwrap_or_default(),
        conf,
    };

    let num_rows = usize::try_from(batch.length())
        .map_err(|_| corrupt("Negative record batch length"))?;

    let cols = schema
        .iter()
        .map(|field| reader.read_array(&field.datatype))
        .collect::<Result<Vec<_>>>()?;

    if !reader.nodes.is_empty() || !reader.buffers.is_empty() {
        return Err(TesseraError::of_kind(
            ErrorKind::CorruptStream,
            format!(
                "Record batch has {} unused field nodes and {} unused buffers",
                reader.nodes.len(),
                reader.buffers.len()
            ),
        ));
    }

    Batch::try_new_with_num_rows(schema.clone(), cols, num_rows).map_err(|e| {
        TesseraError::with_source("Record batch does not match schema", Box::new(e))
            .with_kind(ErrorKind::CorruptStream)
    })
}

fn to_corrupt(e: TesseraError) -> TesseraError {
    e.with_kind(ErrorKind::CorruptStream)
}

struct BufferReader<'a> {
    /// Complete message body.
    body: &'a Buffer,

    /// Field nodes from the header, in pre-order.
    nodes: VecDeque<&'a IpcFieldNode>,

    /// Buffer locations from the header. These only contain offsets and
    /// lengths, not the actual data.
    buffers: VecDeque<&'a IpcBuffer>,

    conf: &'a IpcConfig,
}

impl<'a> BufferReader<'a> {
    /// Returns (length, null count) of the next node.
    fn try_next_node(&mut self) -> Result<(usize, usize)> {
        let node = self
            .nodes
            .pop_front()
            .ok_or_else(|| corrupt("Record batch has fewer field nodes than the schema"))?;

        let len = usize::try_from(node.length()).map_err(|_| corrupt("Negative node length"))?;
        let null_count = usize::try_from(node.null_count())
            .map_err(|_| corrupt("Negative node null count"))?;
        if null_count > len {
            return Err(TesseraError::of_kind(
                ErrorKind::CorruptStream,
                format!("Node null count {null_count} exceeds length {len}"),
            ));
        }

        Ok((len, null_count))
    }

    fn try_next_buf(&mut self) -> Result<Buffer> {
        let buf = self
            .buffers
            .pop_front()
            .ok_or_else(|| corrupt("Record batch has fewer buffers than the schema"))?;

        let offset =
            usize::try_from(buf.offset()).map_err(|_| corrupt("Negative buffer offset"))?;
        let len = usize::try_from(buf.length()).map_err(|_| corrupt("Negative buffer length"))?;

        self.body.slice(offset, len).map_err(to_corrupt)
    }

    fn read_array(&mut self, datatype: &DataType) -> Result<Array> {
        let (len, null_count) = self.try_next_node()?;

        if datatype.is_null() {
            return Ok(Array::new_untyped_null_array(len));
        }

        let validity_buf = self.try_next_buf()?;
        let validity = if null_count > 0 {
            let bitmap = Bitmap::try_new(validity_buf, len).map_err(to_corrupt)?;
            let actual = bitmap.count_unset_bits();
            if actual != null_count {
                return Err(TesseraError::of_kind(
                    ErrorKind::CorruptStream,
                    format!("Node declares {null_count} nulls, validity has {actual}"),
                ));
            }
            Some(bitmap)
        } else {
            None
        };

        let data: ArrayData = match datatype.physical_type() {
            PhysicalType::UntypedNull => UntypedNullStorage(len).into(),
            PhysicalType::Boolean => {
                let bitmap = Bitmap::try_new(self.try_next_buf()?, len).map_err(to_corrupt)?;
                BooleanStorage::from(bitmap).into()
            }
            PhysicalType::Int8 => self.read_primitive::<i8>(len)?.into(),
            PhysicalType::Int16 => self.read_primitive::<i16>(len)?.into(),
            PhysicalType::Int32 => self.read_primitive::<i32>(len)?.into(),
            PhysicalType::Int64 => self.read_primitive::<i64>(len)?.into(),
            PhysicalType::UInt8 => self.read_primitive::<u8>(len)?.into(),
            PhysicalType::UInt16 => self.read_primitive::<u16>(len)?.into(),
            PhysicalType::UInt32 => self.read_primitive::<u32>(len)?.into(),
            PhysicalType::UInt64 => self.read_primitive::<u64>(len)?.into(),
            PhysicalType::Float32 => self.read_primitive::<f32>(len)?.into(),
            PhysicalType::Float64 => self.read_primitive::<f64>(len)?.into(),
            PhysicalType::Binary => {
                let storage = self.read_varlen::<i32>(len)?;
                self.check_utf8(datatype, validity.as_ref(), storage.iter())?;
                storage.into()
            }
            PhysicalType::LargeBinary => {
                let storage = self.read_varlen::<i64>(len)?;
                self.check_utf8(datatype, validity.as_ref(), storage.iter())?;
                storage.into()
            }
            PhysicalType::List => {
                let offsets = self.read_offsets::<i32>(len)?;
                let item = match datatype {
                    DataType::List(meta) => meta.datatype.as_ref(),
                    other => {
                        return Err(TesseraError::new(format!(
                            "Expected list type, got {other}"
                        )))
                    }
                };
                let child = self.read_array(item)?;
                ListStorage::try_new(offsets, child)
                    .map_err(to_corrupt)?
                    .into()
            }
            PhysicalType::Struct => {
                let fields = match datatype {
                    DataType::Struct(meta) => &meta.fields,
                    other => {
                        return Err(TesseraError::new(format!(
                            "Expected struct type, got {other}"
                        )))
                    }
                };
                let children = fields
                    .iter()
                    .map(|f| self.read_array(&f.datatype))
                    .collect::<Result<Vec<_>>>()?;
                StructStorage::try_new(len, children)
                    .map_err(to_corrupt)?
                    .into()
            }
        };

        Array::try_new(datatype.clone(), validity, data).map_err(to_corrupt)
    }

    fn read_primitive<T: PrimitiveType>(&mut self, len: usize) -> Result<PrimitiveStorage<T>> {
        PrimitiveStorage::try_new(self.try_next_buf()?, len).map_err(to_corrupt)
    }

    /// Read `len + 1` offsets. Empty arrays may omit the offsets entirely.
    fn read_offsets<O: OffsetIndex>(&mut self, len: usize) -> Result<PrimitiveStorage<O>> {
        let buf = self.try_next_buf()?;
        if len == 0 && buf.is_empty() {
            return Ok(PrimitiveStorage::from(vec![O::zero()]));
        }
        PrimitiveStorage::try_new(buf, len + 1).map_err(to_corrupt)
    }

    fn read_varlen<O: OffsetIndex>(&mut self, len: usize) -> Result<ContiguousVarlenStorage<O>> {
        let offsets = self.read_offsets::<O>(len)?;
        let data = self.try_next_buf()?;
        ContiguousVarlenStorage::try_new(offsets, data).map_err(to_corrupt)
    }

    fn check_utf8<'b>(
        &self,
        datatype: &DataType,
        validity: Option<&Bitmap>,
        values: impl Iterator<Item = &'b [u8]>,
    ) -> Result<()> {
        if !datatype.is_utf8() || !self.conf.validate_utf8 {
            return Ok(());
        }

        for (idx, value) in values.enumerate() {
            if validity.is_some_and(|v| !v.value(idx)) {
                continue;
            }
            if let Err(e) = std::str::from_utf8(value) {
                return Err(TesseraError::with_source(
                    format!("Invalid utf8 in row {idx}"),
                    Box::new(e),
                )
                .with_kind(ErrorKind::CorruptStream));
            }
        }

        Ok(())
    }
}
