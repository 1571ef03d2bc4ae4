use std::marker::PhantomData;

use tessera_error::{ErrorKind, Result, ResultExt, TesseraError};

use super::{check_staged_len, scalar_type_mismatch, ArrayBuilder};
use crate::array::{Array, ArrayData};
use crate::bitmap::BitmapBuilder;
use crate::buffer::MutableBuffer;
use crate::datatype::DataType;
use crate::scalar::ScalarValue;
use crate::storage::{ContiguousVarlenStorage, OffsetIndex, PrimitiveStorage, PrimitiveType};

/// Builder for utf8 and binary arrays with `O` sized offsets.
///
/// Nulls are zero-length slots, the previous offset is repeated.
#[derive(Debug)]
pub struct VarlenBuilder<O> {
    datatype: DataType,
    offsets: MutableBuffer,
    values: MutableBuffer,
    validity: BitmapBuilder,
    len: usize,
    _offset: PhantomData<O>,
}

pub type StringBuilder = VarlenBuilder<i32>;
pub type LargeStringBuilder = VarlenBuilder<i64>;
pub type BinaryBuilder = VarlenBuilder<i32>;
pub type LargeBinaryBuilder = VarlenBuilder<i64>;

impl<O: OffsetIndex> VarlenBuilder<O> {
    pub fn new_utf8() -> Self {
        Self::with_datatype(if O::LARGE {
            DataType::LargeUtf8
        } else {
            DataType::Utf8
        })
    }

    pub fn new_binary() -> Self {
        Self::with_datatype(if O::LARGE {
            DataType::LargeBinary
        } else {
            DataType::Binary
        })
    }

    fn with_datatype(datatype: DataType) -> Self {
        let mut offsets = MutableBuffer::new();
        O::zero().write_le(&mut offsets);
        VarlenBuilder {
            datatype,
            offsets,
            values: MutableBuffer::new(),
            validity: BitmapBuilder::new(),
            len: 0,
            _offset: PhantomData,
        }
    }

    pub fn append_str(&mut self, value: &str) -> Result<()> {
        self.push_value(value.as_bytes())
    }

    /// Append raw bytes. Bytes appended to a utf8 builder must be valid utf8.
    pub fn append_bytes(&mut self, value: &[u8]) -> Result<()> {
        if self.datatype.is_utf8() {
            std::str::from_utf8(value)
                .context("Value appended to utf8 builder")
                .map_err(|e| e.with_kind(ErrorKind::Encoding))?;
        }
        self.push_value(value)
    }

    fn push_value(&mut self, value: &[u8]) -> Result<()> {
        let end = self.checked_end(self.values.len(), value.len())?;
        self.values.extend_from_slice(value);
        end.write_le(&mut self.offsets);
        self.validity.push(true);
        self.len += 1;
        Ok(())
    }

    fn checked_end(&self, current: usize, additional: usize) -> Result<O> {
        current
            .checked_add(additional)
            .and_then(O::checked_from_usize)
            .ok_or_else(|| {
                TesseraError::of_kind(
                    ErrorKind::Encoding,
                    format!(
                        "Appending {additional} bytes overflows {} offsets",
                        self.datatype
                    ),
                )
            })
    }

    fn scalar_bytes<'a>(&self, value: &'a ScalarValue) -> Result<Option<&'a [u8]>> {
        match (value, self.datatype.is_utf8()) {
            (ScalarValue::Null, _) => Ok(None),
            (ScalarValue::Utf8(s), true) => Ok(Some(s.as_bytes())),
            (ScalarValue::Binary(b), false) => Ok(Some(b.as_ref())),
            (other, _) => Err(scalar_type_mismatch(&self.datatype, other)),
        }
    }
}

impl<O: OffsetIndex> ArrayBuilder for VarlenBuilder<O>
where
    ArrayData: From<ContiguousVarlenStorage<O>>,
{
    fn datatype(&self) -> &DataType {
        &self.datatype
    }

    fn len(&self) -> usize {
        self.len
    }

    fn append_null(&mut self) {
        // Offset already known to fit, it's the current end.
        let end = O::checked_from_usize(self.values.len()).unwrap_or_else(O::zero);
        end.write_le(&mut self.offsets);
        self.validity.push(false);
        self.len += 1;
    }

    fn validate_scalars(&self, values: &[ScalarValue]) -> Result<()> {
        let mut total = self.values.len();
        for value in values {
            if let Some(bytes) = self.scalar_bytes(value)? {
                self.checked_end(total, bytes.len())?;
                total += bytes.len();
            }
        }
        Ok(())
    }

    fn append_scalar(&mut self, value: &ScalarValue) -> Result<()> {
        match self.scalar_bytes(value)? {
            Some(bytes) => self.push_value(bytes),
            None => {
                self.append_null();
                Ok(())
            }
        }
    }

    fn check_finish(&self) -> Result<()> {
        check_staged_len(self.offsets.len(), self.len + 1, O::WIDTH, &self.datatype)
    }

    fn finish(&mut self) -> Result<Array> {
        self.check_finish()?;
        let offsets = PrimitiveStorage::<O>::try_new(self.offsets.take(), self.len + 1)?;
        let storage = ContiguousVarlenStorage::new_unchecked(offsets, self.values.take());
        let validity = self.validity.finish();
        self.len = 0;
        O::zero().write_le(&mut self.offsets);

        Array::try_new(self.datatype.clone(), Some(validity), storage)
    }
}
