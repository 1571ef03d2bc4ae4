//! Append-only builders producing immutable arrays.
//!
//! Every builder implements [`ArrayBuilder`] for dynamic use (nested
//! builders hold their children as `Box<dyn ArrayBuilder>`), and exposes
//! strongly typed `append_value` methods for direct use.

pub mod boolean;
pub mod nested;
pub mod primitive;
pub mod temporal;
pub mod varlen;

pub use boolean::*;
pub use nested::*;
pub use primitive::*;
pub use temporal::*;
pub use varlen::*;

use std::fmt::Debug;

use tessera_error::{ErrorKind, Result, TesseraError};

use crate::array::Array;
use crate::datatype::DataType;
use crate::scalar::ScalarValue;

pub trait ArrayBuilder: Debug + Send {
    /// Data type of the array produced by this builder.
    fn datatype(&self) -> &DataType;

    /// Number of values appended so far.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn append_null(&mut self);

    /// Check that a sequence of scalars could be appended, in order, without
    /// error.
    ///
    /// Accounts for the cumulative effect of the values (e.g. offset
    /// overflow).
    fn validate_scalars(&self, values: &[ScalarValue]) -> Result<()>;

    fn validate_scalar(&self, value: &ScalarValue) -> Result<()> {
        self.validate_scalars(std::slice::from_ref(value))
    }

    /// Append a dynamically typed value. `ScalarValue::Null` appends a null.
    ///
    /// The builder is left unchanged on error.
    fn append_scalar(&mut self, value: &ScalarValue) -> Result<()>;

    /// Check that `finish` would succeed without changing the builder.
    fn check_finish(&self) -> Result<()> {
        Ok(())
    }

    /// Produce an array from everything appended so far, resetting the
    /// builder.
    ///
    /// The builder is left unchanged on error.
    fn finish(&mut self) -> Result<Array>;
}

/// Create a builder for any data type.
pub fn new_array_builder(datatype: &DataType) -> Result<Box<dyn ArrayBuilder>> {
    Ok(match datatype {
        DataType::Null => Box::new(NullBuilder::new()),
        DataType::Boolean => Box::new(BooleanBuilder::new()),
        DataType::Int8 => Box::new(Int8Builder::new()),
        DataType::Int16 => Box::new(Int16Builder::new()),
        DataType::Int32 => Box::new(Int32Builder::new()),
        DataType::Int64 => Box::new(Int64Builder::new()),
        DataType::UInt8 => Box::new(UInt8Builder::new()),
        DataType::UInt16 => Box::new(UInt16Builder::new()),
        DataType::UInt32 => Box::new(UInt32Builder::new()),
        DataType::UInt64 => Box::new(UInt64Builder::new()),
        DataType::Float32 => Box::new(Float32Builder::new()),
        DataType::Float64 => Box::new(Float64Builder::new()),
        DataType::Utf8 => Box::new(StringBuilder::new_utf8()),
        DataType::LargeUtf8 => Box::new(LargeStringBuilder::new_utf8()),
        DataType::Binary => Box::new(BinaryBuilder::new_binary()),
        DataType::LargeBinary => Box::new(LargeBinaryBuilder::new_binary()),
        DataType::Date32 => Box::new(Date32Builder::new()),
        DataType::Date64 => Box::new(Date64Builder::new()),
        DataType::Time32(unit) => Box::new(Time32Builder::try_new(*unit)?),
        DataType::Time64(unit) => Box::new(Time64Builder::try_new(*unit)?),
        DataType::Timestamp(meta) => {
            Box::new(TimestampBuilder::new(meta.unit, meta.timezone.clone()))
        }
        DataType::Struct(meta) => Box::new(StructBuilder::try_new(meta.fields.clone())?),
        DataType::List(meta) => Box::new(ListBuilder::try_new(meta.datatype.as_ref().clone())?),
    })
}

static NULL_DATATYPE: DataType = DataType::Null;

/// Builder for `DataType::Null` arrays. Only nulls may be appended.
#[derive(Debug, Default)]
pub struct NullBuilder {
    len: usize,
}

impl NullBuilder {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ArrayBuilder for NullBuilder {
    fn datatype(&self) -> &DataType {
        &NULL_DATATYPE
    }

    fn len(&self) -> usize {
        self.len
    }

    fn append_null(&mut self) {
        self.len += 1;
    }

    fn validate_scalars(&self, values: &[ScalarValue]) -> Result<()> {
        match values.iter().find(|v| !v.is_null()) {
            Some(v) => Err(scalar_type_mismatch(&DataType::Null, v)),
            None => Ok(()),
        }
    }

    fn append_scalar(&mut self, value: &ScalarValue) -> Result<()> {
        self.validate_scalar(value)?;
        self.append_null();
        Ok(())
    }

    fn finish(&mut self) -> Result<Array> {
        let len = std::mem::take(&mut self.len);
        Ok(Array::new_untyped_null_array(len))
    }
}

/// Check a staging buffer holds `len` values of `width` bytes.
pub(crate) fn check_staged_len(
    staged: usize,
    len: usize,
    width: usize,
    datatype: &DataType,
) -> Result<()> {
    if len.checked_mul(width) != Some(staged) {
        return Err(TesseraError::of_kind(
            ErrorKind::LengthMismatch,
            format!("{datatype} builder staged {staged} bytes for {len} values of width {width}"),
        ));
    }
    Ok(())
}

pub(crate) fn scalar_type_mismatch(datatype: &DataType, value: &ScalarValue) -> TesseraError {
    TesseraError::of_kind(
        ErrorKind::TypeMismatch,
        format!("Cannot append {value:?} to a {datatype} builder"),
    )
}
