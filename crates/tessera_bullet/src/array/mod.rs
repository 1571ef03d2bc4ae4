use std::borrow::Cow;
use std::sync::Arc;

use tessera_error::{ErrorKind, Result, ResultExt, TesseraError};

use crate::bitmap::Bitmap;
use crate::datatype::{DataType, PhysicalType};
use crate::format::{FormatOptions, Formatter};
use crate::scalar::ScalarValue;
use crate::storage::{
    BooleanStorage, ContiguousVarlenStorage, ListStorage, PrimitiveStorage, StructStorage,
    UntypedNullStorage,
};

/// An immutable, typed, nullable column of values.
///
/// Cloning is cheap, all buffers are reference counted.
#[derive(Debug, Clone)]
pub struct Array {
    /// Data type of the array.
    pub(crate) datatype: DataType,
    /// Optional validity mask. Only present if there's at least one null.
    pub(crate) validity: Option<Bitmap>,
    /// Number of nulls, derived from the validity mask.
    pub(crate) null_count: usize,
    /// The physical data.
    pub(crate) data: ArrayData,
}

impl Array {
    /// Create a new array, checking that the physical data matches the data
    /// type and the validity mask matches the data length.
    pub fn try_new(
        datatype: DataType,
        validity: Option<Bitmap>,
        data: impl Into<ArrayData>,
    ) -> Result<Self> {
        let data = data.into();

        if data.physical_type() != datatype.physical_type() {
            return Err(TesseraError::of_kind(
                ErrorKind::TypeMismatch,
                format!(
                    "Array data {:?} not valid for data type {datatype}",
                    data.physical_type()
                ),
            ));
        }

        match (&datatype, &data) {
            (DataType::Struct(meta), ArrayData::Struct(storage)) => {
                if meta.fields.len() != storage.children.len() {
                    return Err(TesseraError::of_kind(
                        ErrorKind::TypeMismatch,
                        format!(
                            "Struct type has {} fields, data has {} children",
                            meta.fields.len(),
                            storage.children.len()
                        ),
                    ));
                }
                for (field, child) in meta.fields.iter().zip(&storage.children) {
                    if !child.datatype.is_assignable_to(&field.datatype) {
                        return Err(TesseraError::of_kind(
                            ErrorKind::TypeMismatch,
                            format!(
                                "Struct child type {} not assignable to field '{}' of type {}",
                                child.datatype, field.name, field.datatype
                            ),
                        ));
                    }
                }
            }
            (DataType::List(meta), ArrayData::List(storage)) => {
                if !storage.child.datatype.is_assignable_to(&meta.datatype) {
                    return Err(TesseraError::of_kind(
                        ErrorKind::TypeMismatch,
                        format!(
                            "List child type {} not assignable to item type {}",
                            storage.child.datatype, meta.datatype
                        ),
                    ));
                }
            }
            _ => (),
        }

        let (validity, null_count) = match validity {
            Some(validity) => {
                if validity.len() != data.len() {
                    return Err(TesseraError::of_kind(
                        ErrorKind::LengthMismatch,
                        format!(
                            "Validity length {} differs from data length {}",
                            validity.len(),
                            data.len()
                        ),
                    ));
                }
                let null_count = validity.count_unset_bits();
                if null_count == 0 {
                    (None, 0)
                } else {
                    (Some(validity), null_count)
                }
            }
            None => (None, 0),
        };

        // Null arrays are entirely null.
        let null_count = match &data {
            ArrayData::UntypedNull(s) => s.len(),
            _ => null_count,
        };

        Ok(Array {
            datatype,
            validity,
            null_count,
            data,
        })
    }

    pub fn new_untyped_null_array(len: usize) -> Self {
        Array {
            datatype: DataType::Null,
            validity: None,
            null_count: len,
            data: UntypedNullStorage(len).into(),
        }
    }

    pub fn datatype(&self) -> &DataType {
        &self.datatype
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn null_count(&self) -> usize {
        self.null_count
    }

    pub fn validity(&self) -> Option<&Bitmap> {
        self.validity.as_ref()
    }

    pub fn array_data(&self) -> &ArrayData {
        &self.data
    }

    /// Check if the value at `idx` is valid (non-null).
    ///
    /// Returns None if the index is out of bounds.
    pub fn is_valid(&self, idx: usize) -> Option<bool> {
        if idx >= self.len() {
            return None;
        }

        if let ArrayData::UntypedNull(_) = self.data {
            return Some(false);
        }

        Some(match &self.validity {
            Some(validity) => validity.value(idx),
            None => true,
        })
    }

    /// Check if the value at `idx` is null.
    ///
    /// Returns None if the index is out of bounds.
    pub fn is_null(&self, idx: usize) -> Option<bool> {
        self.is_valid(idx).map(|v| !v)
    }

    /// Get the value at an index.
    ///
    /// Nulls are returned as `ScalarValue::Null`.
    pub fn scalar(&self, idx: usize) -> Result<ScalarValue> {
        let valid = self.is_valid(idx).ok_or_else(|| {
            TesseraError::new(format!(
                "Index {idx} out of bounds for array of length {}",
                self.len()
            ))
        })?;

        if !valid {
            return Ok(ScalarValue::Null);
        }

        Ok(match &self.data {
            ArrayData::UntypedNull(_) => ScalarValue::Null,
            ArrayData::Boolean(s) => ScalarValue::Boolean(s.value(idx).ok_or_else(missing_data)?),
            ArrayData::Int8(s) => ScalarValue::Int8(get_value(s, idx)?),
            ArrayData::Int16(s) => ScalarValue::Int16(get_value(s, idx)?),
            ArrayData::Int32(s) => {
                let v = get_value(s, idx)?;
                match &self.datatype {
                    DataType::Date32 => ScalarValue::Date32(v),
                    DataType::Time32(_) => ScalarValue::Time32(v),
                    _ => ScalarValue::Int32(v),
                }
            }
            ArrayData::Int64(s) => {
                let v = get_value(s, idx)?;
                match &self.datatype {
                    DataType::Date64 => ScalarValue::Date64(v),
                    DataType::Time64(_) => ScalarValue::Time64(v),
                    DataType::Timestamp(_) => ScalarValue::Timestamp(v),
                    _ => ScalarValue::Int64(v),
                }
            }
            ArrayData::UInt8(s) => ScalarValue::UInt8(get_value(s, idx)?),
            ArrayData::UInt16(s) => ScalarValue::UInt16(get_value(s, idx)?),
            ArrayData::UInt32(s) => ScalarValue::UInt32(get_value(s, idx)?),
            ArrayData::UInt64(s) => ScalarValue::UInt64(get_value(s, idx)?),
            ArrayData::Float32(s) => ScalarValue::Float32(get_value(s, idx)?),
            ArrayData::Float64(s) => ScalarValue::Float64(get_value(s, idx)?),
            ArrayData::Binary(s) => self.varlen_scalar(s.get(idx).ok_or_else(missing_data)?)?,
            ArrayData::LargeBinary(s) => {
                self.varlen_scalar(s.get(idx).ok_or_else(missing_data)?)?
            }
            ArrayData::List(s) => {
                let range = s.value_range(idx).ok_or_else(missing_data)?;
                let values = range
                    .map(|child_idx| s.child.scalar(child_idx))
                    .collect::<Result<Vec<_>>>()?;
                ScalarValue::List(values)
            }
            ArrayData::Struct(s) => {
                let values = s
                    .children
                    .iter()
                    .map(|child| child.scalar(idx))
                    .collect::<Result<Vec<_>>>()?;
                ScalarValue::Struct(values)
            }
        })
    }

    fn varlen_scalar<'a>(&self, bytes: &'a [u8]) -> Result<ScalarValue<'a>> {
        if self.datatype.is_utf8() {
            let s = std::str::from_utf8(bytes).context("Binary data not valid utf8")?;
            Ok(ScalarValue::Utf8(Cow::Borrowed(s)))
        } else {
            Ok(ScalarValue::Binary(Cow::Borrowed(bytes)))
        }
    }

    /// Format the value at `idx` for display, with nulls as empty strings.
    pub fn format_value(&self, idx: usize) -> Result<String> {
        Formatter::new(FormatOptions::new()).format_array_value(self, idx)
    }
}

fn get_value<T: crate::storage::PrimitiveType>(
    storage: &PrimitiveStorage<T>,
    idx: usize,
) -> Result<T> {
    storage.get(idx).ok_or_else(missing_data)
}

fn missing_data() -> TesseraError {
    TesseraError::new("Missing data")
}

/// Arrays compare logically, value by value.
impl PartialEq for Array {
    fn eq(&self, other: &Self) -> bool {
        if self.datatype != other.datatype || self.len() != other.len() {
            return false;
        }
        (0..self.len()).all(|idx| match (self.scalar(idx), other.scalar(idx)) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        })
    }
}

impl FromIterator<i32> for Array {
    fn from_iter<T: IntoIterator<Item = i32>>(iter: T) -> Self {
        let vals: Vec<_> = iter.into_iter().collect();
        Array {
            datatype: DataType::Int32,
            validity: None,
            null_count: 0,
            data: ArrayData::Int32(Arc::new(vals.into())),
        }
    }
}

impl FromIterator<bool> for Array {
    fn from_iter<T: IntoIterator<Item = bool>>(iter: T) -> Self {
        let vals: Bitmap = iter.into_iter().collect();
        Array {
            datatype: DataType::Boolean,
            validity: None,
            null_count: 0,
            data: ArrayData::Boolean(Arc::new(vals.into())),
        }
    }
}

/// Physical data backing an array.
#[derive(Debug, Clone)]
pub enum ArrayData {
    UntypedNull(UntypedNullStorage),
    Boolean(Arc<BooleanStorage>),
    Float32(Arc<PrimitiveStorage<f32>>),
    Float64(Arc<PrimitiveStorage<f64>>),
    Int8(Arc<PrimitiveStorage<i8>>),
    Int16(Arc<PrimitiveStorage<i16>>),
    Int32(Arc<PrimitiveStorage<i32>>),
    Int64(Arc<PrimitiveStorage<i64>>),
    UInt8(Arc<PrimitiveStorage<u8>>),
    UInt16(Arc<PrimitiveStorage<u16>>),
    UInt32(Arc<PrimitiveStorage<u32>>),
    UInt64(Arc<PrimitiveStorage<u64>>),
    Binary(Arc<ContiguousVarlenStorage<i32>>),
    LargeBinary(Arc<ContiguousVarlenStorage<i64>>),
    List(Arc<ListStorage>),
    Struct(Arc<StructStorage>),
}

impl ArrayData {
    pub fn physical_type(&self) -> PhysicalType {
        match self {
            Self::UntypedNull(_) => PhysicalType::UntypedNull,
            Self::Boolean(_) => PhysicalType::Boolean,
            Self::Float32(_) => PhysicalType::Float32,
            Self::Float64(_) => PhysicalType::Float64,
            Self::Int8(_) => PhysicalType::Int8,
            Self::Int16(_) => PhysicalType::Int16,
            Self::Int32(_) => PhysicalType::Int32,
            Self::Int64(_) => PhysicalType::Int64,
            Self::UInt8(_) => PhysicalType::UInt8,
            Self::UInt16(_) => PhysicalType::UInt16,
            Self::UInt32(_) => PhysicalType::UInt32,
            Self::UInt64(_) => PhysicalType::UInt64,
            Self::Binary(_) => PhysicalType::Binary,
            Self::LargeBinary(_) => PhysicalType::LargeBinary,
            Self::List(_) => PhysicalType::List,
            Self::Struct(_) => PhysicalType::Struct,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::UntypedNull(s) => s.len(),
            Self::Boolean(s) => s.len(),
            Self::Float32(s) => s.len(),
            Self::Float64(s) => s.len(),
            Self::Int8(s) => s.len(),
            Self::Int16(s) => s.len(),
            Self::Int32(s) => s.len(),
            Self::Int64(s) => s.len(),
            Self::UInt8(s) => s.len(),
            Self::UInt16(s) => s.len(),
            Self::UInt32(s) => s.len(),
            Self::UInt64(s) => s.len(),
            Self::Binary(s) => s.len(),
            Self::LargeBinary(s) => s.len(),
            Self::List(s) => s.len(),
            Self::Struct(s) => s.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<UntypedNullStorage> for ArrayData {
    fn from(value: UntypedNullStorage) -> Self {
        ArrayData::UntypedNull(value)
    }
}

impl From<BooleanStorage> for ArrayData {
    fn from(value: BooleanStorage) -> Self {
        ArrayData::Boolean(value.into())
    }
}

impl From<ContiguousVarlenStorage<i32>> for ArrayData {
    fn from(value: ContiguousVarlenStorage<i32>) -> Self {
        ArrayData::Binary(value.into())
    }
}

impl From<ContiguousVarlenStorage<i64>> for ArrayData {
    fn from(value: ContiguousVarlenStorage<i64>) -> Self {
        ArrayData::LargeBinary(value.into())
    }
}

impl From<ListStorage> for ArrayData {
    fn from(value: ListStorage) -> Self {
        ArrayData::List(value.into())
    }
}

impl From<StructStorage> for ArrayData {
    fn from(value: StructStorage) -> Self {
        ArrayData::Struct(value.into())
    }
}

macro_rules! impl_primitive_array_data_from {
    ($($t:ty => $variant:ident),+ $(,)?) => {
        $(
            impl From<PrimitiveStorage<$t>> for ArrayData {
                fn from(value: PrimitiveStorage<$t>) -> Self {
                    ArrayData::$variant(value.into())
                }
            }
        )+
    };
}

impl_primitive_array_data_from!(
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    u8 => UInt8,
    u16 => UInt16,
    u32 => UInt32,
    u64 => UInt64,
    f32 => Float32,
    f64 => Float64,
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::Buffer;

    #[test]
    fn try_new_mismatched_physical_type() {
        let data = PrimitiveStorage::from(vec![1i64, 2]);
        let err = Array::try_new(DataType::Int32, None, data).unwrap_err();
        assert_eq!(ErrorKind::TypeMismatch, err.kind());
    }

    #[test]
    fn try_new_mismatched_validity_len() {
        let data = PrimitiveStorage::from(vec![1i32, 2]);
        let validity = Bitmap::from_bool_iter([true, false, true]);
        let err = Array::try_new(DataType::Int32, Some(validity), data).unwrap_err();
        assert_eq!(ErrorKind::LengthMismatch, err.kind());
    }

    #[test]
    fn all_valid_validity_dropped() {
        let data = PrimitiveStorage::from(vec![1i32, 2]);
        let validity = Bitmap::new_with_all_true(2);
        let arr = Array::try_new(DataType::Int32, Some(validity), data).unwrap();
        assert!(arr.validity().is_none());
        assert_eq!(0, arr.null_count());
    }

    #[test]
    fn scalar_with_nulls() {
        let data = PrimitiveStorage::from(vec![1i32, 2, 3]);
        let validity = Bitmap::from_bool_iter([true, false, true]);
        let arr = Array::try_new(DataType::Date32, Some(validity), data).unwrap();

        assert_eq!(1, arr.null_count());
        assert_eq!(ScalarValue::Date32(1), arr.scalar(0).unwrap());
        assert_eq!(ScalarValue::Null, arr.scalar(1).unwrap());
        assert_eq!(Some(true), arr.is_null(1));
        assert!(arr.scalar(3).is_err());
        assert_eq!(None, arr.is_valid(3));
    }

    #[test]
    fn utf8_scalar() {
        let offsets = PrimitiveStorage::from(vec![0i64, 2, 5]);
        let storage =
            ContiguousVarlenStorage::try_new(offsets, Buffer::from_vec(b"hiabc".to_vec())).unwrap();
        let arr = Array::try_new(DataType::LargeUtf8, None, storage).unwrap();

        assert_eq!(ScalarValue::from("abc"), arr.scalar(1).unwrap());
    }

    #[test]
    fn untyped_null_all_null() {
        let arr = Array::new_untyped_null_array(3);
        assert_eq!(3, arr.null_count());
        assert_eq!(Some(false), arr.is_valid(0));
        assert_eq!(ScalarValue::Null, arr.scalar(2).unwrap());
    }

    #[test]
    fn logical_eq() {
        let a = Array::from_iter([1i32, 2, 3]);
        let b = Array::from_iter([1i32, 2, 3]);
        let c = Array::from_iter([1i32, 2, 4]);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
