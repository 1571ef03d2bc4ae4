use tessera_error::Result;

use super::{check_staged_len, scalar_type_mismatch, ArrayBuilder};
use crate::array::{Array, ArrayData};
use crate::bitmap::BitmapBuilder;
use crate::buffer::MutableBuffer;
use crate::datatype::DataType;
use crate::scalar::ScalarValue;
use crate::storage::{PrimitiveStorage, PrimitiveType};

/// A primitive type with a default logical data type.
pub trait NativeType: PrimitiveType {
    fn datatype() -> DataType;

    /// Extract a value of this type from a scalar, if the scalar is the
    /// variant used for `datatype`.
    fn from_scalar(datatype: &DataType, value: &ScalarValue) -> Option<Self>;

    fn into_array_data(storage: PrimitiveStorage<Self>) -> ArrayData;
}

macro_rules! impl_native_type {
    ($($t:ty => $variant:ident),+ $(,)?) => {
        $(
            impl NativeType for $t {
                fn datatype() -> DataType {
                    DataType::$variant
                }

                fn from_scalar(datatype: &DataType, value: &ScalarValue) -> Option<Self> {
                    match (datatype, value) {
                        (DataType::$variant, ScalarValue::$variant(v)) => Some(*v),
                        _ => None,
                    }
                }

                fn into_array_data(storage: PrimitiveStorage<Self>) -> ArrayData {
                    storage.into()
                }
            }
        )+
    };
}

impl_native_type!(
    i8 => Int8,
    i16 => Int16,
    u8 => UInt8,
    u16 => UInt16,
    u32 => UInt32,
    u64 => UInt64,
    f32 => Float32,
    f64 => Float64,
);

impl NativeType for i32 {
    fn datatype() -> DataType {
        DataType::Int32
    }

    fn from_scalar(datatype: &DataType, value: &ScalarValue) -> Option<Self> {
        match (datatype, value) {
            (DataType::Int32, ScalarValue::Int32(v))
            | (DataType::Date32, ScalarValue::Date32(v))
            | (DataType::Time32(_), ScalarValue::Time32(v)) => Some(*v),
            _ => None,
        }
    }

    fn into_array_data(storage: PrimitiveStorage<Self>) -> ArrayData {
        storage.into()
    }
}

impl NativeType for i64 {
    fn datatype() -> DataType {
        DataType::Int64
    }

    fn from_scalar(datatype: &DataType, value: &ScalarValue) -> Option<Self> {
        match (datatype, value) {
            (DataType::Int64, ScalarValue::Int64(v))
            | (DataType::Date64, ScalarValue::Date64(v))
            | (DataType::Time64(_), ScalarValue::Time64(v))
            | (DataType::Timestamp(_), ScalarValue::Timestamp(v)) => Some(*v),
            _ => None,
        }
    }

    fn into_array_data(storage: PrimitiveStorage<Self>) -> ArrayData {
        storage.into()
    }
}

/// Builder for fixed-width values.
#[derive(Debug)]
pub struct PrimitiveBuilder<T> {
    datatype: DataType,
    values: MutableBuffer,
    validity: BitmapBuilder,
    len: usize,
    _type: std::marker::PhantomData<T>,
}

pub type Int8Builder = PrimitiveBuilder<i8>;
pub type Int16Builder = PrimitiveBuilder<i16>;
pub type Int32Builder = PrimitiveBuilder<i32>;
pub type Int64Builder = PrimitiveBuilder<i64>;
pub type UInt8Builder = PrimitiveBuilder<u8>;
pub type UInt16Builder = PrimitiveBuilder<u16>;
pub type UInt32Builder = PrimitiveBuilder<u32>;
pub type UInt64Builder = PrimitiveBuilder<u64>;
pub type Float32Builder = PrimitiveBuilder<f32>;
pub type Float64Builder = PrimitiveBuilder<f64>;

impl<T: NativeType> PrimitiveBuilder<T> {
    pub fn new() -> Self {
        Self::with_datatype(T::datatype())
    }

    pub fn with_capacity(cap: usize) -> Self {
        let mut builder = Self::new();
        builder.values = MutableBuffer::with_capacity(cap * T::WIDTH);
        builder.validity = BitmapBuilder::with_capacity(cap);
        builder
    }

    /// Create a builder producing arrays of a logical type other than the
    /// default for `T` (dates, times, timestamps).
    pub(crate) fn with_datatype(datatype: DataType) -> Self {
        PrimitiveBuilder {
            datatype,
            values: MutableBuffer::new(),
            validity: BitmapBuilder::new(),
            len: 0,
            _type: std::marker::PhantomData,
        }
    }

    pub fn append_value(&mut self, value: T) {
        value.write_le(&mut self.values);
        self.validity.push(true);
        self.len += 1;
    }

    pub fn append_option(&mut self, value: Option<T>) {
        match value {
            Some(v) => self.append_value(v),
            None => ArrayBuilder::append_null(self),
        }
    }
}

impl<T: NativeType> Default for PrimitiveBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: NativeType> ArrayBuilder for PrimitiveBuilder<T> {
    fn datatype(&self) -> &DataType {
        &self.datatype
    }

    fn len(&self) -> usize {
        self.len
    }

    fn append_null(&mut self) {
        T::default().write_le(&mut self.values);
        self.validity.push(false);
        self.len += 1;
    }

    fn validate_scalars(&self, values: &[ScalarValue]) -> Result<()> {
        for value in values {
            if !value.is_null() && T::from_scalar(&self.datatype, value).is_none() {
                return Err(scalar_type_mismatch(&self.datatype, value));
            }
        }
        Ok(())
    }

    fn append_scalar(&mut self, value: &ScalarValue) -> Result<()> {
        if value.is_null() {
            ArrayBuilder::append_null(self);
            return Ok(());
        }
        match T::from_scalar(&self.datatype, value) {
            Some(v) => {
                self.append_value(v);
                Ok(())
            }
            None => Err(scalar_type_mismatch(&self.datatype, value)),
        }
    }

    fn check_finish(&self) -> Result<()> {
        check_staged_len(self.values.len(), self.len, T::WIDTH, &self.datatype)
    }

    fn finish(&mut self) -> Result<Array> {
        self.check_finish()?;
        let storage = PrimitiveStorage::<T>::try_new(self.values.take(), self.len)?;
        let validity = self.validity.finish();
        self.len = 0;
        Array::try_new(
            self.datatype.clone(),
            Some(validity),
            T::into_array_data(storage),
        )
    }
}

#[cfg(test)]
mod tests {
    use tessera_error::ErrorKind;

    use super::*;

    #[test]
    fn build_with_nulls() {
        let mut builder = UInt8Builder::new();
        builder.append_value(10);
        builder.append_null();
        builder.append_option(Some(33));

        let arr = builder.finish().unwrap();
        assert_eq!(&DataType::UInt8, arr.datatype());
        assert_eq!(3, arr.len());
        assert_eq!(1, arr.null_count());
        assert_eq!(ScalarValue::UInt8(10), arr.scalar(0).unwrap());
        assert_eq!(ScalarValue::Null, arr.scalar(1).unwrap());
        assert_eq!(ScalarValue::UInt8(33), arr.scalar(2).unwrap());

        let validity = arr.validity().unwrap();
        assert_eq!(vec![true, false, true], validity.iter().collect::<Vec<_>>());
    }

    #[test]
    fn finish_resets() {
        let mut builder = Int64Builder::new();
        builder.append_value(1);
        builder.finish().unwrap();

        assert!(builder.is_empty());
        builder.append_value(2);
        let arr = builder.finish().unwrap();
        assert_eq!(1, arr.len());
        assert_eq!(ScalarValue::Int64(2), arr.scalar(0).unwrap());
        assert!(arr.validity().is_none());
    }

    #[test]
    fn append_scalar_wrong_variant() {
        let mut builder = Int32Builder::new();
        builder.append_scalar(&ScalarValue::Int32(4)).unwrap();
        builder.append_scalar(&ScalarValue::Null).unwrap();

        let err = builder.append_scalar(&ScalarValue::Int64(4)).unwrap_err();
        assert_eq!(ErrorKind::TypeMismatch, err.kind());
        assert_eq!(2, builder.len());
    }

    #[test]
    fn little_endian_values() {
        let mut builder = Int16Builder::new();
        builder.append_value(0x0102);
        let arr = builder.finish().unwrap();
        match arr.array_data() {
            ArrayData::Int16(s) => assert_eq!(&[0x02, 0x01], s.data()),
            other => panic!("unexpected data: {other:?}"),
        }
    }
}
