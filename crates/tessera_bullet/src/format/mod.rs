//! Utilities for writing array values into strings.
pub mod ugly;

use std::fmt::{self, Write as _};

use chrono::{DateTime, Utc};
use tessera_error::Result;

use crate::array::Array;
use crate::datatype::{DataType, TimeUnit};
use crate::field::Field;
use crate::scalar::ScalarValue;

const SECONDS_IN_DAY: i64 = 86_400;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatOptions {
    /// String to write for null values.
    pub null: &'static str,
}

impl FormatOptions {
    pub const fn new() -> Self {
        FormatOptions { null: "" }
    }
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// Trait for converting an i64 to a Chrono DateTime.
pub trait DateTimeFromTimestamp {
    fn from(val: i64) -> Option<DateTime<Utc>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateTimeFromSeconds;
impl DateTimeFromTimestamp for DateTimeFromSeconds {
    fn from(val: i64) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(val, 0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateTimeFromMilliseconds;
impl DateTimeFromTimestamp for DateTimeFromMilliseconds {
    fn from(val: i64) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(val)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateTimeFromMicroseconds;
impl DateTimeFromTimestamp for DateTimeFromMicroseconds {
    fn from(val: i64) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_micros(val)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateTimeFromNanoseconds;
impl DateTimeFromTimestamp for DateTimeFromNanoseconds {
    fn from(val: i64) -> Option<DateTime<Utc>> {
        Some(DateTime::from_timestamp_nanos(val))
    }
}

/// Write a timestamp in unit `T`, falling back to the raw value when it's out
/// of chrono's range.
fn write_timestamp<T, W>(val: i64, buf: &mut W) -> fmt::Result
where
    T: DateTimeFromTimestamp,
    W: fmt::Write,
{
    match T::from(val) {
        Some(datetime) => write!(buf, "{datetime}"),
        None => write!(buf, "{val}"),
    }
}

static NULL_DATATYPE: DataType = DataType::Null;

/// Formats array values for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Formatter {
    options: FormatOptions,
}

impl Formatter {
    pub const fn new(options: FormatOptions) -> Self {
        Formatter { options }
    }

    /// Format the value at `idx` in the array.
    ///
    /// Errors if the index is out of bounds.
    pub fn format_array_value(&self, array: &Array, idx: usize) -> Result<String> {
        let scalar = array.scalar(idx)?;
        let mut buf = String::new();
        self.write_scalar(array.datatype(), &scalar, &mut buf)?;
        Ok(buf)
    }

    fn write_scalar<W: fmt::Write>(
        &self,
        datatype: &DataType,
        scalar: &ScalarValue,
        buf: &mut W,
    ) -> fmt::Result {
        match scalar {
            ScalarValue::Null => write!(buf, "{}", self.options.null),
            ScalarValue::Boolean(v) => write!(buf, "{v}"),
            ScalarValue::Float32(v) => write!(buf, "{v}"),
            ScalarValue::Float64(v) => write!(buf, "{v}"),
            ScalarValue::Int8(v) => write!(buf, "{v}"),
            ScalarValue::Int16(v) => write!(buf, "{v}"),
            ScalarValue::Int32(v) => write!(buf, "{v}"),
            ScalarValue::Int64(v) => write!(buf, "{v}"),
            ScalarValue::UInt8(v) => write!(buf, "{v}"),
            ScalarValue::UInt16(v) => write!(buf, "{v}"),
            ScalarValue::UInt32(v) => write!(buf, "{v}"),
            ScalarValue::UInt64(v) => write!(buf, "{v}"),
            ScalarValue::Date32(v) => {
                match DateTime::from_timestamp(*v as i64 * SECONDS_IN_DAY, 0) {
                    Some(datetime) => write!(buf, "{}", datetime.format("%Y-%m-%d")),
                    None => write!(buf, "{v}"),
                }
            }
            ScalarValue::Date64(v) => write_timestamp::<DateTimeFromMilliseconds, _>(*v, buf),
            ScalarValue::Time32(v) => write!(buf, "{v}"),
            ScalarValue::Time64(v) => write!(buf, "{v}"),
            ScalarValue::Timestamp(v) => {
                let unit = match datatype {
                    DataType::Timestamp(meta) => meta.unit,
                    _ => TimeUnit::Second,
                };
                match unit {
                    TimeUnit::Second => write_timestamp::<DateTimeFromSeconds, _>(*v, buf),
                    TimeUnit::Millisecond => {
                        write_timestamp::<DateTimeFromMilliseconds, _>(*v, buf)
                    }
                    TimeUnit::Microsecond => {
                        write_timestamp::<DateTimeFromMicroseconds, _>(*v, buf)
                    }
                    TimeUnit::Nanosecond => {
                        write_timestamp::<DateTimeFromNanoseconds, _>(*v, buf)
                    }
                }
            }
            ScalarValue::Utf8(v) => write!(buf, "{v}"),
            ScalarValue::Binary(v) => {
                for b in v.iter() {
                    write!(buf, "{b:02x}")?;
                }
                Ok(())
            }
            ScalarValue::List(vals) => {
                let item_type = match datatype {
                    DataType::List(meta) => meta.datatype.as_ref(),
                    _ => &NULL_DATATYPE,
                };
                write!(buf, "[")?;
                for (idx, val) in vals.iter().enumerate() {
                    if idx > 0 {
                        write!(buf, ", ")?;
                    }
                    self.write_scalar(item_type, val, buf)?;
                }
                write!(buf, "]")
            }
            ScalarValue::Struct(vals) => {
                let fields: &[Field] = match datatype {
                    DataType::Struct(meta) => meta.fields.as_slice(),
                    _ => &[],
                };
                write!(buf, "{{")?;
                for (idx, (field, val)) in fields.iter().zip(vals).enumerate() {
                    if idx > 0 {
                        write!(buf, ", ")?;
                    }
                    write!(buf, "{}: ", field.name)?;
                    self.write_scalar(&field.datatype, val, buf)?;
                }
                write!(buf, "}}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{
        ArrayBuilder, BinaryBuilder, BooleanBuilder, Date32Builder, ListBuilder,
        StructBuilder, TimestampBuilder,
    };

    #[test]
    fn booleans_with_null() {
        let mut builder = BooleanBuilder::new();
        builder.append_value(true);
        builder.append_null();
        let arr = builder.finish().unwrap();

        assert_eq!("true", arr.format_value(0).unwrap());
        assert_eq!("", arr.format_value(1).unwrap());

        let formatter = Formatter::new(FormatOptions { null: "NULL" });
        assert_eq!("NULL", formatter.format_array_value(&arr, 1).unwrap());
        assert!(formatter.format_array_value(&arr, 2).is_err());
    }

    #[test]
    fn dates_and_timestamps() {
        let mut builder = Date32Builder::new();
        builder.append_raw(19_000);
        builder.append_raw(16_323);
        let arr = builder.finish().unwrap();
        assert_eq!("2022-01-08", arr.format_value(0).unwrap());
        // Date only, no time of day or offset.
        assert_eq!("2014-09-10", arr.format_value(1).unwrap());

        let mut builder = TimestampBuilder::new(TimeUnit::Millisecond, None);
        builder.append_raw(1_000);
        builder.append_raw(i64::MAX);
        let arr = builder.finish().unwrap();
        assert_eq!("1970-01-01 00:00:01 UTC", arr.format_value(0).unwrap());
        assert_eq!(i64::MAX.to_string(), arr.format_value(1).unwrap());
    }

    #[test]
    fn binary_as_hex() {
        let mut builder = BinaryBuilder::new_binary();
        builder.append_bytes(&[0x0a, 0xff]).unwrap();
        let arr = builder.finish().unwrap();
        assert_eq!("0aff", arr.format_value(0).unwrap());
    }

    #[test]
    fn nested() {
        let mut builder = ListBuilder::try_new(DataType::Int32).unwrap();
        builder
            .append(&[ScalarValue::Int32(1), ScalarValue::Null])
            .unwrap();
        let arr = builder.finish().unwrap();
        assert_eq!("[1, ]", arr.format_value(0).unwrap());

        let mut builder = StructBuilder::try_new(vec![
            Field::new("a", DataType::Utf8, true),
            Field::new("b", DataType::Boolean, true),
        ])
        .unwrap();
        builder
            .append(&[ScalarValue::from("x"), ScalarValue::Boolean(false)])
            .unwrap();
        let arr = builder.finish().unwrap();
        assert_eq!("{a: x, b: false}", arr.format_value(0).unwrap());
    }
}
