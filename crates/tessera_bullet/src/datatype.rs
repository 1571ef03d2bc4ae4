use std::fmt;

use crate::field::Field;

/// Resolution of time and timestamp values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeUnit {
    Second,
    Millisecond,
    Microsecond,
    Nanosecond,
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Second => write!(f, "s"),
            Self::Millisecond => write!(f, "ms"),
            Self::Microsecond => write!(f, "μs"),
            Self::Nanosecond => write!(f, "ns"),
        }
    }
}

/// Metadata associated with timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TimestampTypeMeta {
    pub unit: TimeUnit,
    pub timezone: Option<String>,
}

impl TimestampTypeMeta {
    pub const fn new(unit: TimeUnit) -> Self {
        TimestampTypeMeta {
            unit,
            timezone: None,
        }
    }
}

/// Metadata associated with structs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StructTypeMeta {
    pub fields: Vec<Field>,
}

/// Metadata associated with lists.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListTypeMeta {
    pub datatype: Box<DataType>,
}

/// Supported data types.
///
/// This follows Arrow's logical types. The physical layout of an array is
/// determined entirely by its data type, see [`DataType::physical_type`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DataType {
    /// Constant null columns.
    Null,
    Boolean,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
    Utf8,
    LargeUtf8,
    Binary,
    LargeBinary,
    /// Days since epoch.
    Date32,
    /// Milliseconds since epoch.
    Date64,
    /// Time of day in seconds or milliseconds.
    Time32(TimeUnit),
    /// Time of day in microseconds or nanoseconds.
    Time64(TimeUnit),
    /// Time since epoch with an optional timezone.
    Timestamp(TimestampTypeMeta),
    /// A struct of different types.
    Struct(StructTypeMeta),
    /// A list of values all of the same type.
    List(ListTypeMeta),
}

/// Physical storage backing an array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhysicalType {
    UntypedNull,
    Boolean,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
    Binary,
    LargeBinary,
    List,
    Struct,
}

impl DataType {
    pub fn new_list(item: DataType) -> Self {
        DataType::List(ListTypeMeta {
            datatype: Box::new(item),
        })
    }

    pub fn new_struct(fields: impl IntoIterator<Item = Field>) -> Self {
        DataType::Struct(StructTypeMeta {
            fields: fields.into_iter().collect(),
        })
    }

    pub const fn is_null(&self) -> bool {
        matches!(self, DataType::Null)
    }

    pub const fn is_utf8(&self) -> bool {
        matches!(self, DataType::Utf8 | DataType::LargeUtf8)
    }

    pub const fn is_nested(&self) -> bool {
        matches!(self, DataType::Struct(_) | DataType::List(_))
    }

    pub const fn physical_type(&self) -> PhysicalType {
        match self {
            Self::Null => PhysicalType::UntypedNull,
            Self::Boolean => PhysicalType::Boolean,
            Self::Int8 => PhysicalType::Int8,
            Self::Int16 => PhysicalType::Int16,
            Self::Int32 | Self::Date32 | Self::Time32(_) => PhysicalType::Int32,
            Self::Int64 | Self::Date64 | Self::Time64(_) | Self::Timestamp(_) => {
                PhysicalType::Int64
            }
            Self::UInt8 => PhysicalType::UInt8,
            Self::UInt16 => PhysicalType::UInt16,
            Self::UInt32 => PhysicalType::UInt32,
            Self::UInt64 => PhysicalType::UInt64,
            Self::Float32 => PhysicalType::Float32,
            Self::Float64 => PhysicalType::Float64,
            Self::Utf8 | Self::Binary => PhysicalType::Binary,
            Self::LargeUtf8 | Self::LargeBinary => PhysicalType::LargeBinary,
            Self::Struct(_) => PhysicalType::Struct,
            Self::List(_) => PhysicalType::List,
        }
    }

    /// Check if values of this type may be stored under a field of type
    /// `target`.
    ///
    /// Types are assignable if they're the same variant. Temporal units and
    /// timezones are ignored, values are carried as-is. Nested types are
    /// checked recursively, ignoring field names and nullability.
    pub fn is_assignable_to(&self, target: &DataType) -> bool {
        match (self, target) {
            (DataType::Time32(_), DataType::Time32(_)) => true,
            (DataType::Time64(_), DataType::Time64(_)) => true,
            (DataType::Timestamp(_), DataType::Timestamp(_)) => true,
            (DataType::Struct(a), DataType::Struct(b)) => {
                a.fields.len() == b.fields.len()
                    && a.fields
                        .iter()
                        .zip(&b.fields)
                        .all(|(a, b)| a.datatype.is_assignable_to(&b.datatype))
            }
            (DataType::List(a), DataType::List(b)) => a.datatype.is_assignable_to(&b.datatype),
            (a, b) => a == b,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "Null"),
            Self::Boolean => write!(f, "Boolean"),
            Self::Int8 => write!(f, "Int8"),
            Self::Int16 => write!(f, "Int16"),
            Self::Int32 => write!(f, "Int32"),
            Self::Int64 => write!(f, "Int64"),
            Self::UInt8 => write!(f, "UInt8"),
            Self::UInt16 => write!(f, "UInt16"),
            Self::UInt32 => write!(f, "UInt32"),
            Self::UInt64 => write!(f, "UInt64"),
            Self::Float32 => write!(f, "Float32"),
            Self::Float64 => write!(f, "Float64"),
            Self::Utf8 => write!(f, "Utf8"),
            Self::LargeUtf8 => write!(f, "LargeUtf8"),
            Self::Binary => write!(f, "Binary"),
            Self::LargeBinary => write!(f, "LargeBinary"),
            Self::Date32 => write!(f, "Date32"),
            Self::Date64 => write!(f, "Date64"),
            Self::Time32(unit) => write!(f, "Time32({unit})"),
            Self::Time64(unit) => write!(f, "Time64({unit})"),
            Self::Timestamp(meta) => match &meta.timezone {
                Some(tz) => write!(f, "Timestamp({}, {tz})", meta.unit),
                None => write!(f, "Timestamp({})", meta.unit),
            },
            Self::Struct(meta) => write!(
                f,
                "Struct {{{}}}",
                meta.fields
                    .iter()
                    .map(|field| format!("{}: {}", field.name, field.datatype))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            Self::List(meta) => write!(f, "List[{}]", meta.datatype),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assignable_ignores_units() {
        assert!(DataType::Time64(TimeUnit::Nanosecond)
            .is_assignable_to(&DataType::Time64(TimeUnit::Microsecond)));
        assert!(!DataType::Time32(TimeUnit::Second)
            .is_assignable_to(&DataType::Time64(TimeUnit::Microsecond)));

        let ts_utc = DataType::Timestamp(TimestampTypeMeta {
            unit: TimeUnit::Millisecond,
            timezone: Some("UTC".to_string()),
        });
        let ts = DataType::Timestamp(TimestampTypeMeta::new(TimeUnit::Second));
        assert!(ts_utc.is_assignable_to(&ts));
    }

    #[test]
    fn assignable_nested() {
        let a = DataType::new_struct([
            Field::new("a", DataType::Int32, false),
            Field::new("b", DataType::new_list(DataType::Utf8), true),
        ]);
        let b = DataType::new_struct([
            Field::new("x", DataType::Int32, true),
            Field::new("y", DataType::new_list(DataType::Utf8), true),
        ]);
        assert!(a.is_assignable_to(&b));

        let c = DataType::new_struct([Field::new("a", DataType::Int32, false)]);
        assert!(!a.is_assignable_to(&c));

        assert!(!DataType::new_list(DataType::Utf8)
            .is_assignable_to(&DataType::new_list(DataType::LargeUtf8)));
    }

    #[test]
    fn physical_types() {
        assert_eq!(PhysicalType::Int32, DataType::Date32.physical_type());
        assert_eq!(
            PhysicalType::Int64,
            DataType::Time64(TimeUnit::Nanosecond).physical_type()
        );
        assert_eq!(PhysicalType::LargeBinary, DataType::LargeUtf8.physical_type());
    }

    #[test]
    fn display() {
        assert_eq!("Time64(ns)", DataType::Time64(TimeUnit::Nanosecond).to_string());
        assert_eq!("List[Int32]", DataType::new_list(DataType::Int32).to_string());
        assert_eq!(
            "Struct {a: Utf8}",
            DataType::new_struct([Field::new("a", DataType::Utf8, true)]).to_string()
        );
    }
}
