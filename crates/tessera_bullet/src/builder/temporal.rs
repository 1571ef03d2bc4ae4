//! Builders for dates, times and timestamps.
//!
//! These accept `chrono` values and convert to the stored integer at append
//! time. Raw integers already in the builder's unit can be appended with
//! `append_raw`.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc};
use tessera_error::{ErrorKind, Result, TesseraError};

use super::{ArrayBuilder, PrimitiveBuilder};
use crate::array::Array;
use crate::datatype::{DataType, TimeUnit, TimestampTypeMeta};
use crate::scalar::ScalarValue;

/// Days between 0001-01-01 and 1970-01-01.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

const NANOS_PER_MICRO: i64 = 1_000;
const NANOS_PER_MILLI: u32 = 1_000_000;

macro_rules! delegate_array_builder {
    ($builder:ty) => {
        impl ArrayBuilder for $builder {
            fn datatype(&self) -> &DataType {
                self.inner.datatype()
            }

            fn len(&self) -> usize {
                self.inner.len()
            }

            fn append_null(&mut self) {
                self.inner.append_null()
            }

            fn validate_scalars(&self, values: &[ScalarValue]) -> Result<()> {
                self.inner.validate_scalars(values)
            }

            fn append_scalar(&mut self, value: &ScalarValue) -> Result<()> {
                self.inner.append_scalar(value)
            }

            fn check_finish(&self) -> Result<()> {
                self.inner.check_finish()
            }

            fn finish(&mut self) -> Result<Array> {
                self.inner.finish()
            }
        }
    };
}

/// Days since epoch.
#[derive(Debug)]
pub struct Date32Builder {
    inner: PrimitiveBuilder<i32>,
}

impl Date32Builder {
    pub fn new() -> Self {
        Date32Builder {
            inner: PrimitiveBuilder::with_datatype(DataType::Date32),
        }
    }

    pub fn append_value(&mut self, value: NaiveDate) {
        self.inner
            .append_value(value.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE)
    }

    pub fn append_raw(&mut self, days: i32) {
        self.inner.append_value(days)
    }
}

impl Default for Date32Builder {
    fn default() -> Self {
        Self::new()
    }
}

delegate_array_builder!(Date32Builder);

/// Milliseconds since epoch.
#[derive(Debug)]
pub struct Date64Builder {
    inner: PrimitiveBuilder<i64>,
}

impl Date64Builder {
    pub fn new() -> Self {
        Date64Builder {
            inner: PrimitiveBuilder::with_datatype(DataType::Date64),
        }
    }

    pub fn append_value(&mut self, value: NaiveDateTime) {
        self.inner.append_value(value.and_utc().timestamp_millis())
    }

    pub fn append_raw(&mut self, millis: i64) {
        self.inner.append_value(millis)
    }
}

impl Default for Date64Builder {
    fn default() -> Self {
        Self::new()
    }
}

delegate_array_builder!(Date64Builder);

/// Time of day in seconds or milliseconds.
#[derive(Debug)]
pub struct Time32Builder {
    unit: TimeUnit,
    inner: PrimitiveBuilder<i32>,
}

impl Time32Builder {
    pub fn try_new(unit: TimeUnit) -> Result<Self> {
        match unit {
            TimeUnit::Second | TimeUnit::Millisecond => Ok(Time32Builder {
                unit,
                inner: PrimitiveBuilder::with_datatype(DataType::Time32(unit)),
            }),
            other => Err(TesseraError::of_kind(
                ErrorKind::Encoding,
                format!("Time32 cannot store unit {other}"),
            )),
        }
    }

    pub fn append_value(&mut self, value: NaiveTime) {
        let secs = value.num_seconds_from_midnight() as i32;
        let v = match self.unit {
            TimeUnit::Second => secs,
            _ => secs * 1000 + (value.nanosecond() / NANOS_PER_MILLI) as i32,
        };
        self.inner.append_value(v)
    }

    pub fn append_raw(&mut self, value: i32) {
        self.inner.append_value(value)
    }
}

delegate_array_builder!(Time32Builder);

/// Time of day in microseconds or nanoseconds.
#[derive(Debug)]
pub struct Time64Builder {
    unit: TimeUnit,
    inner: PrimitiveBuilder<i64>,
}

impl Time64Builder {
    pub fn try_new(unit: TimeUnit) -> Result<Self> {
        match unit {
            TimeUnit::Microsecond | TimeUnit::Nanosecond => Ok(Time64Builder {
                unit,
                inner: PrimitiveBuilder::with_datatype(DataType::Time64(unit)),
            }),
            other => Err(TesseraError::of_kind(
                ErrorKind::Encoding,
                format!("Time64 cannot store unit {other}"),
            )),
        }
    }

    pub fn append_value(&mut self, value: NaiveTime) {
        let nanos = value.num_seconds_from_midnight() as i64 * 1_000_000_000
            + value.nanosecond() as i64;
        let v = match self.unit {
            TimeUnit::Microsecond => nanos / NANOS_PER_MICRO,
            _ => nanos,
        };
        self.inner.append_value(v)
    }

    pub fn append_raw(&mut self, value: i64) {
        self.inner.append_value(value)
    }
}

delegate_array_builder!(Time64Builder);

/// Instants since epoch in a fixed unit, with an optional timezone recorded
/// on the type.
#[derive(Debug)]
pub struct TimestampBuilder {
    unit: TimeUnit,
    inner: PrimitiveBuilder<i64>,
}

impl TimestampBuilder {
    pub fn new(unit: TimeUnit, timezone: Option<String>) -> Self {
        TimestampBuilder {
            unit,
            inner: PrimitiveBuilder::with_datatype(DataType::Timestamp(TimestampTypeMeta {
                unit,
                timezone,
            })),
        }
    }

    /// Append an instant, failing if it's not representable in the unit.
    pub fn append_value(&mut self, value: DateTime<Utc>) -> Result<()> {
        let v = match self.unit {
            TimeUnit::Second => value.timestamp(),
            TimeUnit::Millisecond => value.timestamp_millis(),
            TimeUnit::Microsecond => value.timestamp_micros(),
            TimeUnit::Nanosecond => value.timestamp_nanos_opt().ok_or_else(|| {
                TesseraError::of_kind(
                    ErrorKind::Encoding,
                    format!("Timestamp {value} out of range for nanosecond precision"),
                )
            })?,
        };
        self.inner.append_value(v);
        Ok(())
    }

    pub fn append_raw(&mut self, value: i64) {
        self.inner.append_value(value)
    }
}

delegate_array_builder!(TimestampBuilder);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date32_days_since_epoch() {
        let mut builder = Date32Builder::new();
        builder.append_value(NaiveDate::from_ymd_opt(1970, 1, 1).unwrap());
        builder.append_value(NaiveDate::from_ymd_opt(1970, 1, 11).unwrap());
        builder.append_value(NaiveDate::from_ymd_opt(1969, 12, 31).unwrap());

        let arr = builder.finish().unwrap();
        assert_eq!(&DataType::Date32, arr.datatype());
        assert_eq!(ScalarValue::Date32(0), arr.scalar(0).unwrap());
        assert_eq!(ScalarValue::Date32(10), arr.scalar(1).unwrap());
        assert_eq!(ScalarValue::Date32(-1), arr.scalar(2).unwrap());
    }

    #[test]
    fn date64_millis() {
        let mut builder = Date64Builder::new();
        let dt = NaiveDate::from_ymd_opt(1970, 1, 2)
            .unwrap()
            .and_hms_opt(0, 0, 1)
            .unwrap();
        builder.append_value(dt);

        let arr = builder.finish().unwrap();
        assert_eq!(ScalarValue::Date64(86_401_000), arr.scalar(0).unwrap());
    }

    #[test]
    fn time_units() {
        let t = NaiveTime::from_hms_micro_opt(1, 0, 2, 500_250).unwrap();

        let mut b = Time32Builder::try_new(TimeUnit::Second).unwrap();
        b.append_value(t);
        assert_eq!(ScalarValue::Time32(3602), b.finish().unwrap().scalar(0).unwrap());

        let mut b = Time32Builder::try_new(TimeUnit::Millisecond).unwrap();
        b.append_value(t);
        assert_eq!(
            ScalarValue::Time32(3_602_500),
            b.finish().unwrap().scalar(0).unwrap()
        );

        let mut b = Time64Builder::try_new(TimeUnit::Microsecond).unwrap();
        b.append_value(t);
        assert_eq!(
            ScalarValue::Time64(3_602_500_250),
            b.finish().unwrap().scalar(0).unwrap()
        );

        let mut b = Time64Builder::try_new(TimeUnit::Nanosecond).unwrap();
        b.append_value(t);
        assert_eq!(
            ScalarValue::Time64(3_602_500_250_000),
            b.finish().unwrap().scalar(0).unwrap()
        );
    }

    #[test]
    fn time_invalid_units() {
        let err = Time32Builder::try_new(TimeUnit::Microsecond).unwrap_err();
        assert_eq!(ErrorKind::Encoding, err.kind());
        let err = Time64Builder::try_new(TimeUnit::Millisecond).unwrap_err();
        assert_eq!(ErrorKind::Encoding, err.kind());
    }

    #[test]
    fn timestamp_nanos_out_of_range() {
        let mut builder = TimestampBuilder::new(TimeUnit::Nanosecond, None);
        let far = NaiveDate::from_ymd_opt(3000, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            .and_utc();

        let err = builder.append_value(far).unwrap_err();
        assert_eq!(ErrorKind::Encoding, err.kind());
        assert!(builder.is_empty());

        let mut builder = TimestampBuilder::new(TimeUnit::Millisecond, Some("UTC".to_string()));
        builder.append_value(far).unwrap();
        let arr = builder.finish().unwrap();
        assert_eq!(
            ScalarValue::Timestamp(far.timestamp_millis()),
            arr.scalar(0).unwrap()
        );
        assert_eq!("Timestamp(ms, UTC)", arr.datatype().to_string());
    }
}
