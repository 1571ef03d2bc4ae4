use tessera_error::Result;

use super::{scalar_type_mismatch, ArrayBuilder};
use crate::array::Array;
use crate::bitmap::BitmapBuilder;
use crate::datatype::DataType;
use crate::scalar::ScalarValue;
use crate::storage::BooleanStorage;

static BOOLEAN_DATATYPE: DataType = DataType::Boolean;

#[derive(Debug, Default)]
pub struct BooleanBuilder {
    values: BitmapBuilder,
    validity: BitmapBuilder,
}

impl BooleanBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append_value(&mut self, value: bool) {
        self.values.push(value);
        self.validity.push(true);
    }

    pub fn append_option(&mut self, value: Option<bool>) {
        match value {
            Some(v) => self.append_value(v),
            None => ArrayBuilder::append_null(self),
        }
    }
}

impl ArrayBuilder for BooleanBuilder {
    fn datatype(&self) -> &DataType {
        &BOOLEAN_DATATYPE
    }

    fn len(&self) -> usize {
        self.values.len()
    }

    fn append_null(&mut self) {
        self.values.push(false);
        self.validity.push(false);
    }

    fn validate_scalars(&self, values: &[ScalarValue]) -> Result<()> {
        match values
            .iter()
            .find(|v| !matches!(v, ScalarValue::Null | ScalarValue::Boolean(_)))
        {
            Some(v) => Err(scalar_type_mismatch(&DataType::Boolean, v)),
            None => Ok(()),
        }
    }

    fn append_scalar(&mut self, value: &ScalarValue) -> Result<()> {
        match value {
            ScalarValue::Null => ArrayBuilder::append_null(self),
            ScalarValue::Boolean(v) => self.append_value(*v),
            other => return Err(scalar_type_mismatch(&DataType::Boolean, other)),
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<Array> {
        let values = self.values.finish();
        let validity = self.validity.finish();
        Array::try_new(
            DataType::Boolean,
            Some(validity),
            BooleanStorage::from(values),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_with_null() {
        let mut builder = BooleanBuilder::new();
        builder.append_value(true);
        builder.append_value(false);
        builder.append_option(None);
        builder.append_scalar(&ScalarValue::Boolean(true)).unwrap();

        let arr = builder.finish().unwrap();
        assert_eq!(4, arr.len());
        assert_eq!(1, arr.null_count());
        assert_eq!(ScalarValue::Boolean(false), arr.scalar(1).unwrap());
        assert_eq!(ScalarValue::Null, arr.scalar(2).unwrap());
        assert!(builder.is_empty());
    }
}
