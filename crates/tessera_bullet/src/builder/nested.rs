//! Struct and list builders.
//!
//! Child builders are kept in sync with the parent through an explicit
//! forwarding protocol:
//!
//! - `StructBuilder::append` forwards one value to every child, in field
//!   order.
//! - `StructBuilder::append_null` records a null for the struct and forwards
//!   `append_null` to every child, so children always have the struct's
//!   length.
//! - `ListBuilder::append` forwards every item to the child, then records the
//!   new end offset.
//! - `ListBuilder::append_null` repeats the previous offset and leaves the
//!   child untouched.
//!
//! Values are validated against the children before any child is mutated,
//! so a failed append leaves the builder as it was.

use tessera_error::{ErrorKind, Result, TesseraError};

use super::{check_staged_len, new_array_builder, scalar_type_mismatch, ArrayBuilder};
use crate::array::Array;
use crate::bitmap::BitmapBuilder;
use crate::buffer::MutableBuffer;
use crate::datatype::DataType;
use crate::field::Field;
use crate::scalar::ScalarValue;
use crate::storage::{ListStorage, PrimitiveStorage, PrimitiveType, StructStorage};

#[derive(Debug)]
pub struct StructBuilder {
    datatype: DataType,
    children: Vec<Box<dyn ArrayBuilder>>,
    validity: BitmapBuilder,
}

impl StructBuilder {
    pub fn try_new(fields: Vec<Field>) -> Result<Self> {
        let children = fields
            .iter()
            .map(|f| new_array_builder(&f.datatype))
            .collect::<Result<Vec<_>>>()?;

        Ok(StructBuilder {
            datatype: DataType::new_struct(fields),
            children,
            validity: BitmapBuilder::new(),
        })
    }

    pub fn num_children(&self) -> usize {
        self.children.len()
    }

    pub fn child(&self, idx: usize) -> Option<&dyn ArrayBuilder> {
        self.children.get(idx).map(|c| c.as_ref())
    }

    /// Append one struct value, `values` holding one scalar per field.
    pub fn append(&mut self, values: &[ScalarValue]) -> Result<()> {
        self.check_arity(values.len())?;
        for (child, value) in self.children.iter().zip(values) {
            child.validate_scalar(value)?;
        }

        for (child, value) in self.children.iter_mut().zip(values) {
            child.append_scalar(value)?;
        }
        self.validity.push(true);

        Ok(())
    }

    fn check_arity(&self, num_values: usize) -> Result<()> {
        if num_values != self.children.len() {
            return Err(TesseraError::of_kind(
                ErrorKind::TypeMismatch,
                format!(
                    "Struct value has {num_values} fields, expected {}",
                    self.children.len()
                ),
            ));
        }
        Ok(())
    }
}

impl ArrayBuilder for StructBuilder {
    fn datatype(&self) -> &DataType {
        &self.datatype
    }

    fn len(&self) -> usize {
        self.validity.len()
    }

    fn append_null(&mut self) {
        for child in &mut self.children {
            child.append_null();
        }
        self.validity.push(false);
    }

    fn validate_scalars(&self, values: &[ScalarValue]) -> Result<()> {
        // Gather the values each child would receive, in order.
        let mut per_child: Vec<Vec<ScalarValue>> = vec![Vec::new(); self.children.len()];
        for value in values {
            match value {
                ScalarValue::Null => per_child
                    .iter_mut()
                    .for_each(|vals| vals.push(ScalarValue::Null)),
                ScalarValue::Struct(fields) => {
                    self.check_arity(fields.len())?;
                    for (vals, field) in per_child.iter_mut().zip(fields) {
                        vals.push(field.clone());
                    }
                }
                other => return Err(scalar_type_mismatch(&self.datatype, other)),
            }
        }

        for (child, vals) in self.children.iter().zip(&per_child) {
            child.validate_scalars(vals)?;
        }

        Ok(())
    }

    fn append_scalar(&mut self, value: &ScalarValue) -> Result<()> {
        match value {
            ScalarValue::Null => {
                self.append_null();
                Ok(())
            }
            ScalarValue::Struct(fields) => self.append(fields),
            other => Err(scalar_type_mismatch(&self.datatype, other)),
        }
    }

    fn check_finish(&self) -> Result<()> {
        let len = self.validity.len();
        for (idx, child) in self.children.iter().enumerate() {
            if child.len() != len {
                return Err(TesseraError::of_kind(
                    ErrorKind::LengthMismatch,
                    format!(
                        "Struct child builder {idx} has length {}, expected {len}",
                        child.len()
                    ),
                ));
            }
            child.check_finish()?;
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<Array> {
        // Every child is checked before any is reset.
        self.check_finish()?;

        let len = self.validity.len();
        let children = self
            .children
            .iter_mut()
            .map(|c| c.finish())
            .collect::<Result<Vec<_>>>()?;
        let validity = self.validity.finish();

        let storage = StructStorage::try_new(len, children)?;
        Array::try_new(self.datatype.clone(), Some(validity), storage)
    }
}

#[derive(Debug)]
pub struct ListBuilder {
    datatype: DataType,
    child: Box<dyn ArrayBuilder>,
    offsets: MutableBuffer,
    validity: BitmapBuilder,
}

impl ListBuilder {
    pub fn try_new(item: DataType) -> Result<Self> {
        let child = new_array_builder(&item)?;
        let mut offsets = MutableBuffer::new();
        0i32.write_le(&mut offsets);

        Ok(ListBuilder {
            datatype: DataType::new_list(item),
            child,
            offsets,
            validity: BitmapBuilder::new(),
        })
    }

    pub fn child(&self) -> &dyn ArrayBuilder {
        self.child.as_ref()
    }

    /// Append one list value made up of `items`.
    pub fn append(&mut self, items: &[ScalarValue]) -> Result<()> {
        let end = checked_list_end(self.child.len(), items.len())?;
        self.child.validate_scalars(items)?;

        for item in items {
            self.child.append_scalar(item)?;
        }
        end.write_le(&mut self.offsets);
        self.validity.push(true);

        Ok(())
    }
}

fn checked_list_end(current: usize, additional: usize) -> Result<i32> {
    current
        .checked_add(additional)
        .and_then(|end| i32::try_from(end).ok())
        .ok_or_else(|| {
            TesseraError::of_kind(
                ErrorKind::Encoding,
                format!("Appending {additional} items overflows list offsets"),
            )
        })
}

impl ArrayBuilder for ListBuilder {
    fn datatype(&self) -> &DataType {
        &self.datatype
    }

    fn len(&self) -> usize {
        self.validity.len()
    }

    fn append_null(&mut self) {
        // Child length only grows through checked appends.
        let end = i32::try_from(self.child.len()).unwrap_or(i32::MAX);
        end.write_le(&mut self.offsets);
        self.validity.push(false);
    }

    fn validate_scalars(&self, values: &[ScalarValue]) -> Result<()> {
        let mut items = Vec::new();
        for value in values {
            match value {
                ScalarValue::Null => (),
                ScalarValue::List(vals) => items.extend(vals.iter().cloned()),
                other => return Err(scalar_type_mismatch(&self.datatype, other)),
            }
        }
        checked_list_end(self.child.len(), items.len())?;
        self.child.validate_scalars(&items)
    }

    fn append_scalar(&mut self, value: &ScalarValue) -> Result<()> {
        match value {
            ScalarValue::Null => {
                self.append_null();
                Ok(())
            }
            ScalarValue::List(items) => self.append(items),
            other => Err(scalar_type_mismatch(&self.datatype, other)),
        }
    }

    fn check_finish(&self) -> Result<()> {
        check_staged_len(self.offsets.len(), self.len() + 1, i32::WIDTH, &self.datatype)?;
        self.child.check_finish()
    }

    fn finish(&mut self) -> Result<Array> {
        self.check_finish()?;

        let len = self.validity.len();
        let child = self.child.finish()?;
        let offsets = PrimitiveStorage::<i32>::try_new(self.offsets.take(), len + 1)?;
        0i32.write_le(&mut self.offsets);
        let validity = self.validity.finish();

        let storage = ListStorage::new_unchecked(offsets, child);
        Array::try_new(self.datatype.clone(), Some(validity), storage)
    }
}

#[cfg(test)]
mod tests {
    use crate::array::ArrayData;
    use crate::builder::Int32Builder;

    use super::*;

    /// Int32 builder that always fails to finish.
    #[derive(Debug)]
    struct UnfinishableBuilder(Int32Builder);

    impl ArrayBuilder for UnfinishableBuilder {
        fn datatype(&self) -> &DataType {
            self.0.datatype()
        }

        fn len(&self) -> usize {
            self.0.len()
        }

        fn append_null(&mut self) {
            self.0.append_null()
        }

        fn validate_scalars(&self, values: &[ScalarValue]) -> Result<()> {
            self.0.validate_scalars(values)
        }

        fn append_scalar(&mut self, value: &ScalarValue) -> Result<()> {
            self.0.append_scalar(value)
        }

        fn check_finish(&self) -> Result<()> {
            Err(TesseraError::new("Builder cannot finish"))
        }

        fn finish(&mut self) -> Result<Array> {
            self.check_finish()?;
            self.0.finish()
        }
    }

    fn struct_fields() -> Vec<Field> {
        vec![
            Field::new("a", DataType::Int32, true),
            Field::new("b", DataType::Utf8, true),
        ]
    }

    #[test]
    fn struct_append_forwards_to_children() {
        let mut builder = StructBuilder::try_new(struct_fields()).unwrap();
        builder
            .append(&[ScalarValue::Int32(1), ScalarValue::from("x")])
            .unwrap();
        builder.append_null();
        builder
            .append(&[ScalarValue::Null, ScalarValue::from("z")])
            .unwrap();

        assert_eq!(3, builder.len());
        assert_eq!(3, builder.child(0).unwrap().len());
        assert_eq!(3, builder.child(1).unwrap().len());

        let arr = builder.finish().unwrap();
        assert_eq!(1, arr.null_count());
        assert_eq!(
            ScalarValue::Struct(vec![ScalarValue::Int32(1), ScalarValue::from("x")]),
            arr.scalar(0).unwrap()
        );
        assert_eq!(ScalarValue::Null, arr.scalar(1).unwrap());

        match arr.array_data() {
            ArrayData::Struct(s) => {
                // Struct null is also null in every child.
                assert_eq!(Some(true), s.children()[0].is_null(1));
                assert_eq!(Some(true), s.children()[1].is_null(1));
            }
            other => panic!("unexpected data: {other:?}"),
        }
    }

    #[test]
    fn struct_failed_append_leaves_children_unchanged() {
        let mut builder = StructBuilder::try_new(struct_fields()).unwrap();
        builder
            .append(&[ScalarValue::Int32(1), ScalarValue::from("x")])
            .unwrap();

        // Second value has the wrong type, first must not be appended.
        let err = builder
            .append(&[ScalarValue::Int32(2), ScalarValue::Int32(3)])
            .unwrap_err();
        assert_eq!(ErrorKind::TypeMismatch, err.kind());
        assert_eq!(1, builder.child(0).unwrap().len());
        assert_eq!(1, builder.child(1).unwrap().len());

        let err = builder.append(&[ScalarValue::Int32(2)]).unwrap_err();
        assert_eq!(ErrorKind::TypeMismatch, err.kind());
        assert_eq!(1, builder.len());
    }

    #[test]
    fn list_append_and_null() {
        let mut builder = ListBuilder::try_new(DataType::Int64).unwrap();
        builder
            .append(&[ScalarValue::Int64(1), ScalarValue::Int64(2)])
            .unwrap();
        builder.append_null();
        assert_eq!(2, builder.child().len());

        builder.append(&[]).unwrap();
        builder
            .append(&[ScalarValue::Null, ScalarValue::Int64(3)])
            .unwrap();

        let arr = builder.finish().unwrap();
        assert_eq!(4, arr.len());
        assert_eq!(1, arr.null_count());

        match arr.array_data() {
            ArrayData::List(s) => {
                assert_eq!(vec![0, 2, 2, 2, 4], s.offsets().iter().collect::<Vec<_>>());
                assert_eq!(4, s.child().len());
            }
            other => panic!("unexpected data: {other:?}"),
        }

        assert_eq!(ScalarValue::List(Vec::new()), arr.scalar(2).unwrap());
        assert_eq!(
            ScalarValue::List(vec![ScalarValue::Null, ScalarValue::Int64(3)]),
            arr.scalar(3).unwrap()
        );
    }

    #[test]
    fn list_failed_append_leaves_child_unchanged() {
        let mut builder = ListBuilder::try_new(DataType::Utf8).unwrap();
        let err = builder
            .append(&[ScalarValue::from("a"), ScalarValue::Boolean(true)])
            .unwrap_err();
        assert_eq!(ErrorKind::TypeMismatch, err.kind());
        assert_eq!(0, builder.child().len());
        assert_eq!(0, builder.len());
    }

    #[test]
    fn list_of_structs() {
        let mut builder = ListBuilder::try_new(DataType::new_struct(struct_fields())).unwrap();
        builder
            .append_scalar(&ScalarValue::List(vec![ScalarValue::Struct(vec![
                ScalarValue::Int32(4),
                ScalarValue::from("s"),
            ])]))
            .unwrap();

        let arr = builder.finish().unwrap();
        assert_eq!(
            ScalarValue::List(vec![ScalarValue::Struct(vec![
                ScalarValue::Int32(4),
                ScalarValue::from("s"),
            ])]),
            arr.scalar(0).unwrap()
        );
    }

    #[test]
    fn struct_failed_finish_leaves_children_unchanged() {
        let mut builder = StructBuilder {
            datatype: DataType::new_struct(vec![
                Field::new("a", DataType::Int32, true),
                Field::new("b", DataType::Int32, true),
            ]),
            children: vec![
                Box::new(Int32Builder::new()),
                Box::new(UnfinishableBuilder(Int32Builder::new())),
            ],
            validity: BitmapBuilder::new(),
        };
        builder
            .append(&[ScalarValue::Int32(1), ScalarValue::Int32(2)])
            .unwrap();
        builder.append_null();

        builder.finish().unwrap_err();
        assert_eq!(2, builder.len());
        assert_eq!(2, builder.child(0).unwrap().len());
        assert_eq!(2, builder.child(1).unwrap().len());

        // First child still holds its values.
        let mut second = Int32Builder::new();
        second.append_value(2);
        second.append_null();
        builder.children[1] = Box::new(second);

        let arr = builder.finish().unwrap();
        assert_eq!(
            ScalarValue::Struct(vec![ScalarValue::Int32(1), ScalarValue::Int32(2)]),
            arr.scalar(0).unwrap()
        );
        assert_eq!(ScalarValue::Null, arr.scalar(1).unwrap());
    }

    #[test]
    fn list_failed_finish_leaves_offsets_unchanged() {
        let mut builder = ListBuilder::try_new(DataType::Int32).unwrap();
        builder.child = Box::new(UnfinishableBuilder(Int32Builder::new()));
        builder
            .append(&[ScalarValue::Int32(1), ScalarValue::Int32(2)])
            .unwrap();
        builder.append_null();

        builder.finish().unwrap_err();
        assert_eq!(2, builder.len());
        assert_eq!(2, builder.child().len());

        let mut child = Int32Builder::new();
        child.append_value(1);
        child.append_value(2);
        builder.child = Box::new(child);

        let arr = builder.finish().unwrap();
        match arr.array_data() {
            ArrayData::List(s) => {
                assert_eq!(vec![0, 2, 2], s.offsets().iter().collect::<Vec<_>>());
            }
            other => panic!("unexpected data: {other:?}"),
        }
        assert_eq!(
            ScalarValue::List(vec![ScalarValue::Int32(1), ScalarValue::Int32(2)]),
            arr.scalar(0).unwrap()
        );
    }
}
