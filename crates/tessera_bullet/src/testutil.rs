//! Utilities useful for testing.
//!
//! Note these aren't placed behind an `cfg[(test)]` annotation since they
//! should be usable outside of the crate.

use crate::array::Array;
use crate::batch::Batch;

/// Asserts that two arrays are logically equal.
///
/// Compares data types, then every value as a scalar, so arrays with
/// different physical layouts for null slots still compare equal.
pub fn assert_arrays_eq(a: &Array, b: &Array) {
    assert_eq!(a.datatype(), b.datatype(), "Array data types differ");

    if a.len() != b.len() {
        panic!("Array lengths differ, got {} and {}", a.len(), b.len());
    }

    for idx in 0..a.len() {
        let a_scalar = a.scalar(idx).unwrap();
        let b_scalar = b.scalar(idx).unwrap();

        assert_eq!(a_scalar, b_scalar, "Scalars differ at index {idx}");
    }
}

/// Asserts that two batches have the same schema and logically equal
/// columns.
pub fn assert_batches_eq(a: &Batch, b: &Batch) {
    assert_eq!(a.schema(), b.schema(), "Schemas differ");
    assert_eq!(a.num_rows(), b.num_rows(), "Row counts differ");

    for (a, b) in a.columns().iter().zip(b.columns()) {
        assert_arrays_eq(a, b);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{ArrayBuilder, Int32Builder};

    #[test]
    fn assert_arrays_eq_true() {
        let a = Array::from_iter([2i32, 3, 4]);
        let b = Array::from_iter([2i32, 3, 4]);
        assert_arrays_eq(&a, &b);
    }

    #[test]
    #[should_panic]
    fn assert_arrays_eq_array_has_null() {
        let a = Array::from_iter([2i32, 3, 4]);
        let mut builder = Int32Builder::new();
        builder.append_value(2);
        builder.append_null();
        builder.append_value(4);
        let b = builder.finish().unwrap();
        assert_arrays_eq(&a, &b);
    }

    #[test]
    #[should_panic]
    fn assert_arrays_eq_different_lengths() {
        let a = Array::from_iter([2i32, 3, 4]);
        let b = Array::from_iter([2i32, 3]);
        assert_arrays_eq(&a, &b);
    }

    #[test]
    #[should_panic]
    fn assert_arrays_eq_different_values() {
        let a = Array::from_iter([2i32, 3, 4]);
        let b = Array::from_iter([2i32, 3, 5]);
        assert_arrays_eq(&a, &b);
    }
}
