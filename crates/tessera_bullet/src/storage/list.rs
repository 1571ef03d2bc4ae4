use std::ops::Range;

use tessera_error::Result;

use super::{validate_offsets, OffsetIndex, PrimitiveStorage};
use crate::array::Array;

/// Storage for lists: 32-bit offsets into a single child array.
#[derive(Debug, Clone)]
pub struct ListStorage {
    pub(crate) offsets: PrimitiveStorage<i32>,
    pub(crate) child: Array,
}

impl ListStorage {
    /// Create list storage, validating the offsets against the child length.
    pub fn try_new(offsets: PrimitiveStorage<i32>, child: Array) -> Result<Self> {
        validate_offsets(&offsets, child.len())?;
        Ok(ListStorage { offsets, child })
    }

    pub(crate) fn new_unchecked(offsets: PrimitiveStorage<i32>, child: Array) -> Self {
        ListStorage { offsets, child }
    }

    pub fn len(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn offsets(&self) -> &PrimitiveStorage<i32> {
        &self.offsets
    }

    pub fn child(&self) -> &Array {
        &self.child
    }

    /// Range of child indices for the list at `idx`.
    pub fn value_range(&self, idx: usize) -> Option<Range<usize>> {
        let start = self.offsets.get(idx)?.checked_to_usize()?;
        let end = self.offsets.get(idx + 1)?.checked_to_usize()?;
        Some(start..end)
    }
}
