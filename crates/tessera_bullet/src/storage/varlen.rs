use std::fmt::Display;

use num::{NumCast, PrimInt, ToPrimitive};
use tessera_error::{ErrorKind, Result, TesseraError};

use super::{PrimitiveStorage, PrimitiveType};
use crate::buffer::Buffer;

/// Integer type used for offsets into variable length data.
pub trait OffsetIndex: PrimitiveType + PrimInt + Display {
    /// Whether this is the 64-bit ("large") variant.
    const LARGE: bool;

    fn checked_from_usize(v: usize) -> Option<Self> {
        <Self as NumCast>::from(v)
    }

    fn checked_to_usize(self) -> Option<usize> {
        ToPrimitive::to_usize(&self)
    }
}

impl OffsetIndex for i32 {
    const LARGE: bool = false;
}

impl OffsetIndex for i64 {
    const LARGE: bool = true;
}

/// Check that offsets are non-negative, non-decreasing, and don't exceed
/// `limit`.
pub(crate) fn validate_offsets<O: OffsetIndex>(
    offsets: &PrimitiveStorage<O>,
    limit: usize,
) -> Result<()> {
    let mut prev = 0;
    for (idx, offset) in offsets.iter().enumerate() {
        let offset = offset.checked_to_usize().ok_or_else(|| {
            TesseraError::of_kind(
                ErrorKind::CorruptStream,
                format!("Negative offset {offset} at index {idx}"),
            )
        })?;

        if idx > 0 && offset < prev {
            return Err(TesseraError::of_kind(
                ErrorKind::CorruptStream,
                format!("Offsets not monotonic at index {idx}: {offset} < {prev}"),
            ));
        }

        if offset > limit {
            return Err(TesseraError::of_kind(
                ErrorKind::CorruptStream,
                format!("Offset {offset} at index {idx} exceeds data length {limit}"),
            ));
        }

        prev = offset;
    }

    Ok(())
}

/// Backing storage for multiple variable length values stored in a contiguous
/// buffer.
///
/// This is the backing storage for binary and string data.
#[derive(Debug, Clone)]
pub struct ContiguousVarlenStorage<O> {
    /// Offsets into the data buffer, one more than the number of values.
    offsets: PrimitiveStorage<O>,
    /// The data buffer being indexed into.
    data: Buffer,
}

impl<O: OffsetIndex> ContiguousVarlenStorage<O> {
    /// Create storage from offsets and data, validating the offsets.
    pub fn try_new(offsets: PrimitiveStorage<O>, data: Buffer) -> Result<Self> {
        validate_offsets(&offsets, data.len())?;
        Ok(ContiguousVarlenStorage { offsets, data })
    }

    /// Create storage from offsets already known to be valid.
    pub(crate) fn new_unchecked(offsets: PrimitiveStorage<O>, data: Buffer) -> Self {
        ContiguousVarlenStorage { offsets, data }
    }

    pub fn get(&self, idx: usize) -> Option<&[u8]> {
        let start = self.offsets.get(idx)?.checked_to_usize()?;
        let end = self.offsets.get(idx + 1)?.checked_to_usize()?;
        self.data.as_slice().get(start..end)
    }

    pub fn len(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn offsets(&self) -> &PrimitiveStorage<O> {
        &self.offsets
    }

    pub fn data(&self) -> &Buffer {
        &self.data
    }

    pub fn iter(&self) -> ContiguousVarlenIter<'_, O> {
        ContiguousVarlenIter {
            storage: self,
            idx: 0,
        }
    }
}

#[derive(Debug)]
pub struct ContiguousVarlenIter<'a, O> {
    storage: &'a ContiguousVarlenStorage<O>,
    idx: usize,
}

impl<'a, O: OffsetIndex> Iterator for ContiguousVarlenIter<'a, O> {
    type Item = &'a [u8];

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let v = self.storage.get(self.idx)?;
        self.idx += 1;
        Some(v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.storage.len() - self.idx;
        (remaining, Some(remaining))
    }
}

impl<'a, O: OffsetIndex> ExactSizeIterator for ContiguousVarlenIter<'a, O> {}
