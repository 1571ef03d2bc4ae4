use tessera_error::{Result, TesseraError};

use crate::buffer::{Buffer, MutableBuffer};

/// Number of bytes needed to hold `len` bits.
pub const fn bytes_for_bits(len: usize) -> usize {
    (len + 7) / 8
}

/// An LSB ordered, immutable bitmap.
///
/// Bits beyond `len` in the last byte are ignored.
#[derive(Debug, Clone, Default)]
pub struct Bitmap {
    len: usize,
    buffer: Buffer,
}

impl Bitmap {
    /// Create a bitmap over an existing buffer.
    ///
    /// Errors if the buffer is too small to hold `len` bits.
    pub fn try_new(buffer: Buffer, len: usize) -> Result<Self> {
        if buffer.len() < bytes_for_bits(len) {
            return Err(TesseraError::new(format!(
                "Bitmap buffer too small, need {} bytes for {len} bits, have {}",
                bytes_for_bits(len),
                buffer.len()
            )));
        }
        Ok(Bitmap { len, buffer })
    }

    pub fn from_bool_iter(iter: impl IntoIterator<Item = bool>) -> Self {
        let iter = iter.into_iter();
        let (lower, _) = iter.size_hint();

        let mut builder = BitmapBuilder::with_capacity(lower);
        for bit in iter {
            builder.push(bit);
        }

        builder.finish()
    }

    pub fn new_with_all_true(len: usize) -> Self {
        let mut builder = BitmapBuilder::with_capacity(len);
        builder.push_n(true, len);
        builder.finish()
    }

    pub fn new_with_all_false(len: usize) -> Self {
        let mut builder = BitmapBuilder::with_capacity(len);
        builder.push_n(false, len);
        builder.finish()
    }

    pub const fn len(&self) -> usize {
        self.len
    }

    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn buffer(&self) -> &Buffer {
        &self.buffer
    }

    /// Bytes covering exactly `len` bits.
    pub fn data(&self) -> &[u8] {
        &self.buffer.as_slice()[..bytes_for_bits(self.len)]
    }

    /// Get the value at index.
    ///
    /// Panics if index is out of bounds.
    pub fn value(&self, idx: usize) -> bool {
        assert!(idx < self.len);
        self.buffer.as_slice()[idx / 8] & (1 << (idx % 8)) != 0
    }

    /// Get an iterator over the bitmap.
    pub const fn iter(&self) -> BitmapIter {
        BitmapIter {
            idx: 0,
            bitmap: self,
        }
    }

    /// Count the number of set bits.
    pub fn count_set_bits(&self) -> usize {
        let data = self.data();
        let full = self.len / 8;

        let mut count: usize = data[..full].iter().map(|b| b.count_ones() as usize).sum();

        let rem = self.len % 8;
        if rem != 0 {
            let mask = (1u8 << rem) - 1;
            count += (data[full] & mask).count_ones() as usize;
        }

        count
    }

    pub fn count_unset_bits(&self) -> usize {
        self.len - self.count_set_bits()
    }
}

impl PartialEq for Bitmap {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && self.iter().eq(other.iter())
    }
}

impl Eq for Bitmap {}

impl FromIterator<bool> for Bitmap {
    fn from_iter<T: IntoIterator<Item = bool>>(iter: T) -> Self {
        Self::from_bool_iter(iter)
    }
}

#[derive(Debug)]
pub struct BitmapIter<'a> {
    idx: usize,
    bitmap: &'a Bitmap,
}

impl<'a> Iterator for BitmapIter<'a> {
    type Item = bool;

    fn next(&mut self) -> Option<Self::Item> {
        if self.idx >= self.bitmap.len() {
            return None;
        }

        let v = self.bitmap.value(self.idx);
        self.idx += 1;
        Some(v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (
            self.bitmap.len() - self.idx,
            Some(self.bitmap.len() - self.idx),
        )
    }
}

impl<'a> ExactSizeIterator for BitmapIter<'a> {}

/// Append-only bitmap builder.
#[derive(Debug, Default)]
pub struct BitmapBuilder {
    len: usize,
    buffer: MutableBuffer,
}

impl BitmapBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(bits: usize) -> Self {
        BitmapBuilder {
            len: 0,
            buffer: MutableBuffer::with_capacity(bytes_for_bits(bits)),
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn push(&mut self, val: bool) {
        if self.len % 8 == 0 {
            self.buffer.push(0);
        }
        if val {
            self.buffer.as_mut_slice()[self.len / 8] |= 1 << (self.len % 8);
        }
        self.len += 1;
    }

    pub fn push_n(&mut self, val: bool, n: usize) {
        for _ in 0..n {
            self.push(val);
        }
    }

    /// Set a bit at index.
    ///
    /// Panics if index is out of bounds.
    pub fn set(&mut self, idx: usize, val: bool) {
        assert!(idx < self.len);
        let data = self.buffer.as_mut_slice();
        if val {
            data[idx / 8] |= 1 << (idx % 8);
        } else {
            data[idx / 8] &= !(1 << (idx % 8));
        }
    }

    pub fn value(&self, idx: usize) -> bool {
        assert!(idx < self.len);
        self.buffer.as_slice()[idx / 8] & (1 << (idx % 8)) != 0
    }

    /// Number of unset bits so far.
    pub fn count_unset_bits(&self) -> usize {
        (0..self.len).filter(|idx| !self.value(*idx)).count()
    }

    /// Freeze the bits pushed so far, leaving the builder empty.
    pub fn finish(&mut self) -> Bitmap {
        let len = std::mem::take(&mut self.len);
        Bitmap {
            len,
            buffer: self.buffer.take(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple() {
        let bits = [true, false, true, false, true, true, true, true];
        let bm = Bitmap::from_bool_iter(bits);

        assert_eq!(8, bm.len());

        let got: Vec<_> = bm.iter().collect();
        assert_eq!(bits.as_slice(), got);
    }

    #[test]
    fn simple_multiple_bytes() {
        let bits = [
            true, false, true, false, true, true, true, true, //
            true, false, true, false, false, true, true, true, //
            true, false, true, false, true, false, true, true,
        ];
        let bm = Bitmap::from_bool_iter(bits);

        assert_eq!(24, bm.len());

        let got: Vec<_> = bm.iter().collect();
        assert_eq!(bits.as_slice(), got);
    }

    #[test]
    fn not_multiple_of_eight() {
        let bits = [
            true, false, true, false, true, true, true, true, //
            true, false, true, false,
        ];
        let bm = Bitmap::from_bool_iter(bits);

        assert_eq!(12, bm.len());
        assert_eq!(2, bm.buffer().len());

        let got: Vec<_> = bm.iter().collect();
        assert_eq!(bits.as_slice(), got);
    }

    #[test]
    fn lsb_first_layout() {
        let bm = Bitmap::from_bool_iter([true, false, false, true]);
        assert_eq!(&[0b0000_1001], bm.data());
    }

    #[test]
    fn builder_set_simple() {
        let mut builder = BitmapBuilder::new();
        builder.push_n(true, 8);

        builder.set(0, false);
        assert!(!builder.value(0));

        builder.set(0, true);
        assert!(builder.value(0));
    }

    #[test]
    fn count_bits_ignores_trailing() {
        // Trailing bits past len are set but shouldn't be counted.
        let bm = Bitmap::try_new(Buffer::from_vec(vec![0b1111_0101]), 4).unwrap();
        assert_eq!(2, bm.count_set_bits());
        assert_eq!(2, bm.count_unset_bits());
    }

    #[test]
    fn all_true_all_false() {
        let t = Bitmap::new_with_all_true(10);
        assert_eq!(10, t.count_set_bits());

        let f = Bitmap::new_with_all_false(10);
        assert_eq!(10, f.count_unset_bits());
    }

    #[test]
    fn try_new_too_small() {
        let buf = Buffer::from_vec(vec![0xFF]);
        assert!(Bitmap::try_new(buf, 9).is_err());
    }

    #[test]
    fn finish_resets_builder() {
        let mut builder = BitmapBuilder::new();
        builder.push(true);
        builder.push(false);

        let bm = builder.finish();
        assert_eq!(2, bm.len());
        assert!(builder.is_empty());

        builder.push(false);
        let bm = builder.finish();
        assert_eq!(vec![false], bm.iter().collect::<Vec<_>>());
    }
}
