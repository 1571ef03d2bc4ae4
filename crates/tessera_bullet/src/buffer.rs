use bytes::Bytes;
use tessera_error::{Result, TesseraError};

/// Minimum allocation for a staging buffer once it holds any data.
const MIN_CAPACITY: usize = 64;

/// An immutable, reference counted span of bytes.
///
/// Clones and slices share the same backing allocation.
#[derive(Debug, Clone, Default)]
pub struct Buffer {
    data: Bytes,
    /// Size of the allocation this buffer was frozen from.
    capacity: usize,
}

impl Buffer {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_vec(v: Vec<u8>) -> Self {
        let capacity = v.capacity();
        Buffer {
            data: Bytes::from(v),
            capacity,
        }
    }

    pub fn from_bytes(data: Bytes) -> Self {
        let capacity = data.len();
        Buffer { data, capacity }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn as_slice(&self) -> &[u8] {
        self.data.as_ref()
    }

    /// Get a zero-copy view of `len` bytes starting at `offset`.
    pub fn slice(&self, offset: usize, len: usize) -> Result<Buffer> {
        let end = offset
            .checked_add(len)
            .filter(|end| *end <= self.len())
            .ok_or_else(|| {
                TesseraError::new(format!(
                    "Slice out of range, offset: {offset}, len: {len}, buffer len: {}",
                    self.len()
                ))
            })?;

        Ok(Buffer {
            data: self.data.slice(offset..end),
            capacity: len,
        })
    }

    pub fn into_bytes(self) -> Bytes {
        self.data
    }
}

impl PartialEq for Buffer {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data
    }
}

impl Eq for Buffer {}

impl AsRef<[u8]> for Buffer {
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl From<Vec<u8>> for Buffer {
    fn from(value: Vec<u8>) -> Self {
        Buffer::from_vec(value)
    }
}

/// Growable staging buffer used while building arrays.
///
/// Grows by doubling with a minimum of 64 bytes. Frozen into a `Buffer` once
/// building is done.
#[derive(Debug, Default)]
pub struct MutableBuffer {
    data: Vec<u8>,
}

impl MutableBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(cap: usize) -> Self {
        MutableBuffer {
            data: Vec::with_capacity(cap),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.data.capacity()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn push(&mut self, byte: u8) {
        self.reserve(1);
        self.data.push(byte);
    }

    pub fn extend_from_slice(&mut self, bytes: &[u8]) {
        self.reserve(bytes.len());
        self.data.extend_from_slice(bytes);
    }

    pub fn extend_zeros(&mut self, n: usize) {
        self.reserve(n);
        self.data.resize(self.data.len() + n, 0);
    }

    fn reserve(&mut self, additional: usize) {
        let needed = self.data.len() + additional;
        if needed <= self.data.capacity() {
            return;
        }

        let mut new_cap = usize::max(self.data.capacity() * 2, MIN_CAPACITY);
        while new_cap < needed {
            new_cap *= 2;
        }

        self.data.reserve_exact(new_cap - self.data.len());
    }

    pub fn freeze(self) -> Buffer {
        Buffer::from_vec(self.data)
    }

    /// Freeze the current contents, leaving this buffer empty.
    pub fn take(&mut self) -> Buffer {
        std::mem::take(self).freeze()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slice_shares_storage() {
        let buf = Buffer::from_vec(vec![0, 1, 2, 3, 4, 5, 6, 7]);
        let slice = buf.slice(2, 4).unwrap();

        assert_eq!(&[2, 3, 4, 5], slice.as_slice());
        assert_eq!(buf.as_slice()[2..].as_ptr(), slice.as_slice().as_ptr());
        assert_eq!(4, slice.capacity());
    }

    #[test]
    fn slice_out_of_range() {
        let buf = Buffer::from_vec(vec![0, 1, 2, 3]);
        assert!(buf.slice(2, 3).is_err());
        assert!(buf.slice(usize::MAX, 2).is_err());
        assert!(buf.slice(4, 0).is_ok());
    }

    #[test]
    fn mutable_grows_geometrically() {
        let mut buf = MutableBuffer::new();
        assert_eq!(0, buf.capacity());

        buf.push(1);
        assert!(buf.capacity() >= 64);

        buf.extend_from_slice(&[0; 64]);
        assert_eq!(65, buf.len());
        assert!(buf.capacity() >= 128);
    }

    #[test]
    fn take_resets() {
        let mut buf = MutableBuffer::new();
        buf.extend_from_slice(&[1, 2, 3]);

        let frozen = buf.take();
        assert_eq!(&[1, 2, 3], frozen.as_slice());
        assert!(frozen.capacity() >= 64);
        assert!(buf.is_empty());
    }
}
