use std::fmt::Debug;
use std::marker::PhantomData;

use tessera_error::{Result, TesseraError};

use crate::buffer::{Buffer, MutableBuffer};

/// A fixed-width value stored little-endian.
pub trait PrimitiveType: Debug + Default + Copy + PartialEq + Send + Sync + 'static {
    /// Width in bytes.
    const WIDTH: usize;

    /// Read a value from exactly `WIDTH` little-endian bytes.
    fn from_le_slice(bytes: &[u8]) -> Self;

    fn write_le(&self, buf: &mut MutableBuffer);
}

macro_rules! impl_primitive_type {
    ($($t:ty),+) => {
        $(
            impl PrimitiveType for $t {
                const WIDTH: usize = std::mem::size_of::<$t>();

                fn from_le_slice(bytes: &[u8]) -> Self {
                    let mut raw = [0; std::mem::size_of::<$t>()];
                    raw.copy_from_slice(bytes);
                    <$t>::from_le_bytes(raw)
                }

                fn write_le(&self, buf: &mut MutableBuffer) {
                    buf.extend_from_slice(&self.to_le_bytes());
                }
            }
        )+
    };
}

impl_primitive_type!(i8, i16, i32, i64, u8, u16, u32, u64, f32, f64);

/// Fixed-width values in a single buffer.
///
/// Values are decoded on access so the buffer needs no particular alignment.
#[derive(Debug, Clone)]
pub struct PrimitiveStorage<T> {
    buffer: Buffer,
    len: usize,
    _type: PhantomData<T>,
}

impl<T: PrimitiveType> PrimitiveStorage<T> {
    /// Create storage for `len` values backed by `buffer`.
    ///
    /// The buffer may be longer than needed (padding).
    pub fn try_new(buffer: Buffer, len: usize) -> Result<Self> {
        let needed = len
            .checked_mul(T::WIDTH)
            .ok_or_else(|| TesseraError::new(format!("Too many values: {len}")))?;

        if buffer.len() < needed {
            return Err(TesseraError::new(format!(
                "Buffer too small for {len} values of width {}, have {} bytes",
                T::WIDTH,
                buffer.len()
            )));
        }

        Ok(PrimitiveStorage {
            buffer,
            len,
            _type: PhantomData,
        })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn buffer(&self) -> &Buffer {
        &self.buffer
    }

    /// Bytes covering exactly `len` values.
    pub fn data(&self) -> &[u8] {
        &self.buffer.as_slice()[..self.len * T::WIDTH]
    }

    pub fn get(&self, idx: usize) -> Option<T> {
        if idx >= self.len {
            return None;
        }
        let start = idx * T::WIDTH;
        Some(T::from_le_slice(
            &self.buffer.as_slice()[start..start + T::WIDTH],
        ))
    }

    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        self.data().chunks_exact(T::WIDTH).map(T::from_le_slice)
    }
}

impl<T: PrimitiveType> From<Vec<T>> for PrimitiveStorage<T> {
    fn from(value: Vec<T>) -> Self {
        let mut buf = MutableBuffer::with_capacity(value.len() * T::WIDTH);
        for v in &value {
            v.write_le(&mut buf);
        }

        PrimitiveStorage {
            buffer: buf.freeze(),
            len: value.len(),
            _type: PhantomData,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn little_endian_layout() {
        let storage = PrimitiveStorage::from(vec![1i32, 258]);
        assert_eq!(&[1, 0, 0, 0, 2, 1, 0, 0], storage.data());
        assert_eq!(Some(258), storage.get(1));
        assert_eq!(None, storage.get(2));
    }

    #[test]
    fn try_new_with_padding() {
        let buf = Buffer::from_vec(vec![10, 22, 33, 44, 0, 0, 0, 0]);
        let storage = PrimitiveStorage::<u8>::try_new(buf, 4).unwrap();
        assert_eq!(vec![10, 22, 33, 44], storage.iter().collect::<Vec<_>>());
    }

    #[test]
    fn try_new_too_small() {
        let buf = Buffer::from_vec(vec![0; 7]);
        assert!(PrimitiveStorage::<i64>::try_new(buf, 1).is_err());
    }
}
