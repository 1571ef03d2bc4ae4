use crate::bitmap::Bitmap;

/// Bit packed boolean values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BooleanStorage(pub(crate) Bitmap);

impl BooleanStorage {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn value(&self, idx: usize) -> Option<bool> {
        if idx >= self.0.len() {
            return None;
        }
        Some(self.0.value(idx))
    }

    pub fn bitmap(&self) -> &Bitmap {
        &self.0
    }
}

impl From<Bitmap> for BooleanStorage {
    fn from(value: Bitmap) -> Self {
        BooleanStorage(value)
    }
}
