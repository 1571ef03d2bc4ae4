use tessera_error::{ErrorKind, Result, TesseraError};

use crate::array::Array;

/// Storage for structs, one child array per field.
#[derive(Debug, Clone)]
pub struct StructStorage {
    pub(crate) len: usize,
    pub(crate) children: Vec<Array>,
}

impl StructStorage {
    pub fn try_new(len: usize, children: Vec<Array>) -> Result<Self> {
        for (idx, child) in children.iter().enumerate() {
            if child.len() != len {
                return Err(TesseraError::of_kind(
                    ErrorKind::LengthMismatch,
                    format!(
                        "Struct child {idx} has length {}, expected {len}",
                        child.len()
                    ),
                ));
            }
        }

        Ok(StructStorage { len, children })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn children(&self) -> &[Array] {
        &self.children
    }
}
