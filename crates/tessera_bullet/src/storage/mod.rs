//! In-memory storage formats.

mod primitive;
pub use primitive::*;

mod varlen;
pub use varlen::*;

mod boolean;
pub use boolean::*;

mod list;
pub use list::*;

mod struct_storage;
pub use struct_storage::*;

/// Storage for an array of only nulls. Holds just the length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UntypedNullStorage(pub usize);

impl UntypedNullStorage {
    pub fn len(&self) -> usize {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}
