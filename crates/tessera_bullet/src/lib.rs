//! A suspiciously Arrow-like columnar memory format, with readers and writers
//! for Arrow's ipc stream and file formats.
pub mod array;
pub mod batch;
pub mod bitmap;
pub mod buffer;
pub mod builder;
pub mod datatype;
pub mod field;
pub mod format;
pub mod ipc;
pub mod scalar;
pub mod storage;
pub mod testutil;
