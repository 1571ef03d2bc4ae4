//! Flatbuffer tables for the subset of Arrow's `Schema.fbs`, `Message.fbs` and
//! `File.fbs` that tessera reads and writes.
//!
//! The API follows the shape of `flatc --rust` output: tables are thin wrappers
//! around `flatbuffers::Table` with typed accessors, builders push slots into a
//! `FlatBufferBuilder`, and every table is `Verifiable` so that `root_as_*`
//! rejects malformed input before any accessor runs.
//!
//! Enum and union discriminants use Arrow's numbering.

#![allow(non_snake_case, non_camel_case_types)]

#[macro_use]
mod macros;

pub mod file;
pub mod message;
pub mod schema;
