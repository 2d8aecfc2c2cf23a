//! Hashing primitives shared by the arbor verifiable data structures.

#![warn(rust_2018_idioms, unused_lifetimes)]
#![warn(unused_qualifications, missing_docs)]
#![warn(clippy::all, clippy::panic)]
#![forbid(unsafe_code, clippy::expect_used)]

pub mod hash;
mod visit_bytes;

pub use visit_bytes::{ByteVisitor, VisitBytes};
