//! This crate contains the arbor history-authenticating data structures:
//! an append-only Merkle [`tree`](crate::tree) with membership and
//! incremental (consistency) proofs, and an append-only key/value
//! [overlay](crate::kv) stored in such a tree.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(rust_2018_idioms, unused_lifetimes)]
#![warn(unused_qualifications, missing_docs)]
#![warn(clippy::all, clippy::panic)]
#![forbid(unsafe_code, clippy::expect_used)]

pub mod kv;
pub mod tree;
