//! Core types and trait definitions for the Tally projection pipeline.
//!
//! This crate is free of storage and runtime dependencies. It owns the
//! relational projection model, source-document decoding, the phasers that
//! turn a source document into projections, and the `ProjectionStore` seam
//! that storage backends implement.

// Native `async fn` in traits; the trait methods spell out their `Send`
// bounds explicitly.
#![allow(async_fn_in_trait)]

pub mod effect;
pub mod error;
pub mod kind;
pub mod model;
pub mod phase;
pub mod projection;
pub mod source;
pub mod store;
pub mod topic;

pub use error::{Error, Result};
pub use kind::TransactionKind;
