//! In-memory columnar storage behind the post and tag adapters.
//!
//! A [`Frame`] is an immutable, shareable set of text columns plus a row
//! selection; filtering only produces a new selection. A [`Source`] is either
//! such a frame or a [`LazyFrame`], which records the pending steps and runs
//! them on the first terminal call.

mod frame;
mod plan;
mod predicate;
mod source;
#[cfg(test)]
pub(crate) mod testing;

pub use frame::{Frame, Row};
pub use plan::{LazyFrame, Scan, Step};
pub use predicate::Predicate;
pub use source::Source;
