//! Streaming analyzers
//!
//! Each analyzer implements [`crate::dump::DumpVisitor`] for the record
//! kinds it consumes, aggregates into its own bounded containers during
//! the traversal, and renders its projection afterwards through a
//! [`crate::layout::Layouter`].

mod boxes;
mod duplicates;
mod strings;

pub use boxes::{jvm_boxes, BoxAnalyzer, BoxClass};
pub use duplicates::{ArrayDuplicates, InstanceDuplicates, GROUP_PRUNE_THRESHOLD};
pub use strings::{StringScan, StringValueScan, DEFAULT_STRING_CLASS};
