//! # Heap snapshot redundancy analysis
//!
//! This library reads a streamed heap snapshot (instances, arrays, class
//! descriptors) and looks for redundant data: repeated scalar-wrapper
//! values, repeated instance and array payloads, and repeated string
//! contents. For each category it projects the memory that various caching
//! or deduplication policies would recover.
//!
//! The engine is built for dumps far larger than available memory:
//!
//! 1. **Single traversal, many analyzers**: a [`dump::MultiplexingVisitor`]
//!    broadcasts every record to all registered analyzers in one pass.
//! 2. **Content fingerprints**: records collapse into compact multiset keys
//!    ([`fingerprint`]): exact values for small payloads, 64-bit hashes
//!    otherwise.
//! 3. **Bounded aggregation**: per-group [`collect::Multiset`]s prune
//!    themselves once their distinct-key cardinality crosses a ceiling.
//! 4. **Layout seam**: byte footprints come from a [`layout::Layouter`]
//!    oracle, never from the analyzers themselves.
//!
//! ## Usage Example
//!
//! ```ignore
//! use heapdup::analyze::{jvm_boxes, BoxAnalyzer};
//! use heapdup::dump::{MultiplexingVisitor, SnapshotReader};
//! use heapdup::layout::{MarginalCosts, ModelLayouter};
//!
//! let layouter = ModelLayouter::new();
//! let costs = MarginalCosts::measure(&layouter);
//! let mut analyzers: Vec<_> =
//!     jvm_boxes().into_iter().map(|c| BoxAnalyzer::new(c, costs)).collect();
//! let mut mv = MultiplexingVisitor::new();
//! for a in &mut analyzers {
//!     mv.add(a);
//! }
//! SnapshotReader::open("heap.hdmp".as_ref())?.parse(&mut mv)?;
//! ```

#![warn(missing_docs, missing_debug_implementations)]
#![allow(clippy::new_without_default)]

// Core modules - leaf structures first, analyzers on top
pub mod collect; // bounded multiset, correlation multimap
pub mod fingerprint; // content-equality keys for heap records
pub mod layout; // shape keys, layout-engine seam, calibration
pub mod dump; // record model, visitor fan-out, snapshot container
pub mod analyze; // box / duplicate / string-dedup analyzers
pub mod report; // fixed-width table rendering

// Re-exports for convenience
pub use analyze::{ArrayDuplicates, BoxAnalyzer, InstanceDuplicates, StringScan, StringValueScan};
pub use collect::{Multimap, Multiset};
pub use dump::{DumpVisitor, MultiplexingVisitor, SnapshotReader, SnapshotWriter};
pub use layout::{ClassData, Layouter, MarginalCosts, ModelLayouter};

use thiserror::Error;

/// Errors raised while reading a snapshot or analyzing its records.
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// Underlying I/O failure while streaming the snapshot.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The input does not start with the snapshot magic.
    #[error("not a heap snapshot (bad magic)")]
    BadMagic,

    /// The snapshot container version is not supported.
    #[error("unsupported snapshot version {0}")]
    UnsupportedVersion(u32),

    /// Structurally invalid record data.
    #[error("malformed snapshot at offset {offset}: {reason}")]
    Format {
        /// Byte offset of the offending record.
        offset: u64,
        /// What was wrong with it.
        reason: String,
    },

    /// The snapshot ended in the middle of a record.
    #[error("truncated snapshot at offset {offset}")]
    Truncated {
        /// Byte offset where input ran out.
        offset: u64,
    },

    /// A scalar wrapper payload was shorter than its declared width.
    #[error("scalar payload too short: expected {expected} bytes, got {actual}")]
    ScalarWidth {
        /// Bytes required by the wrapper's value width.
        expected: usize,
        /// Bytes actually present in the record.
        actual: usize,
    },

    /// The string wrapper class does not have exactly one reference field.
    #[error("string wrapper class has {fields} reference fields, expected exactly one")]
    StringShape {
        /// Number of reference fields the descriptor declared.
        fields: usize,
    },

    /// The string wrapper's reference field width is not 32- or 64-bit.
    #[error("unsupported reference field width: {0} bytes")]
    RefWidth(u32),

    /// A string wrapper instance payload ends before its reference field.
    #[error("wrapper payload ends before the reference field at offset {offset}")]
    RefFieldBounds {
        /// Byte offset of the reference field within the payload.
        offset: u32,
    },
}
