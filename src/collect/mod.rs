//! Bounded aggregation containers
//!
//! Both containers here are keyed by fingerprints or snapshot identifiers
//! and back the streaming analyzers: the [`Multiset`] counts occurrences
//! under a distinct-key ceiling, the [`Multimap`] correlates records across
//! two traversals of the same dump.

mod multimap;
mod multiset;

pub use multimap::Multimap;
pub use multiset::Multiset;
