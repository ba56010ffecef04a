//! Record model, visitor fan-out, and the snapshot container
//!
//! A dump is consumed as a stream of visitor callbacks, one per record, in
//! file order. Analyzers implement [`DumpVisitor`] for the events they care
//! about; the [`MultiplexingVisitor`] broadcasts one traversal to all of
//! them so the file is read once no matter how many analyzers run.

mod reader;
mod writer;

pub use reader::{SnapshotReader, TraversalStats};
pub use writer::SnapshotWriter;

use crate::AnalysisError;

pub(crate) const MAGIC: &[u8; 8] = b"HEAPDUMP";
pub(crate) const VERSION: u32 = 1;

pub(crate) const TAG_CLASS: u8 = 0x01;
pub(crate) const TAG_INSTANCE: u8 = 0x02;
pub(crate) const TAG_ARRAY: u8 = 0x03;

/// Receiver for dump records.
///
/// The parser invokes exactly one method per record, in dump order, with no
/// events skipped or duplicated. Identifiers are stable only within one
/// traversal of the same dump. Every method defaults to a no-op so
/// analyzers only implement the events they consume; returning an error
/// aborts the traversal.
#[allow(unused_variables)]
pub trait DumpVisitor {
    /// A class descriptor: its reference-field byte offsets and the width
    /// of each reference field.
    fn visit_class(
        &mut self,
        id: u64,
        name: &str,
        ref_field_offsets: &[u32],
        ref_field_width: u32,
    ) -> Result<(), AnalysisError> {
        Ok(())
    }

    /// An instance record with its raw field payload.
    fn visit_instance(
        &mut self,
        id: u64,
        class_id: u64,
        bytes: &[u8],
        class_name: &str,
    ) -> Result<(), AnalysisError> {
        Ok(())
    }

    /// An array record with its raw element payload.
    fn visit_array(
        &mut self,
        id: u64,
        component_type: &str,
        count: u32,
        bytes: &[u8],
    ) -> Result<(), AnalysisError> {
        Ok(())
    }
}

/// Broadcasts each record to every registered visitor, in registration
/// order, synchronously, before the next record is accepted. Nothing is
/// buffered or reordered; the first visitor error aborts the traversal.
#[derive(Default)]
pub struct MultiplexingVisitor<'a> {
    visitors: Vec<&'a mut dyn DumpVisitor>,
}

impl std::fmt::Debug for MultiplexingVisitor<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultiplexingVisitor")
            .field("visitors", &self.visitors.len())
            .finish()
    }
}

impl<'a> MultiplexingVisitor<'a> {
    /// Create an empty fan-out.
    pub fn new() -> Self {
        Self {
            visitors: Vec::new(),
        }
    }

    /// Register a visitor. Delivery follows registration order.
    pub fn add(&mut self, visitor: &'a mut dyn DumpVisitor) {
        self.visitors.push(visitor);
    }
}

impl DumpVisitor for MultiplexingVisitor<'_> {
    fn visit_class(
        &mut self,
        id: u64,
        name: &str,
        ref_field_offsets: &[u32],
        ref_field_width: u32,
    ) -> Result<(), AnalysisError> {
        for visitor in &mut self.visitors {
            visitor.visit_class(id, name, ref_field_offsets, ref_field_width)?;
        }
        Ok(())
    }

    fn visit_instance(
        &mut self,
        id: u64,
        class_id: u64,
        bytes: &[u8],
        class_name: &str,
    ) -> Result<(), AnalysisError> {
        for visitor in &mut self.visitors {
            visitor.visit_instance(id, class_id, bytes, class_name)?;
        }
        Ok(())
    }

    fn visit_array(
        &mut self,
        id: u64,
        component_type: &str,
        count: u32,
        bytes: &[u8],
    ) -> Result<(), AnalysisError> {
        for visitor in &mut self.visitors {
            visitor.visit_array(id, component_type, count, bytes)?;
        }
        Ok(())
    }
}
