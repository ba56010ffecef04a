//! Snapshot writer
//!
//! Mirror of the reader, used to produce synthetic dumps for tests and
//! fixtures. Field order and byte order match [`super::SnapshotReader`]
//! exactly.

use std::io::{self, Write};

use super::{MAGIC, TAG_ARRAY, TAG_CLASS, TAG_INSTANCE, VERSION};
use crate::AnalysisError;

/// Sequential writer for the snapshot container.
#[derive(Debug)]
pub struct SnapshotWriter<W: Write> {
    out: W,
}

impl<W: Write> SnapshotWriter<W> {
    /// Start a snapshot, writing the container header.
    pub fn new(mut out: W) -> Result<Self, AnalysisError> {
        out.write_all(MAGIC)?;
        out.write_all(&VERSION.to_be_bytes())?;
        Ok(Self { out })
    }

    /// Append a class descriptor record.
    pub fn class(
        &mut self,
        id: u64,
        name: &str,
        ref_field_offsets: &[u32],
        ref_field_width: u32,
    ) -> Result<(), AnalysisError> {
        self.out.write_all(&[TAG_CLASS])?;
        self.out.write_all(&id.to_be_bytes())?;
        self.write_string(name)?;
        let count = u16::try_from(ref_field_offsets.len())
            .map_err(|_| invalid("too many reference fields for one class record"))?;
        self.out.write_all(&count.to_be_bytes())?;
        for offset in ref_field_offsets {
            self.out.write_all(&offset.to_be_bytes())?;
        }
        self.out.write_all(&ref_field_width.to_be_bytes())?;
        Ok(())
    }

    /// Append an instance record.
    pub fn instance(
        &mut self,
        id: u64,
        class_id: u64,
        class_name: &str,
        payload: &[u8],
    ) -> Result<(), AnalysisError> {
        self.out.write_all(&[TAG_INSTANCE])?;
        self.out.write_all(&id.to_be_bytes())?;
        self.out.write_all(&class_id.to_be_bytes())?;
        self.write_string(class_name)?;
        self.write_payload(payload)
    }

    /// Append an array record. `count` is the element count, independent of
    /// the payload byte length.
    pub fn array(
        &mut self,
        id: u64,
        component_type: &str,
        count: u32,
        payload: &[u8],
    ) -> Result<(), AnalysisError> {
        self.out.write_all(&[TAG_ARRAY])?;
        self.out.write_all(&id.to_be_bytes())?;
        self.write_string(component_type)?;
        self.out.write_all(&count.to_be_bytes())?;
        self.write_payload(payload)
    }

    /// Flush and return the underlying sink.
    pub fn finish(mut self) -> Result<W, AnalysisError> {
        self.out.flush()?;
        Ok(self.out)
    }

    fn write_string(&mut self, value: &str) -> Result<(), AnalysisError> {
        let len = u16::try_from(value.len())
            .map_err(|_| invalid("name longer than a u16 length field"))?;
        self.out.write_all(&len.to_be_bytes())?;
        self.out.write_all(value.as_bytes())?;
        Ok(())
    }

    fn write_payload(&mut self, payload: &[u8]) -> Result<(), AnalysisError> {
        let len = u32::try_from(payload.len())
            .map_err(|_| invalid("payload longer than a u32 length field"))?;
        self.out.write_all(&len.to_be_bytes())?;
        self.out.write_all(payload)?;
        Ok(())
    }
}

fn invalid(reason: &str) -> AnalysisError {
    AnalysisError::Io(io::Error::new(io::ErrorKind::InvalidInput, reason.to_string()))
}
