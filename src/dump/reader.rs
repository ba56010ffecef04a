//! Streaming snapshot reader
//!
//! Decodes the `HEAPDUMP` container record by record and feeds a
//! [`DumpVisitor`]. Only one record payload is resident at a time, so
//! dumps far larger than memory stream through in a single pass. All
//! integers are big-endian; strings are u16-length UTF-8.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use tracing::info;

use super::{DumpVisitor, MAGIC, TAG_ARRAY, TAG_CLASS, TAG_INSTANCE, VERSION};
use crate::AnalysisError;

/// Largest record payload the reader will buffer. Anything bigger is a
/// corrupt length field, not a real record.
const MAX_PAYLOAD: u32 = 1 << 30;

/// Record counts observed in one traversal.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TraversalStats {
    /// Class descriptor records seen.
    pub classes: u64,
    /// Instance records seen.
    pub instances: u64,
    /// Array records seen.
    pub arrays: u64,
}

impl TraversalStats {
    /// Total records of any kind.
    pub fn records(&self) -> u64 {
        self.classes + self.instances + self.arrays
    }
}

/// Streaming reader over a snapshot container.
#[derive(Debug)]
pub struct SnapshotReader<R> {
    input: R,
    offset: u64,
    payload: Vec<u8>,
}

impl SnapshotReader<BufReader<File>> {
    /// Open a snapshot file for streaming.
    pub fn open(path: &Path) -> Result<Self, AnalysisError> {
        let file = File::open(path)?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: Read> SnapshotReader<R> {
    /// Wrap any byte stream positioned at the container header.
    pub fn new(input: R) -> Self {
        Self {
            input,
            offset: 0,
            payload: Vec::new(),
        }
    }

    /// Traverse the whole snapshot, invoking `visitor` once per record in
    /// file order. Visitor errors and malformed input abort the traversal.
    pub fn parse(&mut self, visitor: &mut dyn DumpVisitor) -> Result<TraversalStats, AnalysisError> {
        let mut magic = [0u8; 8];
        self.read_exact(&mut magic)?;
        if &magic != MAGIC {
            return Err(AnalysisError::BadMagic);
        }
        let version = self.read_u32()?;
        if version != VERSION {
            return Err(AnalysisError::UnsupportedVersion(version));
        }

        let mut stats = TraversalStats::default();
        while let Some(tag) = self.next_tag()? {
            match tag {
                TAG_CLASS => {
                    self.read_class(visitor)?;
                    stats.classes += 1;
                }
                TAG_INSTANCE => {
                    self.read_instance(visitor)?;
                    stats.instances += 1;
                }
                TAG_ARRAY => {
                    self.read_array(visitor)?;
                    stats.arrays += 1;
                }
                other => {
                    return Err(AnalysisError::Format {
                        offset: self.offset - 1,
                        reason: format!("unknown record tag 0x{other:02x}"),
                    })
                }
            }
        }

        info!(
            classes = stats.classes,
            instances = stats.instances,
            arrays = stats.arrays,
            "snapshot traversal complete"
        );
        Ok(stats)
    }

    fn read_class(&mut self, visitor: &mut dyn DumpVisitor) -> Result<(), AnalysisError> {
        let id = self.read_u64()?;
        let name = self.read_string()?;
        let field_count = self.read_u16()?;
        let mut offsets = Vec::with_capacity(usize::from(field_count));
        for _ in 0..field_count {
            offsets.push(self.read_u32()?);
        }
        let ref_width = self.read_u32()?;
        visitor.visit_class(id, &name, &offsets, ref_width)
    }

    fn read_instance(&mut self, visitor: &mut dyn DumpVisitor) -> Result<(), AnalysisError> {
        let id = self.read_u64()?;
        let class_id = self.read_u64()?;
        let name = self.read_string()?;
        let len = self.read_u32()?;
        self.read_payload(len)?;
        visitor.visit_instance(id, class_id, &self.payload, &name)
    }

    fn read_array(&mut self, visitor: &mut dyn DumpVisitor) -> Result<(), AnalysisError> {
        let id = self.read_u64()?;
        let component = self.read_string()?;
        let count = self.read_u32()?;
        let len = self.read_u32()?;
        self.read_payload(len)?;
        visitor.visit_array(id, &component, count, &self.payload)
    }

    /// Next record tag, or `None` at a clean end of input.
    fn next_tag(&mut self) -> Result<Option<u8>, AnalysisError> {
        let mut byte = [0u8; 1];
        loop {
            match self.input.read(&mut byte) {
                Ok(0) => return Ok(None),
                Ok(_) => {
                    self.offset += 1;
                    return Ok(Some(byte[0]));
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), AnalysisError> {
        match self.input.read_exact(buf) {
            Ok(()) => {
                self.offset += buf.len() as u64;
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Err(AnalysisError::Truncated {
                offset: self.offset,
            }),
            Err(e) => Err(e.into()),
        }
    }

    fn read_u16(&mut self) -> Result<u16, AnalysisError> {
        let mut raw = [0u8; 2];
        self.read_exact(&mut raw)?;
        Ok(u16::from_be_bytes(raw))
    }

    fn read_u32(&mut self) -> Result<u32, AnalysisError> {
        let mut raw = [0u8; 4];
        self.read_exact(&mut raw)?;
        Ok(u32::from_be_bytes(raw))
    }

    fn read_u64(&mut self) -> Result<u64, AnalysisError> {
        let mut raw = [0u8; 8];
        self.read_exact(&mut raw)?;
        Ok(u64::from_be_bytes(raw))
    }

    fn read_string(&mut self) -> Result<String, AnalysisError> {
        let len = self.read_u16()?;
        let mut raw = vec![0u8; usize::from(len)];
        self.read_exact(&mut raw)?;
        String::from_utf8(raw).map_err(|_| AnalysisError::Format {
            offset: self.offset,
            reason: "name is not valid UTF-8".to_string(),
        })
    }

    /// Read `len` payload bytes into the reusable record buffer.
    fn read_payload(&mut self, len: u32) -> Result<(), AnalysisError> {
        if len > MAX_PAYLOAD {
            return Err(AnalysisError::Format {
                offset: self.offset,
                reason: format!("payload length {len} exceeds the record limit"),
            });
        }
        self.payload.resize(len as usize, 0);
        match self.input.read_exact(&mut self.payload) {
            Ok(()) => {
                self.offset += u64::from(len);
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Err(AnalysisError::Truncated {
                offset: self.offset,
            }),
            Err(e) => Err(e.into()),
        }
    }
}
