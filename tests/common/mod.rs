#![allow(dead_code)]

use std::io::Cursor;

use heapdup::dump::{DumpVisitor, SnapshotReader, SnapshotWriter, TraversalStats};

/// Builds small synthetic snapshots record by record.
pub struct DumpBuilder {
    writer: SnapshotWriter<Vec<u8>>,
    next_id: u64,
}

impl DumpBuilder {
    pub fn new() -> Self {
        Self {
            writer: SnapshotWriter::new(Vec::new()).expect("in-memory writer"),
            next_id: 1000,
        }
    }

    fn fresh_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    pub fn class(&mut self, id: u64, name: &str, ref_field_offsets: &[u32], ref_field_width: u32) {
        self.writer
            .class(id, name, ref_field_offsets, ref_field_width)
            .expect("class record");
    }

    pub fn instance(&mut self, class_id: u64, class_name: &str, payload: &[u8]) -> u64 {
        let id = self.fresh_id();
        self.writer
            .instance(id, class_id, class_name, payload)
            .expect("instance record");
        id
    }

    pub fn array(&mut self, id: u64, component: &str, count: u32, payload: &[u8]) {
        self.writer
            .array(id, component, count, payload)
            .expect("array record");
    }

    /// An integer wrapper instance holding `value`.
    pub fn int_box(&mut self, value: i32) -> u64 {
        self.instance(1, "java.lang.Integer", &value.to_be_bytes())
    }

    /// A string wrapper whose 8-byte reference field at offset 4 points at
    /// `value_array_id`.
    pub fn string_wrapper(&mut self, class_id: u64, value_array_id: u64) -> u64 {
        let mut payload = vec![0u8; 4];
        payload.extend_from_slice(&value_array_id.to_be_bytes());
        self.instance(class_id, "java.lang.String", &payload)
    }

    pub fn finish(self) -> Vec<u8> {
        self.writer.finish().expect("finish snapshot")
    }
}

/// Run one full traversal of an in-memory snapshot.
pub fn traverse(bytes: &[u8], visitor: &mut dyn DumpVisitor) -> TraversalStats {
    SnapshotReader::new(Cursor::new(bytes))
        .parse(visitor)
        .expect("snapshot parses")
}

/// Extract the leading numeric columns of every table row in a rendered
/// report block. Header, rule, and title lines parse as no numbers and are
/// skipped.
pub fn numeric_rows(text: &str, columns: usize) -> Vec<Vec<i64>> {
    let mut rows = Vec::new();
    for line in text.lines() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < columns {
            continue;
        }
        let parsed: Vec<i64> = fields
            .iter()
            .take(columns)
            .filter_map(|f| f.parse::<i64>().ok())
            .collect();
        if parsed.len() == columns {
            rows.push(parsed);
        }
    }
    rows
}
