//! Two-pass string-content deduplication analysis
//!
//! The value array a string wrapper points at is a separate record, visited
//! independently of the wrapper itself, so the analysis takes two strictly
//! sequential traversals of the same dump. Pass one ([`StringScan`]) finds
//! the wrapper class, decodes each wrapper's reference field, and records
//! which value array it points at. Pass two ([`StringValueScan`]) holds
//! that correlation read-only and fingerprints exactly the arrays it names.

use std::collections::HashMap;

use crate::collect::{Multimap, Multiset};
use crate::dump::DumpVisitor;
use crate::fingerprint::StringFingerprint;
use crate::layout::{ClassData, Layouter};
use crate::report::{RULE, TOP_ROWS};
use crate::AnalysisError;

/// Wrapper class scanned when none is configured.
pub const DEFAULT_STRING_CLASS: &str = "java.lang.String";

/// Pass one: correlate value-array ids with the wrapper instances that
/// reference them.
#[derive(Debug)]
pub struct StringScan {
    wrapper_class: String,
    class_id: Option<u64>,
    value_offset: u32,
    ref_width: u32,
    wrapper_payload_len: Option<u32>,
    values_to_wrappers: Multimap<u64, u64>,
}

impl DumpVisitor for StringScan {
    fn visit_class(
        &mut self,
        id: u64,
        name: &str,
        ref_field_offsets: &[u32],
        ref_field_width: u32,
    ) -> Result<(), AnalysisError> {
        if name == self.wrapper_class {
            if ref_field_offsets.len() != 1 {
                return Err(AnalysisError::StringShape {
                    fields: ref_field_offsets.len(),
                });
            }
            if ref_field_width != 4 && ref_field_width != 8 {
                return Err(AnalysisError::RefWidth(ref_field_width));
            }
            self.class_id = Some(id);
            self.value_offset = ref_field_offsets[0];
            self.ref_width = ref_field_width;
        }
        Ok(())
    }

    fn visit_instance(
        &mut self,
        id: u64,
        class_id: u64,
        bytes: &[u8],
        _class_name: &str,
    ) -> Result<(), AnalysisError> {
        if Some(class_id) != self.class_id {
            return Ok(());
        }
        let start = self.value_offset as usize;
        let end = start + self.ref_width as usize;
        let field = bytes.get(start..end).ok_or(AnalysisError::RefFieldBounds {
            offset: self.value_offset,
        })?;

        let value_id = match self.ref_width {
            4 => u64::from(u32::from_be_bytes([field[0], field[1], field[2], field[3]])),
            _ => {
                let mut raw = [0u8; 8];
                raw.copy_from_slice(field);
                u64::from_be_bytes(raw)
            }
        };

        if self.wrapper_payload_len.is_none() {
            self.wrapper_payload_len = Some(bytes.len() as u32);
        }
        self.values_to_wrappers.put(value_id, id);
        Ok(())
    }
}

impl StringScan {
    /// Scan for `wrapper_class` instances.
    pub fn new(wrapper_class: impl Into<String>) -> Self {
        Self {
            wrapper_class: wrapper_class.into(),
            class_id: None,
            value_offset: 0,
            ref_width: 0,
            wrapper_payload_len: None,
            values_to_wrappers: Multimap::new(),
        }
    }

    /// Distinct value arrays referenced by at least one wrapper so far.
    pub fn referenced_value_arrays(&self) -> usize {
        self.values_to_wrappers.key_len()
    }

    /// Finalize pass one and build the pass-two visitor. The correlation
    /// becomes read-only from here on.
    pub fn into_value_scan(self) -> StringValueScan {
        StringValueScan {
            wrapper_class: self.wrapper_class,
            wrapper_payload_len: self.wrapper_payload_len,
            correlation: self.values_to_wrappers,
            contents: Multiset::new(),
        }
    }
}

/// Pass two: fingerprint the value arrays named by pass one and project
/// deduplication savings.
#[derive(Debug)]
pub struct StringValueScan {
    wrapper_class: String,
    wrapper_payload_len: Option<u32>,
    correlation: Multimap<u64, u64>,
    contents: Multiset<StringFingerprint>,
}

impl DumpVisitor for StringValueScan {
    fn visit_array(
        &mut self,
        id: u64,
        component_type: &str,
        count: u32,
        bytes: &[u8],
    ) -> Result<(), AnalysisError> {
        if self.correlation.contains(&id) {
            let wrapper_refs = self.correlation.get(&id).len() as u32;
            self.contents
                .add(StringFingerprint::new(count, component_type, bytes, wrapper_refs));
        }
        Ok(())
    }
}

impl StringValueScan {
    /// Distinct string contents observed.
    pub fn distinct_contents(&self) -> usize {
        self.contents.distinct_len()
    }

    /// Render the dedup projection. Each duplicate row carries two byte
    /// totals: the value arrays alone, and arrays plus the wrapper objects
    /// that sharing identical content would also let collapse.
    pub fn report(&self, layouter: &dyn Layouter) -> String {
        // One layout query per distinct (component, length) shape.
        let mut shape_sizes: HashMap<(&str, u32), u64> = HashMap::new();
        for key in self.contents.keys() {
            shape_sizes
                .entry((key.component(), key.length()))
                .or_insert_with(|| layouter.size_of(&ClassData::array(key.component(), key.length())));
        }

        let wrapper_size = match self.wrapper_payload_len {
            Some(payload) => {
                layouter.size_of(&ClassData::instance(self.wrapper_class.as_str(), payload))
            }
            None => 0,
        };

        let mut duplicated: Vec<&StringFingerprint> = self
            .contents
            .keys()
            .filter(|&k| self.contents.count(k) > 1)
            .collect();
        duplicated.sort_by(|&a, &b| {
            let excess_a = (self.contents.count(a) - 1) * shape_sizes[&(a.component(), a.length())];
            let excess_b = (self.contents.count(b) - 1) * shape_sizes[&(b.component(), b.length())];
            excess_b
                .cmp(&excess_a)
                .then_with(|| a.order_key().cmp(&b.order_key()))
        });

        let mut out = String::new();
        out.push_str(&format!("{} potential duplicates:\n", self.wrapper_class));
        out.push_str(&format!(
            " {:>13} {:>13} {:>13} {:>13}   {}\n",
            "DUPS", "ARRAY BYTES", "TOTAL BYTES", "LENGTH", "VALUE"
        ));
        out.push_str(RULE);
        out.push('\n');

        let mut total_dups = 0u64;
        let mut total_array_bytes = 0u64;
        let mut total_full_bytes = 0u64;
        let mut shown_dups = 0u64;
        let mut shown_array_bytes = 0u64;
        let mut shown_full_bytes = 0u64;

        for (index, &fingerprint) in duplicated.iter().enumerate() {
            let dups = self.contents.count(fingerprint) - 1;
            let array_bytes = dups * shape_sizes[&(fingerprint.component(), fingerprint.length())];
            let full_bytes = array_bytes + dups * wrapper_size;

            total_dups += dups;
            total_array_bytes += array_bytes;
            total_full_bytes += full_bytes;

            if index < TOP_ROWS {
                let suffix = if fingerprint.is_truncated() { "..." } else { "" };
                out.push_str(&format!(
                    " {:>13} {:>13} {:>13} {:>13}   {}{}\n",
                    dups,
                    array_bytes,
                    full_bytes,
                    fingerprint.length(),
                    fingerprint.text(),
                    suffix
                ));
                shown_dups += dups;
                shown_array_bytes += array_bytes;
                shown_full_bytes += full_bytes;
            }
        }

        if duplicated.len() > TOP_ROWS {
            out.push_str(&format!(
                " {:>13} {:>13} {:>13} {:>13}   {}\n",
                total_dups - shown_dups,
                total_array_bytes - shown_array_bytes,
                total_full_bytes - shown_full_bytes,
                "",
                "<other>"
            ));
        }
        out.push_str(&format!(
            " {:>13} {:>13} {:>13} {:>13}   {}\n",
            total_dups, total_array_bytes, total_full_bytes, "", "<total>"
        ));
        out.push('\n');
        out
    }
}
