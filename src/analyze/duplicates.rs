//! Instance and array duplicate detection
//!
//! Instances group by class name, arrays by component type. Each group
//! owns a fingerprint multiset that prunes itself once its distinct-key
//! cardinality crosses the group ceiling. Pruning runs only when touching
//! a group that already exists; a group's first record goes in unpruned.

use std::collections::HashMap;

use crate::collect::Multiset;
use crate::dump::DumpVisitor;
use crate::fingerprint::{ArrayFingerprint, BlockFingerprint};
use crate::layout::{ClassData, Layouter};
use crate::report::{excess_table, DupRow};
use crate::AnalysisError;

/// Distinct-fingerprint ceiling per class or component group.
pub const GROUP_PRUNE_THRESHOLD: usize = 1_000_000;

struct InstanceGroup {
    payload_len: u32,
    contents: Multiset<BlockFingerprint>,
}

/// Finds instances of the same class with identical payload bytes.
pub struct InstanceDuplicates {
    groups: HashMap<String, InstanceGroup>,
}

impl std::fmt::Debug for InstanceDuplicates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstanceDuplicates")
            .field("groups", &self.groups.len())
            .finish()
    }
}

impl DumpVisitor for InstanceDuplicates {
    fn visit_instance(
        &mut self,
        _id: u64,
        _class_id: u64,
        bytes: &[u8],
        class_name: &str,
    ) -> Result<(), AnalysisError> {
        let fingerprint = BlockFingerprint::new(bytes);
        match self.groups.get_mut(class_name) {
            Some(group) => {
                group.contents.prune_for_size(GROUP_PRUNE_THRESHOLD);
                group.contents.add(fingerprint);
            }
            None => {
                let mut group = InstanceGroup {
                    payload_len: bytes.len() as u32,
                    contents: Multiset::new(),
                };
                group.contents.add(fingerprint);
                self.groups.insert(class_name.to_string(), group);
            }
        }
        Ok(())
    }
}

impl InstanceDuplicates {
    /// Empty analyzer.
    pub fn new() -> Self {
        Self {
            groups: HashMap::new(),
        }
    }

    /// Render one report block per class with duplicated payloads, keyed
    /// by total excess bytes for global ranking.
    pub fn compute(&self, layouter: &dyn Layouter) -> Vec<(String, u64)> {
        let mut blocks = Vec::new();
        for (name, group) in &self.groups {
            if !group.contents.keys().any(|k| group.contents.count(k) > 1) {
                continue;
            }

            let instance_size =
                layouter.size_of(&ClassData::instance(name.as_str(), group.payload_len));

            let mut duplicated: Vec<&BlockFingerprint> = group
                .contents
                .keys()
                .filter(|&k| group.contents.count(k) > 1)
                .collect();
            duplicated.sort_by(|&a, &b| {
                let count_a = group.contents.count(a);
                let count_b = group.contents.count(b);
                count_b.cmp(&count_a).then_with(|| a.order_key().cmp(&b.order_key()))
            });

            let rows: Vec<DupRow> = duplicated
                .iter()
                .map(|&fingerprint| {
                    let dups = group.contents.count(fingerprint) - 1;
                    DupRow {
                        dups,
                        bytes: dups * instance_size,
                        label: fingerprint.value(),
                    }
                })
                .collect();

            blocks.push(excess_table(&format!("{name} potential duplicates:"), &rows));
        }
        blocks
    }
}

/// Finds arrays of the same component type with identical length and
/// contents.
pub struct ArrayDuplicates {
    groups: HashMap<String, Multiset<ArrayFingerprint>>,
}

impl std::fmt::Debug for ArrayDuplicates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArrayDuplicates")
            .field("groups", &self.groups.len())
            .finish()
    }
}

impl DumpVisitor for ArrayDuplicates {
    fn visit_array(
        &mut self,
        _id: u64,
        component_type: &str,
        count: u32,
        bytes: &[u8],
    ) -> Result<(), AnalysisError> {
        let fingerprint = ArrayFingerprint::new(count, component_type, bytes);
        match self.groups.get_mut(component_type) {
            Some(group) => {
                group.prune_for_size(GROUP_PRUNE_THRESHOLD);
                group.add(fingerprint);
            }
            None => {
                let mut group = Multiset::new();
                group.add(fingerprint);
                self.groups.insert(component_type.to_string(), group);
            }
        }
        Ok(())
    }
}

impl ArrayDuplicates {
    /// Empty analyzer.
    pub fn new() -> Self {
        Self {
            groups: HashMap::new(),
        }
    }

    /// Render one report block per component type with duplicated arrays,
    /// keyed by total excess bytes for global ranking.
    pub fn compute(&self, layouter: &dyn Layouter) -> Vec<(String, u64)> {
        let mut blocks = Vec::new();
        for (component, group) in &self.groups {
            if !group.keys().any(|k| group.count(k) > 1) {
                continue;
            }

            // One layout query per distinct length.
            let mut len_to_size: HashMap<u32, u64> = HashMap::new();
            for key in group.keys() {
                len_to_size
                    .entry(key.length())
                    .or_insert_with(|| layouter.size_of(&ClassData::array(component, key.length())));
            }

            let mut duplicated: Vec<&ArrayFingerprint> =
                group.keys().filter(|&k| group.count(k) > 1).collect();
            duplicated.sort_by(|&a, &b| {
                let excess_a = (group.count(a) - 1) * len_to_size[&a.length()];
                let excess_b = (group.count(b) - 1) * len_to_size[&b.length()];
                excess_b
                    .cmp(&excess_a)
                    .then_with(|| a.order_key().cmp(&b.order_key()))
            });

            let rows: Vec<DupRow> = duplicated
                .iter()
                .map(|&fingerprint| {
                    let dups = group.count(fingerprint) - 1;
                    DupRow {
                        dups,
                        bytes: dups * len_to_size[&fingerprint.length()],
                        label: format!(
                            "{component}[{}] {}",
                            fingerprint.length(),
                            fingerprint.value()
                        ),
                    }
                })
                .collect();

            blocks.push(excess_table(
                &format!("{component}[] potential duplicates:"),
                &rows,
            ));
        }
        blocks
    }
}
