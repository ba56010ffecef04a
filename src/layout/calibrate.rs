//! Marginal-cost calibration for cache projections
//!
//! A value cache is not free: an array-backed cache pays for its backing
//! array slots, a map-backed cache pays for its entry nodes and table. Both
//! per-unit costs are measured once at startup by sizing a synthetic
//! population through the layout engine, then passed by value to every
//! analyzer that projects savings.

use tracing::debug;

use super::{ClassData, Layouter};

/// Synthetic population used for the measurements.
const POPULATION: u32 = 1_000_000;

/// Measured per-unit overhead of candidate cache containers.
#[derive(Debug, Clone, Copy)]
pub struct MarginalCosts {
    /// Bytes one entry adds to a map-backed cache (entry node plus its
    /// amortized share of the table).
    pub map_entry: i64,
    /// Bytes one slot adds to an array-backed cache.
    pub array_slot: i64,
}

impl MarginalCosts {
    /// Measure both costs against a layout engine.
    ///
    /// The array cost amortizes a million-slot reference array over its
    /// slots. The map cost sizes a million-entry hash map population
    /// (entry nodes plus table growth from the initial capacity) without
    /// the boxed keys themselves, which the savings sweep already counts.
    pub fn measure(layouter: &dyn Layouter) -> Self {
        let slots = layouter.size_of(&ClassData::array("java.lang.Object", POPULATION));
        let array_slot = (slots / u64::from(POPULATION)) as i64;

        // Reference width, recovered from array growth between two aligned
        // sizes rather than assumed.
        let grown = layouter.size_of(&ClassData::array("java.lang.Object", 16));
        let base = layouter.size_of(&ClassData::array("java.lang.Object", 8));
        let reference = ((grown - base) / 8) as u32;

        // One chained map entry: 32-bit cached hash plus key, value, and
        // next references.
        let node = ClassData::instance("java.util.HashMap$Node", 4 + 3 * reference);
        let node_size = layouter.size_of(&node) as i64;

        let table_full =
            layouter.size_of(&ClassData::array("java.util.HashMap$Node", table_capacity(POPULATION)));
        let table_empty = layouter.size_of(&ClassData::array("java.util.HashMap$Node", 16));
        let table_share = ((table_full - table_empty) / u64::from(POPULATION)) as i64;

        let costs = Self {
            map_entry: node_size + table_share,
            array_slot,
        };
        debug!(
            map_entry = costs.map_entry,
            array_slot = costs.array_slot,
            "calibrated cache marginal costs"
        );
        costs
    }
}

/// Smallest power-of-two table that holds `entries` under a 0.75 load
/// factor.
fn table_capacity(entries: u32) -> u32 {
    let mut capacity: u64 = 16;
    while u64::from(entries) * 4 > capacity * 3 {
        capacity *= 2;
    }
    capacity as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::ModelLayouter;

    #[test]
    fn table_capacity_respects_load_factor() {
        assert_eq!(table_capacity(12), 16);
        assert_eq!(table_capacity(13), 32);
        assert_eq!(table_capacity(1_000_000), 1 << 21);
    }

    #[test]
    fn costs_are_positive_under_the_model() {
        let costs = MarginalCosts::measure(&ModelLayouter::new());
        assert!(costs.array_slot > 0);
        // An entry costs at least its node.
        assert!(costs.map_entry >= costs.array_slot);
    }

    #[test]
    fn array_slot_amortizes_to_reference_width() {
        let costs = MarginalCosts::measure(&ModelLayouter::new());
        assert_eq!(costs.array_slot, ModelLayouter::REFERENCE as i64);
    }
}
