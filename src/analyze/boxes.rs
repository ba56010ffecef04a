//! Scalar-wrapper duplicate analysis and cache projections
//!
//! One analyzer instance watches one wrapper class, counting every distinct
//! boxed value it sees. The report then answers two questions: how much
//! memory do duplicated boxes waste, and how much of that a value cache
//! would recover, either as a contiguous low-value range cache (the
//! autobox policy) or as a most-frequent-value map cache, once the
//! cache's own per-entry cost is subtracted.

use crate::collect::Multiset;
use crate::dump::DumpVisitor;
use crate::fingerprint::{ScalarKind, ScalarValue};
use crate::layout::{wrapper_payload, ClassData, Layouter, MarginalCosts};
use crate::report::RULE;
use crate::AnalysisError;

/// A scalar wrapper class: its name in the dump and the value width it
/// boxes.
#[derive(Debug, Clone)]
pub struct BoxClass {
    /// Fully qualified class name as it appears in instance records.
    pub name: String,
    /// Width and interpretation of the boxed value.
    pub kind: ScalarKind,
}

impl BoxClass {
    /// Describe a wrapper class.
    pub fn new(name: impl Into<String>, kind: ScalarKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// The standard JVM wrapper classes.
pub fn jvm_boxes() -> Vec<BoxClass> {
    vec![
        BoxClass::new("java.lang.Boolean", ScalarKind::Boolean),
        BoxClass::new("java.lang.Byte", ScalarKind::Byte),
        BoxClass::new("java.lang.Short", ScalarKind::Short),
        BoxClass::new("java.lang.Character", ScalarKind::Char),
        BoxClass::new("java.lang.Integer", ScalarKind::Int),
        BoxClass::new("java.lang.Float", ScalarKind::Float),
        BoxClass::new("java.lang.Long", ScalarKind::Long),
        BoxClass::new("java.lang.Double", ScalarKind::Double),
    ]
}

/// Cache-size sweep: powers of two from 256 up to 2^30.
fn cache_limits() -> Vec<u64> {
    (8..=30).map(|power| 1u64 << power).collect()
}

/// Counts boxed values for one wrapper class and projects cache savings.
#[derive(Debug)]
pub struct BoxAnalyzer {
    class: BoxClass,
    values: Multiset<ScalarValue>,
    costs: MarginalCosts,
}

impl DumpVisitor for BoxAnalyzer {
    fn visit_instance(
        &mut self,
        _id: u64,
        _class_id: u64,
        bytes: &[u8],
        class_name: &str,
    ) -> Result<(), AnalysisError> {
        if class_name == self.class.name {
            let value = self.class.kind.decode(bytes)?;
            self.values.add(value);
        }
        Ok(())
    }
}

impl BoxAnalyzer {
    /// Analyzer for `class`, discounting cache projections by the measured
    /// `costs`.
    pub fn new(class: BoxClass, costs: MarginalCosts) -> Self {
        Self {
            class,
            values: Multiset::new(),
            costs,
        }
    }

    /// Wrapper class this analyzer watches.
    pub fn class_name(&self) -> &str {
        &self.class.name
    }

    /// Whether cache projections make sense for this wrapper. Booleans and
    /// bytes are excluded: their whole value range is already cached by
    /// the runtime.
    pub fn is_cache_candidate(&self) -> bool {
        self.class.kind.cache_candidate()
    }

    /// Number of distinct values observed.
    pub fn distinct_values(&self) -> usize {
        self.values.distinct_len()
    }

    /// Render the verbose duplicate table and both cache projections into
    /// the given sinks. Callers pass a throwaway sink for sections they do
    /// not want.
    pub fn report(
        &self,
        layouter: &dyn Layouter,
        verbose: &mut String,
        autobox: &mut String,
        manual: &mut String,
    ) {
        let mut by_value: Vec<ScalarValue> = self.values.keys().copied().collect();
        by_value.sort_by_key(|v| (v.long_value(), v.raw_bits()));

        // Stable sort keeps the value-ascending order as the tie-break for
        // equal counts, making count-ordered output deterministic.
        let mut by_count = by_value.clone();
        by_count.sort_by_key(|v| std::cmp::Reverse(self.values.count(v)));

        let instance_size = layouter.size_of(&ClassData::instance(
            self.class.name.as_str(),
            wrapper_payload(self.class.kind),
        ));
        let limits = cache_limits();

        verbose.push_str(&format!("{} boxes:\n", self.class.name));
        verbose.push_str(&format!(
            " {:>13} {:>13}    {}\n",
            "DUPS", "SUM BYTES", "VALUE"
        ));
        verbose.push_str(RULE);
        verbose.push('\n');

        let mut range_count: Multiset<u64> = Multiset::new();
        let mut range_bytes: Multiset<u64> = Multiset::new();

        for value in &by_value {
            let count = self.values.count(value) - 1;
            if count == 0 {
                continue;
            }
            let bytes = count * instance_size;
            verbose.push_str(&format!(" {:>13} {:>13}    {}\n", count, bytes, value));

            for &limit in &limits {
                if -128 <= value.long_value() && value.long_value() < limit as i64 {
                    range_count.add_n(limit, count);
                    range_bytes.add_n(limit, bytes);
                }
            }
        }
        verbose.push('\n');

        self.report_range_cache(autobox, &limits, &range_count, &range_bytes);
        self.report_frequency_cache(manual, &limits, &by_count, instance_size);
    }

    /// Projection for a contiguous [-128, limit) value-range cache backed
    /// by an array, net of the backing array's per-slot cost.
    fn report_range_cache(
        &self,
        out: &mut String,
        limits: &[u64],
        range_count: &Multiset<u64>,
        range_bytes: &Multiset<u64>,
    ) {
        if self.class.kind == ScalarKind::Int {
            out.push_str(&format!(
                "{}, savings with a low-value range cache (or a larger runtime integer cache):\n",
                self.class.name
            ));
        } else {
            out.push_str(&format!(
                "{}, savings with a low-value range cache:\n",
                self.class.name
            ));
        }
        out.push_str(&format!(
            " {:>20} {:>20} {:>20}\n",
            "CACHE SIZE", "SAVED INSTANCES", "SAVED BYTES"
        ));
        out.push_str(RULE);
        out.push('\n');
        for &limit in limits {
            let saved =
                range_bytes.count(&limit) as i64 - self.costs.array_slot * (limit as i64 - 128);
            out.push_str(&format!(
                " {:>20} {:>20} {:>20}\n",
                limit,
                range_count.count(&limit),
                saved
            ));
        }
        out.push('\n');
    }

    /// Projection for a map-backed cache holding the most frequent values,
    /// net of the map's per-entry cost.
    fn report_frequency_cache(
        &self,
        out: &mut String,
        limits: &[u64],
        by_count: &[ScalarValue],
        instance_size: u64,
    ) {
        let mut cache_population: Multiset<u64> = Multiset::new();
        let mut cache_count: Multiset<u64> = Multiset::new();
        let mut cache_bytes: Multiset<u64> = Multiset::new();

        let mut rank: u64 = 0;
        for value in by_count {
            let count = self.values.count(value) - 1;
            if count == 0 {
                continue;
            }
            let bytes = count * instance_size;
            for &limit in limits {
                if rank < limit {
                    cache_count.add_n(limit, count);
                    cache_bytes.add_n(limit, bytes);
                    cache_population.add(limit);
                }
            }
            rank += 1;
        }

        out.push_str(&format!(
            "{}, savings with a most-frequent-value map cache:\n",
            self.class.name
        ));
        out.push_str(&format!(
            " {:>20} {:>20} {:>20}\n",
            "CACHE SIZE", "SAVED INSTANCES", "SAVED BYTES"
        ));
        out.push_str(RULE);
        out.push('\n');
        for &limit in limits {
            let saved = cache_bytes.count(&limit) as i64
                - self.costs.map_entry * cache_population.count(&limit) as i64;
            out.push_str(&format!(
                " {:>20} {:>20} {:>20}\n",
                limit,
                cache_count.count(&limit),
                saved
            ));
        }
        out.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::ModelLayouter;

    fn int_analyzer() -> BoxAnalyzer {
        let costs = MarginalCosts {
            map_entry: 64,
            array_slot: 8,
        };
        BoxAnalyzer::new(BoxClass::new("java.lang.Integer", ScalarKind::Int), costs)
    }

    fn feed(analyzer: &mut BoxAnalyzer, value: i32, times: usize) {
        for _ in 0..times {
            analyzer
                .visit_instance(1, 1, &value.to_be_bytes(), "java.lang.Integer")
                .unwrap();
        }
    }

    #[test]
    fn only_matching_class_is_counted() {
        let mut analyzer = int_analyzer();
        analyzer
            .visit_instance(1, 1, &10i32.to_be_bytes(), "java.lang.Integer")
            .unwrap();
        analyzer
            .visit_instance(2, 2, &10i32.to_be_bytes(), "x.NotABox")
            .unwrap();
        assert_eq!(analyzer.distinct_values(), 1);
    }

    #[test]
    fn verbose_lists_only_duplicated_values() {
        let mut analyzer = int_analyzer();
        feed(&mut analyzer, 10, 5);
        feed(&mut analyzer, -200, 1);

        let mut verbose = String::new();
        let mut sink = String::new();
        let mut sink2 = String::new();
        analyzer.report(&ModelLayouter::new(), &mut verbose, &mut sink, &mut sink2);

        // 24-byte Integer, 4 duplicates.
        assert!(verbose.contains("java.lang.Integer boxes:"));
        assert!(verbose.contains("    10"));
        assert!(verbose.contains("96"));
        assert!(!verbose.contains("-200"));
    }

    #[test]
    fn range_cache_counts_are_monotonic_in_limit() {
        let mut analyzer = int_analyzer();
        feed(&mut analyzer, 10, 5);
        feed(&mut analyzer, 300, 4);
        feed(&mut analyzer, 70_000, 3);

        let mut sink = String::new();
        let mut autobox = String::new();
        let mut sink2 = String::new();
        analyzer.report(&ModelLayouter::new(), &mut sink, &mut autobox, &mut sink2);

        let mut previous = 0u64;
        let mut rows = 0;
        for line in autobox.lines() {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() == 3 {
                if let (Ok(_limit), Ok(saved)) =
                    (fields[0].parse::<u64>(), fields[1].parse::<u64>())
                {
                    assert!(saved >= previous, "saved instances fell as limit grew");
                    previous = saved;
                    rows += 1;
                }
            }
        }
        assert_eq!(rows, 23, "one row per limit from 256 to 2^30");
    }

    #[test]
    fn frequency_cache_prefers_hot_values() {
        let mut analyzer = int_analyzer();
        // One very hot value and many lukewarm ones.
        feed(&mut analyzer, 42, 1000);
        for v in 0..400 {
            feed(&mut analyzer, 1000 + v, 2);
        }

        let mut sink = String::new();
        let mut sink2 = String::new();
        let mut manual = String::new();
        analyzer.report(&ModelLayouter::new(), &mut sink, &mut sink2, &mut manual);

        // At limit 256 the cache holds 256 of the 401 duplicated values,
        // necessarily including the hot one: 999 + 255 * 1 saved instances.
        let line_256 = manual
            .lines()
            .find(|l| l.trim_start().starts_with("256 "))
            .expect("row for limit 256");
        let fields: Vec<&str> = line_256.split_whitespace().collect();
        assert_eq!(fields[1].parse::<u64>().unwrap(), 999 + 255);
    }
}
