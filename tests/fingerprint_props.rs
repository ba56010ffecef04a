use proptest::prelude::*;

use heapdup::collect::Multiset;
use heapdup::fingerprint::{ArrayFingerprint, BlockFingerprint, ScalarKind};

proptest! {
    #[test]
    fn int_scalars_are_exact(a in any::<i32>(), b in any::<i32>()) {
        let fp_a = ScalarKind::Int.decode(&a.to_be_bytes()).expect("decode succeeds");
        let fp_b = ScalarKind::Int.decode(&b.to_be_bytes()).expect("decode succeeds");
        prop_assert_eq!(a == b, fp_a == fp_b, "scalar keys must match exactly when values do");
        prop_assert_eq!(fp_a.long_value(), i64::from(a));
    }

    #[test]
    fn long_scalars_are_exact(a in any::<i64>(), b in any::<i64>()) {
        let fp_a = ScalarKind::Long.decode(&a.to_be_bytes()).expect("decode succeeds");
        let fp_b = ScalarKind::Long.decode(&b.to_be_bytes()).expect("decode succeeds");
        prop_assert_eq!(a == b, fp_a == fp_b);
    }

    #[test]
    fn double_scalars_key_by_bits(a in any::<f64>(), b in any::<f64>()) {
        let fp_a = ScalarKind::Double.decode(&a.to_bits().to_be_bytes()).expect("decode succeeds");
        let fp_b = ScalarKind::Double.decode(&b.to_bits().to_be_bytes()).expect("decode succeeds");
        prop_assert_eq!(a.to_bits() == b.to_bits(), fp_a == fp_b);
    }

    #[test]
    fn small_blocks_collide_exactly_on_bytes(
        len in 1usize..=8,
        seed_a in proptest::collection::vec(any::<u8>(), 8),
        seed_b in proptest::collection::vec(any::<u8>(), 8),
    ) {
        let a = &seed_a[..len];
        let b = &seed_b[..len];
        let fp_a = BlockFingerprint::new(a);
        let fp_b = BlockFingerprint::new(b);
        prop_assert_eq!(a == b, fp_a == fp_b, "inline keys collide exactly on equal bytes");
    }

    #[test]
    fn identical_array_payloads_share_a_key(
        bytes in proptest::collection::vec(any::<u8>(), 9..128),
    ) {
        let a = ArrayFingerprint::new(bytes.len() as u32, "byte", &bytes);
        let b = ArrayFingerprint::new(bytes.len() as u32, "byte", &bytes);
        prop_assert_eq!(a, b);
    }

    #[test]
    fn array_length_is_part_of_the_key(
        bytes in proptest::collection::vec(any::<u8>(), 9..64),
    ) {
        let a = ArrayFingerprint::new(bytes.len() as u32, "byte", &bytes);
        let b = ArrayFingerprint::new(bytes.len() as u32 + 1, "byte", &bytes);
        prop_assert_ne!(a, b);
    }

    #[test]
    fn multiset_counts_equal_additions(
        keys in proptest::collection::vec(0u8..16, 0..256),
    ) {
        let mut set = Multiset::new();
        for &key in &keys {
            set.add(key);
        }
        for key in 0u8..16 {
            let expected = keys.iter().filter(|&&k| k == key).count() as u64;
            prop_assert_eq!(set.count(&key), expected);
        }
    }

    #[test]
    fn prune_never_leaves_more_than_the_ceiling(
        keys in proptest::collection::vec(any::<u16>(), 0..512),
        threshold in 0usize..64,
    ) {
        let mut set = Multiset::new();
        for &key in &keys {
            set.add(key);
        }
        set.prune_for_size(threshold);
        prop_assert!(set.distinct_len() <= threshold);
    }
}
