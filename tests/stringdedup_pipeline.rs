mod common;

use common::DumpBuilder;
use heapdup::analyze::StringScan;
use heapdup::layout::{ClassData, Layouter, ModelLayouter};

const STRING_CLASS_ID: u64 = 50;

/// Dump with one string wrapper class and six wrappers, each owning its
/// own value array: three arrays hold "ab", two hold "cd", one holds the
/// unique "zz". Deduplication can collapse identical contents, so "ab"
/// carries two excess arrays and "cd" one.
fn scenario_dump() -> Vec<u8> {
    let mut dump = DumpBuilder::new();
    dump.class(STRING_CLASS_ID, "java.lang.String", &[4], 8);

    for id in [500, 501, 502] {
        dump.string_wrapper(STRING_CLASS_ID, id);
        dump.array(id, "byte", 2, b"ab");
    }
    for id in [510, 511] {
        dump.string_wrapper(STRING_CLASS_ID, id);
        dump.array(id, "byte", 2, b"cd");
    }
    dump.string_wrapper(STRING_CLASS_ID, 520);
    dump.array(520, "byte", 2, b"zz");

    // An unreferenced array with popular content must not be counted.
    dump.array(900, "byte", 2, b"ab");
    dump.finish()
}

fn run_two_passes(bytes: &[u8], wrapper_class: &str) -> String {
    let mut scan = StringScan::new(wrapper_class);
    common::traverse(bytes, &mut scan);

    let mut values = scan.into_value_scan();
    common::traverse(bytes, &mut values);

    values.report(&ModelLayouter::new())
}

#[test]
fn two_pass_correlation_counts_shared_arrays() {
    let report = run_two_passes(&scenario_dump(), "java.lang.String");

    let layouter = ModelLayouter::new();
    let array_size = layouter.size_of(&ClassData::array("byte", 2));
    // Wrapper payload is 4 bytes of fields plus an 8-byte reference.
    let wrapper_size = layouter.size_of(&ClassData::instance("java.lang.String", 12));

    assert!(report.starts_with("java.lang.String potential duplicates:"));

    // Array A: 2 duplicate wrappers' worth of content.
    let row_ab = report.lines().find(|l| l.contains("ab")).expect("row for ab");
    let fields: Vec<&str> = row_ab.split_whitespace().collect();
    assert_eq!(fields[0].parse::<u64>().unwrap(), 2);
    assert_eq!(fields[1].parse::<u64>().unwrap(), 2 * array_size);
    assert_eq!(fields[2].parse::<u64>().unwrap(), 2 * (array_size + wrapper_size));
    assert_eq!(fields[3].parse::<u64>().unwrap(), 2); // element count

    // Array B: one duplicate.
    let row_cd = report.lines().find(|l| l.contains("cd")).expect("row for cd");
    let fields: Vec<&str> = row_cd.split_whitespace().collect();
    assert_eq!(fields[0].parse::<u64>().unwrap(), 1);
    assert_eq!(fields[1].parse::<u64>().unwrap(), array_size);

    // Array C is unique: no row beyond the totals.
    assert!(!report.contains("zz"));

    // Totals: 3 dups, 3 * array size, 3 * (array + wrapper).
    let total_line = report
        .lines()
        .find(|l| l.contains("<total>"))
        .expect("total row");
    let fields: Vec<&str> = total_line.split_whitespace().collect();
    assert_eq!(fields[0].parse::<u64>().unwrap(), 3);
    assert_eq!(fields[1].parse::<u64>().unwrap(), 3 * array_size);
    assert_eq!(fields[2].parse::<u64>().unwrap(), 3 * (array_size + wrapper_size));
}

#[test]
fn bigger_excess_ranks_first() {
    let mut dump = DumpBuilder::new();
    dump.class(STRING_CLASS_ID, "java.lang.String", &[4], 8);

    // Four copies of "hello", two copies of "hi", one array per wrapper.
    for id in [600, 601, 602, 603] {
        dump.string_wrapper(STRING_CLASS_ID, id);
        dump.array(id, "byte", 5, b"hello");
    }
    for id in [610, 611] {
        dump.string_wrapper(STRING_CLASS_ID, id);
        dump.array(id, "byte", 2, b"hi");
    }
    let bytes = dump.finish();

    let report = run_two_passes(&bytes, "java.lang.String");
    let hello_pos = report.find("hello").expect("hello row");
    let hi_pos = report.find("hi").expect("hi row");
    assert!(hello_pos < hi_pos);
}

#[test]
fn utf16_contents_preview_as_text() {
    let mut dump = DumpBuilder::new();
    dump.class(STRING_CLASS_ID, "java.lang.String", &[4], 8);
    // Two arrays with the same UTF-16BE "hi".
    for id in [700, 701] {
        dump.string_wrapper(STRING_CLASS_ID, id);
        dump.array(id, "char", 2, &[0x00, 0x68, 0x00, 0x69]);
    }
    let bytes = dump.finish();

    let report = run_two_passes(&bytes, "java.lang.String");
    assert!(report.contains("hi"));
}

#[test]
fn custom_wrapper_class_name_is_honored() {
    let mut dump = DumpBuilder::new();
    dump.class(STRING_CLASS_ID, "lang.rt.Str", &[4], 8);
    let mut payload = vec![0u8; 4];
    payload.extend_from_slice(&800u64.to_be_bytes());
    for _ in 0..2 {
        dump.instance(STRING_CLASS_ID, "lang.rt.Str", &payload);
    }
    dump.array(800, "byte", 3, b"abc");
    let bytes = dump.finish();

    let report = run_two_passes(&bytes, "lang.rt.Str");
    assert!(report.starts_with("lang.rt.Str potential duplicates:"));
    // Both wrappers share one array: content itself is not duplicated.
    let total_line = report
        .lines()
        .find(|l| l.contains("<total>"))
        .expect("total row");
    let fields: Vec<&str> = total_line.split_whitespace().collect();
    assert_eq!(fields[0].parse::<u64>().unwrap(), 0);
}

#[test]
fn wrapper_shape_errors_abort_the_scan() {
    let mut dump = DumpBuilder::new();
    dump.class(STRING_CLASS_ID, "java.lang.String", &[4, 16], 8);
    let bytes = dump.finish();

    let mut scan = StringScan::new("java.lang.String");
    let result = heapdup::dump::SnapshotReader::new(std::io::Cursor::new(bytes)).parse(&mut scan);
    assert!(result.is_err());
}
