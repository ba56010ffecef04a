//! Fixed-width report tables
//!
//! All analyzer reports share one shape: a title, a column header, a rule,
//! up to [`TOP_ROWS`] rows sorted most-impactful first, an `<other>` rollup
//! for everything past the cutoff, and a `<total>` row. Rollups conserve
//! exactly: the shown rows plus `<other>` always equal `<total>` in every
//! numeric column.

/// Horizontal rule under the column headers.
pub const RULE: &str =
    "------------------------------------------------------------------------------------------------";

/// Rows rendered before the `<other>` rollup cuts a table off.
pub const TOP_ROWS: usize = 30;

/// One rendered duplicate row: excess occurrences, excess bytes, and a
/// display label for the value.
#[derive(Debug, Clone)]
pub struct DupRow {
    /// Occurrences beyond the first, unavoidable one.
    pub dups: u64,
    /// Bytes those excess occurrences cost.
    pub bytes: u64,
    /// Rendered value or preview.
    pub label: String,
}

/// Render a duplicate table. Rows must arrive sorted most-impactful first.
/// Returns the rendered block and its total excess bytes so callers can
/// rank blocks against each other.
pub fn excess_table(title: &str, rows: &[DupRow]) -> (String, u64) {
    let total_dups: u64 = rows.iter().map(|r| r.dups).sum();
    let total_bytes: u64 = rows.iter().map(|r| r.bytes).sum();

    let mut out = String::new();
    out.push_str(title);
    out.push('\n');
    out.push_str(&format!(" {:>13} {:>13}   {}\n", "DUPS", "SUM BYTES", "VALUE"));
    out.push_str(RULE);
    out.push('\n');

    let mut shown_dups = 0u64;
    let mut shown_bytes = 0u64;
    for row in rows.iter().take(TOP_ROWS) {
        out.push_str(&format!(
            " {:>13} {:>13}   {}\n",
            row.dups, row.bytes, row.label
        ));
        shown_dups += row.dups;
        shown_bytes += row.bytes;
    }
    if rows.len() > TOP_ROWS {
        out.push_str(&format!(
            " {:>13} {:>13}   {}\n",
            total_dups - shown_dups,
            total_bytes - shown_bytes,
            "<other>"
        ));
    }
    out.push_str(&format!(
        " {:>13} {:>13}   {}\n",
        total_dups, total_bytes, "<total>"
    ));
    out.push('\n');

    (out, total_bytes)
}

/// Order rendered blocks by total excess, biggest first, and return just
/// the text. Ties order by block text so output is deterministic.
pub fn rank_blocks(mut blocks: Vec<(String, u64)>) -> Vec<String> {
    blocks.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    blocks.into_iter().map(|(text, _)| text).collect()
}
