use std::collections::HashSet;

use crate::scraper::HeadlineRecord;

/// Drops every record whose heading was already seen, keeping the first
/// occurrence in place. Headings compare byte for byte.
///
/// Returns the survivors and how many records were removed.
pub fn dedup(records: Vec<HeadlineRecord>) -> (Vec<HeadlineRecord>, usize) {
    let total = records.len();
    let mut seen = HashSet::with_capacity(total);
    let mut unique = Vec::with_capacity(total);

    for record in records {
        if seen.insert(record.heading.clone()) {
            unique.push(record);
        }
    }

    let removed = total - unique.len();
    (unique, removed)
}
