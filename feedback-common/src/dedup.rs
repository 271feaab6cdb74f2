use std::collections::HashSet;
use std::hash::Hash;

use serde_json::Value;

use crate::page::Record;

/// Drop every record whose key was already seen, keeping the first occurrence.
///
/// Runs in a single pass and preserves the relative order of the records it keeps.
pub fn dedupe<T, K, F>(records: Vec<T>, mut key_of: F) -> Vec<T>
where
    K: Eq + Hash,
    F: FnMut(&T) -> K,
{
    let mut seen = HashSet::with_capacity(records.len());

    records
        .into_iter()
        .filter(|record| seen.insert(key_of(record)))
        .collect()
}

/// The identity key of a record: its `id` field as JSON text.
///
/// Using the JSON text keeps `1` and `"1"` distinct. Records without an `id` all share the
/// `None` key, so at most one of them survives deduplication.
pub fn id_key(record: &Record) -> Option<String> {
    record.get("id").map(Value::to_string)
}

/// Deduplicate records by their `id` field.
pub fn dedupe_by_id(records: Vec<Record>) -> Vec<Record> {
    dedupe(records, id_key)
}
