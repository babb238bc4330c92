//! Reference designator allocation.
//!
//! A new component is named after the first character of its value,
//! upper-cased (`"10k"` gives `1`, `"cap"` gives `C`), followed by the
//! lowest counter from 1 that is not already used on the board.

use std::cmp::Ordering;
use std::collections::BTreeSet;

/// Prefix used when the value is empty.
pub const DEFAULT_PREFIX: &str = "U";

/// Designator prefix derived from a component value.
pub fn prefix_for(value: &str) -> String {
    match value.chars().next() {
        Some(first) => first.to_uppercase().collect(),
        None => DEFAULT_PREFIX.to_string(),
    }
}

/// Lowest free designator for `value` given the designators already in use.
pub fn next_designator(value: &str, existing: &BTreeSet<String>) -> String {
    let prefix = prefix_for(value);
    let mut counter: u32 = 1;
    loop {
        let candidate = format!("{prefix}{counter}");
        if !existing.contains(&candidate) {
            return candidate;
        }
        counter += 1;
    }
}

/// Designator split at its trailing digits: `R12` is `("R", Some(12))`,
/// `TP` is `("TP", None)`.
pub fn split_designator(designator: &str) -> (&str, Option<u64>) {
    let digits_start = designator
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_digit())
        .last()
        .map(|(index, _)| index)
        .unwrap_or(designator.len());
    let (prefix, digits) = designator.split_at(digits_start);
    (prefix, digits.parse().ok())
}

/// Orders designators by prefix, then numerically: `R2` before `R10`.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let (prefix_a, number_a) = split_designator(a);
    let (prefix_b, number_b) = split_designator(b);
    prefix_a
        .cmp(prefix_b)
        .then_with(|| number_a.cmp(&number_b))
        .then_with(|| a.cmp(b))
}
