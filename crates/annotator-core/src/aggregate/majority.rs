//! Majority vote over the weak labels of one community.

use indexmap::IndexMap;

use crate::guards::NO_LABEL;

/// Per-label frequencies in order of first encounter.
pub fn label_counts<'a, I>(labels: I) -> IndexMap<&'a str, usize>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts: IndexMap<&'a str, usize> = IndexMap::new();
    for label in labels {
        *counts.entry(label).or_insert(0) += 1;
    }
    counts
}

/// The most frequent label, or [`NO_LABEL`] when there are none.
///
/// Ties go to the label encountered first in iteration order.
pub fn majority_label<'a, I>(labels: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let mut best: Option<(&str, usize)> = None;
    for (label, count) in label_counts(labels) {
        match best {
            Some((_, best_count)) if count <= best_count => {}
            _ => best = Some((label, count)),
        }
    }
    best.map(|(label, _)| label.to_string())
        .unwrap_or_else(|| NO_LABEL.to_string())
}
