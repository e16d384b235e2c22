//! Post-processing applied to every result set before delivery:
//! idiom filter first, then sort. Pure and deterministic.

use crate::entry::{Entry, SearchConfiguration, SortMode};

/// Filter and order `raw` according to `config`.
pub fn process(raw: Vec<Entry>, config: &SearchConfiguration) -> Vec<Entry> {
    let mut entries = raw;

    if config.idiom_only {
        entries.retain(|e| e.is_idiom);
    }

    // `sort_by` is stable, so equal headwords keep their incoming order.
    match config.sort_mode {
        SortMode::Relevance => {}
        SortMode::Ascending => entries.sort_by(|a, b| a.headword.cmp(&b.headword)),
        SortMode::Descending => entries.sort_by(|a, b| b.headword.cmp(&a.headword)),
    }

    entries
}
