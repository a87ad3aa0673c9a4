// src/content/navigation.rs
use crate::content::types::{Entry, Lookup};

/// Find `slug` in a newest-first list and attach its neighbours.
///
/// `previous` is the entry one position earlier (newer), `next` one position
/// later (older). Edges yield `None`.
pub fn lookup_in(entries: Vec<Entry>, slug: &str) -> Lookup<Entry> {
    let Some(idx) = entries
        .iter()
        .position(|e| e.slug.as_deref() == Some(slug))
    else {
        return Lookup::not_found();
    };

    let previous_slug = idx
        .checked_sub(1)
        .and_then(|i| entries.get(i))
        .and_then(|e| e.slug.clone());
    let next_slug = entries.get(idx + 1).and_then(|e| e.slug.clone());

    let mut entries = entries;
    let item = entries.swap_remove(idx);
    Lookup {
        item: Some(item),
        previous_slug,
        next_slug,
    }
}
