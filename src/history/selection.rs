//! Multi-select delete over positional indices.

/// Split `items` into (kept, removed) by position.
///
/// `selected` may arrive unsorted, with duplicates, or with indices past the
/// end; it is sorted and deduplicated first and then walked alongside `items`
/// with a single cursor, so each removal is decided against the original
/// positions rather than positions shifted by earlier removals.
pub fn partition_selected<T>(items: Vec<T>, selected: &[usize]) -> (Vec<T>, Vec<T>) {
    let mut selected = selected.to_vec();
    selected.sort_unstable();
    selected.dedup();

    let mut kept = Vec::with_capacity(items.len().saturating_sub(selected.len()));
    let mut removed = Vec::with_capacity(selected.len());
    let mut cursor = selected.iter().peekable();

    for (index, item) in items.into_iter().enumerate() {
        if cursor.next_if(|&&next| next == index).is_some() {
            removed.push(item);
        } else {
            kept.push(item);
        }
    }

    (kept, removed)
}
