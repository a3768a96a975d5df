use std::collections::HashSet;

use super::Identified;

/// Append `batch` to `previous`, dropping any element whose id is already
/// present (in `previous` or earlier in `batch`).
///
/// Previous items keep their order and are followed by the new unique
/// items in batch order, so merging the same batch twice is a no-op.
pub fn merge<T: Identified>(mut previous: Vec<T>, batch: Vec<T>) -> Vec<T> {
    let mut seen: HashSet<T::Id> = previous.iter().map(|item| item.id().clone()).collect();
    previous.reserve(batch.len());
    for item in batch {
        if seen.insert(item.id().clone()) {
            previous.push(item);
        }
    }
    previous
}
