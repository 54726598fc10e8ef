use std::collections::HashSet;

/// Merges a persisted preferred order with the keys that currently exist.
///
/// Stored keys that are still available come first, in stored order; the
/// remaining available keys follow in encounter order. Stale stored keys are
/// dropped and every available key appears exactly once.
pub fn build_order<'s, 'a, S, A>(stored_order: S, available_keys: A) -> Vec<String>
where
    S: IntoIterator<Item = &'s str>,
    A: IntoIterator<Item = &'a str>,
{
    let mut available = Vec::new();
    let mut available_set = HashSet::new();
    for key in available_keys {
        if available_set.insert(key) {
            available.push(key);
        }
    }

    let mut placed = HashSet::with_capacity(available.len());
    let mut order = Vec::with_capacity(available.len());
    for key in stored_order {
        if let Some(&key) = available_set.get(key) {
            if placed.insert(key) {
                order.push(key.to_string());
            }
        }
    }
    for key in available {
        if placed.insert(key) {
            order.push(key.to_string());
        }
    }
    order
}
