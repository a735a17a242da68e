//! Uniform sampling without replacement from an injected [Rand].

use tinyrand::Rand;

/// Draws `count` distinct indices from `0..len` (all of them if `count >= len`) by a partial
/// Fisher–Yates shuffle. Indices are returned in draw order.
pub fn choose_indices(len: usize, count: usize, rand: &mut impl Rand) -> Vec<usize> {
    let count = usize::min(count, len);
    let mut indices = (0..len).collect::<Vec<_>>();
    for i in 0..count {
        let j = i + rand.next_lim_usize(len - i);
        indices.swap(i, j);
    }
    indices.truncate(count);
    indices
}

/// Draws `count` distinct items from `items`.
pub fn choose<'a, T>(items: &'a [T], count: usize, rand: &mut impl Rand) -> Vec<&'a T> {
    choose_indices(items.len(), count, rand)
        .into_iter()
        .map(|index| &items[index])
        .collect()
}
