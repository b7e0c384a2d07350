/// Default cap on thumbnails attempted per render.
pub const MAX_ITEMS: usize = 15;
/// Default cap on decoded bytes per render.
pub const MAX_TOTAL_BYTES: u64 = 12_000_000;
/// Hard ceiling imposed by the host surface on bitmap memory per widget update.
pub const PLATFORM_BYTE_CEILING: u64 = 15_552_000;

/// Picks which candidates to try loading, keeping the input order.
///
/// `candidates` must be ascending by day. When they fit under `max_items`
/// they are all returned. Otherwise, with `interval = len / max_items`, an
/// interval above one walks back from the most recent candidate in steps of
/// `interval`; an interval of exactly one keeps the last `max_items`.
pub fn select<T: Clone>(candidates: &[T], max_items: usize) -> Vec<T> {
    if candidates.len() <= max_items {
        return candidates.to_vec();
    }
    if max_items == 0 {
        return Vec::new();
    }

    let interval = candidates.len() / max_items;
    if interval > 1 {
        let mut picked: Vec<T> = candidates
            .iter()
            .rev()
            .step_by(interval)
            .take(max_items)
            .cloned()
            .collect();
        picked.reverse();
        picked
    } else {
        candidates[candidates.len() - max_items..].to_vec()
    }
}
