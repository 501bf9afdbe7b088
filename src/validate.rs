use crate::types::{Palette, RawCandidate};

/// Pure filter from a raw mid-stream candidate to a complete palette.
///
/// Accepts iff the id is present, the name is non-empty after trimming, and
/// the colors (with null/empty entries removed) number more than two.
/// Rejection is not an error: early snapshots are expected to carry
/// incomplete candidates, which simply drop out of the batch.
pub fn validate_candidate(candidate: &RawCandidate) -> Option<Palette> {
    let id = candidate.id?;
    let name = candidate.name.as_deref()?;
    let colors = candidate
        .colors
        .as_ref()?
        .iter()
        .flatten()
        .filter(|c| !c.is_empty())
        .cloned()
        .collect::<Vec<_>>();
    Palette::new(id, name, colors)
}

/// Validates an entire snapshot batch, preserving arrival order.
pub fn validate_batch(batch: &[RawCandidate]) -> Vec<Palette> {
    batch.iter().filter_map(validate_candidate).collect()
}
