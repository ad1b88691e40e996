//! Controlling-value selection for lots mapped in several districts.

use nyc_zoning_models::{Candidate, Quantity};

/// The controlling value picked from several candidates.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// Index of the controlling candidate.
    pub index: usize,
    /// Its quantity.
    pub controlling: Quantity,
    /// Set whenever there was more than one candidate to choose from.
    pub requires_manual_review: bool,
}

/// Picks the candidate with the smallest scalar value, the most
/// conservative choice. Ties go to the first candidate seen. Candidates
/// without a scalar quantity are ignored.
///
/// Returns `None` if no candidate has a scalar quantity.
#[must_use]
pub fn resolve_minimum(candidates: &[Candidate]) -> Option<Resolution> {
    let mut best: Option<(usize, f64)> = None;

    for (index, candidate) in candidates.iter().enumerate() {
        let Some(value) = candidate.quantity.as_scalar() else {
            continue;
        };
        if best.is_none_or(|(_, min)| value < min) {
            best = Some((index, value));
        }
    }

    let (index, _) = best?;
    Some(Resolution {
        index,
        controlling: candidates[index].quantity.clone(),
        requires_manual_review: candidates.len() > 1,
    })
}
