use crate::engine::Candidate;

/// Enforces the identification output contract on a candidate list: sorted
/// ascending by distance with ties kept in insertion order, then resized to
/// exactly `num_candidates` entries: excess candidates dropped from the
/// tail, missing slots filled with invalid placeholders.
pub fn finalize_candidates(candidates: &mut Vec<Candidate>, num_candidates: u32) {
    candidates.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    candidates.resize_with(num_candidates as usize, Candidate::invalid);
}

/// A list of nothing but placeholders, used when a query's real candidates
/// must be discarded.
pub fn invalid_list(num_candidates: u32) -> Vec<Candidate> {
    let mut candidates = Vec::new();
    candidates.resize_with(num_candidates as usize, Candidate::invalid);
    candidates
}

/// True when the list already satisfies the output contract for
/// `num_candidates`: exact length and non-decreasing distances.
pub fn is_conformant(candidates: &[Candidate], num_candidates: u32) -> bool {
    candidates.len() == num_candidates as usize
        && candidates
            .windows(2)
            .all(|pair| pair[0].distance.total_cmp(&pair[1].distance).is_le())
}
