//! Rough address equality for reverse-geocode plausibility checks.

use crate::canonical::canonicalize;

fn is_numeric(segment: &str) -> bool {
    !segment.is_empty() && segment.chars().all(|c| c.is_ascii_digit())
}

/// Whether `candidate` plausibly names the same place as `truth`.
///
/// Both sides are canonicalized. The candidate (usually a reverse-geocoded
/// address) may end in a facility name the source address never had, so a
/// non-numeric last segment is dropped. If it still has more segments than
/// the truth it is cut to one more than the truth's count. The argument
/// order matters: only the candidate is trimmed.
pub fn addresses_roughly_match(truth: &str, candidate: &str) -> bool {
    let truth = canonicalize(truth);
    let candidate = canonicalize(candidate);

    let mut segments: Vec<&str> = candidate.split('-').collect();
    if segments.last().is_some_and(|last| !is_numeric(last)) {
        segments.pop();
    }

    let truth_segments = truth.split('-').count();
    if segments.len() > truth_segments {
        segments.truncate(truth_segments + 1);
    }

    truth == segments.join("-")
}
