//! Edit-distance similarity with early termination.

/// Canonical form used for text comparison and cache keys.
pub fn normalize_text(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Levenshtein distance over chars, or `None` as soon as it must exceed `max`.
///
/// Each DP row's minimum is a lower bound on the final distance, so the
/// scan stops at the first row whose minimum is already above `max`.
pub fn bounded_levenshtein(a: &str, b: &str, max: usize) -> Option<usize> {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.len().abs_diff(b.len()) > max {
        return None;
    }
    if a.is_empty() || b.is_empty() {
        return Some(a.len().max(b.len()));
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        let mut row_min = curr[0];
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (curr[j] + 1).min(prev[j + 1] + 1).min(prev[j] + cost);
            row_min = row_min.min(curr[j + 1]);
        }
        if row_min > max {
            return None;
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    let distance = prev[b.len()];
    (distance <= max).then_some(distance)
}

/// `1 - distance / max_len` in [0, 1]. Two empty strings are identical.
pub fn normalized_similarity(a: &str, b: &str) -> f64 {
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    let distance = bounded_levenshtein(a, b, max_len).unwrap_or(max_len);
    1.0 - distance as f64 / max_len as f64
}

const EPSILON: f64 = 1e-9;

/// Similarity when it reaches `min_similarity`, otherwise 0.
///
/// The distance budget implied by `min_similarity` bounds the DP, so
/// clearly dissimilar strings cost far less than a full table.
pub fn similarity_at_least(a: &str, b: &str, min_similarity: f64) -> f64 {
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return if min_similarity <= 1.0 { 1.0 } else { 0.0 };
    }
    let budget = ((1.0 - min_similarity.clamp(0.0, 1.0)) * max_len as f64 + EPSILON).floor() as usize;
    match bounded_levenshtein(a, b, budget) {
        Some(distance) => {
            let similarity = 1.0 - distance as f64 / max_len as f64;
            if similarity + EPSILON >= min_similarity {
                similarity
            } else {
                0.0
            }
        }
        None => 0.0,
    }
}
