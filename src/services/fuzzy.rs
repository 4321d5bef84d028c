//! Approximate string matching against small closed sets.
//!
//! All functions compare Unicode scalar values, not bytes.

/// Minimum [`sequence_ratio`] for a model-produced intent label to be
/// accepted as one of the canonical labels.
pub const INTENT_MATCH_CUTOFF: f64 = 0.6;

/// Largest [`levenshtein`] distance at which an extracted specialty term is
/// still resolved to a canonical specialty.
pub const SPECIALTY_MAX_DISTANCE: usize = 3;

/// Minimum [`normalized_similarity`] for an extracted disease or symptom to
/// be mapped onto a reference entry.
pub const DISEASE_MATCH_THRESHOLD: f64 = 0.7;

/// Classic edit distance with unit-cost insertions, deletions and substitutions.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// Indel similarity in `[0, 1]`: `1 - indel_distance / (len(a) + len(b))`.
///
/// Two empty strings are identical (1.0).
pub fn normalized_similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    let lcs = longest_common_subsequence(&a, &b);
    (2 * lcs) as f64 / total as f64
}

fn longest_common_subsequence(a: &[char], b: &[char]) -> usize {
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for ca in a {
        for (j, cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// Gestalt pattern-matching ratio: `2 * M / (len(a) + len(b))` where `M`
/// counts characters in the recursively found longest common blocks.
///
/// No junk heuristic is applied; inputs here are short labels.
pub fn sequence_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    let matched = matching_characters(&a, &b);
    (2 * matched) as f64 / total as f64
}

fn matching_characters(a: &[char], b: &[char]) -> usize {
    let mut matched = 0;
    let mut pending = vec![(0, a.len(), 0, b.len())];

    while let Some((alo, ahi, blo, bhi)) = pending.pop() {
        let (i, j, k) = longest_match(a, b, alo, ahi, blo, bhi);
        if k == 0 {
            continue;
        }
        matched += k;
        if alo < i && blo < j {
            pending.push((alo, i, blo, j));
        }
        if i + k < ahi && j + k < bhi {
            pending.push((i + k, ahi, j + k, bhi));
        }
    }

    matched
}

/// Longest common block of `a[alo..ahi]` and `b[blo..bhi]`; earliest wins ties.
fn longest_match(
    a: &[char],
    b: &[char],
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let (mut best_i, mut best_j, mut best_k) = (alo, blo, 0);
    // run[j + 1] = length of the common run ending at a[i - 1], b[j]
    let mut prev = vec![0usize; bhi - blo + 1];
    let mut curr = vec![0usize; bhi - blo + 1];

    for i in alo..ahi {
        for j in blo..bhi {
            let col = j - blo;
            curr[col + 1] = if a[i] == b[j] { prev[col] + 1 } else { 0 };
            let k = curr[col + 1];
            if k > best_k {
                best_i = i + 1 - k;
                best_j = j + 1 - k;
                best_k = k;
            }
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    (best_i, best_j, best_k)
}

/// The candidate with the highest [`sequence_ratio`] to `word`, if that ratio
/// reaches `cutoff`.
///
/// Each score is `sequence_ratio(candidate, word)`; the ratio is not symmetric
/// and the candidate is always the first sequence. Ties go to the
/// lexicographically greatest candidate.
pub fn closest_match<'a>(word: &str, candidates: &[&'a str], cutoff: f64) -> Option<&'a str> {
    let mut best: Option<(&'a str, f64)> = None;
    for candidate in candidates {
        let score = sequence_ratio(candidate, word);
        if score < cutoff {
            continue;
        }
        let better = match best {
            None => true,
            Some((held, s)) => score > s || (score == s && *candidate > held),
        };
        if better {
            best = Some((*candidate, score));
        }
    }
    best.map(|(c, _)| c)
}
