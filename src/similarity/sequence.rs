// src/similarity/sequence.rs
//! Character-level sequence ratio (Ratcliff/Obershelp "gestalt" matching).
//!
//! `ratio = 2 * M / (|a| + |b|)` where `M` is the number of characters in the
//! matching blocks found by repeatedly taking the longest common block and
//! recursing on both sides of it. Works on Unicode scalar values, so a
//! Hangul syllable counts as one character.

use std::collections::HashMap;

/// Length of `b` from which overly common characters are ignored as match seeds.
const POPULAR_MIN_LEN: usize = 200;

/// Similarity in `[0.0, 1.0]`. Two empty strings are identical (`1.0`).
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

/// Sum of matching block sizes.
fn matching_characters(a: &[char], b: &[char]) -> usize {
    let b2j = index_positions(b);
    let mut matched = 0usize;
    let mut queue = vec![(0, a.len(), 0, b.len())];

    while let Some((alo, ahi, blo, bhi)) = queue.pop() {
        let (i, j, k) = longest_match(a, b, &b2j, alo, ahi, blo, bhi);
        if k == 0 {
            continue;
        }
        matched += k;
        if alo < i && blo < j {
            queue.push((alo, i, blo, j));
        }
        if i + k < ahi && j + k < bhi {
            queue.push((i + k, ahi, j + k, bhi));
        }
    }
    matched
}

/// Positions of each character in `b`, ascending. For long `b`, characters
/// occurring in more than 1% of positions are dropped from the index.
fn index_positions(b: &[char]) -> HashMap<char, Vec<usize>> {
    let mut b2j: HashMap<char, Vec<usize>> = HashMap::new();
    for (j, &c) in b.iter().enumerate() {
        b2j.entry(c).or_default().push(j);
    }

    let n = b.len();
    if n >= POPULAR_MIN_LEN {
        let limit = n / 100 + 1;
        b2j.retain(|_, positions| positions.len() <= limit);
    }
    b2j
}

/// Longest matching block in `a[alo..ahi]` / `b[blo..bhi]`, earliest in `a`
/// on ties, then earliest in `b`. Returns `(i, j, size)`.
#[allow(clippy::too_many_arguments)]
fn longest_match(
    a: &[char],
    b: &[char],
    b2j: &HashMap<char, Vec<usize>>,
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let (mut best_i, mut best_j, mut best_size) = (alo, blo, 0usize);

    // j2len[j] = length of the longest block ending at a[i-1], b[j]
    let mut j2len: HashMap<usize, usize> = HashMap::new();
    for (i, c) in a.iter().enumerate().take(ahi).skip(alo) {
        let mut next: HashMap<usize, usize> = HashMap::new();
        if let Some(positions) = b2j.get(c) {
            for &j in positions {
                if j < blo {
                    continue;
                }
                if j >= bhi {
                    break;
                }
                let k = j
                    .checked_sub(1)
                    .and_then(|prev| j2len.get(&prev))
                    .copied()
                    .unwrap_or(0)
                    + 1;
                next.insert(j, k);
                if k > best_size {
                    best_i = i + 1 - k;
                    best_j = j + 1 - k;
                    best_size = k;
                }
            }
        }
        j2len = next;
    }

    // Popular characters never seed a block; let equal neighbours extend it.
    while best_i > alo && best_j > blo && a[best_i - 1] == b[best_j - 1] {
        best_i -= 1;
        best_j -= 1;
        best_size += 1;
    }
    while best_i + best_size < ahi
        && best_j + best_size < bhi
        && a[best_i + best_size] == b[best_j + best_size]
    {
        best_size += 1;
    }

    (best_i, best_j, best_size)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn identical_and_empty() {
        assert!(approx(sequence_ratio("공모전 안내", "공모전 안내"), 1.0));
        assert!(approx(sequence_ratio("", ""), 1.0));
        assert!(approx(sequence_ratio("abc", ""), 0.0));
    }

    #[test]
    fn known_ratios() {
        // 3 matching chars out of 8
        assert!(approx(sequence_ratio("abcd", "bcde"), 0.75));
        // "ab" + "cd"
        assert!(approx(sequence_ratio("abxcd", "abcd"), 8.0 / 9.0));
        assert!(approx(sequence_ratio("abc", "xyz"), 0.0));
    }

    #[test]
    fn symmetric_on_sample_titles() {
        let a = "2025 하계 공모전 안내";
        let b = "2025 동계 공모전 접수 안내";
        assert!(approx(sequence_ratio(a, b), sequence_ratio(b, a)));
    }

    #[test]
    fn hangul_counts_per_syllable() {
        // three shared syllables out of five on each side
        assert!(approx(sequence_ratio("장학금안내", "장학금신청"), 0.6));
    }

    #[test]
    fn long_inputs_still_match_through_popular_chars() {
        let a = "a".repeat(300);
        let b = "a".repeat(300);
        assert!(approx(sequence_ratio(&a, &b), 1.0));
    }
}
