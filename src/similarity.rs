//! Fuzzy string similarity for non-categorical slot values.
//!
//! Span predictions rarely reproduce the reference substring character for
//! character ("7 pm" vs "7pm", "the Blue Note" vs "Blue Note"), so
//! non-categorical slots are scored with a similarity in [0.0, 1.0] instead
//! of exact equality.
//!
//! The scorer is pluggable through [`StringSimilarity`]. The default,
//! [`TokenSortRatio`], is the token-sort ratio commonly used for DSTC8
//! schema-guided evaluation:
//!
//! 1. lowercase, replace every non-word character with a space,
//! 2. split on whitespace, sort the tokens, join with single spaces,
//! 3. score the two normalized strings with the indel ratio
//!    `2 * LCS / (len_a + len_b)`, rounded to a whole percentage.
//!
//! # Examples
//!
//! ```
//! use sgd_eval::similarity::fuzzy_string_match;
//!
//! assert_eq!(fuzzy_string_match("Blue Note", "note blue"), 1.0);
//! assert_eq!(fuzzy_string_match("7 pm", ""), 0.0);
//! assert!(fuzzy_string_match("7 pm", "7pm") > 0.8);
//! ```

/// Scores how similar a hypothesis string is to a reference string.
///
/// Implementations must return a value in [0.0, 1.0], where 1.0 means the
/// strings are considered identical.
pub trait StringSimilarity: Send + Sync {
    /// Similarity of `hypothesis` to `reference`.
    fn similarity(&self, reference: &str, hypothesis: &str) -> f64;
}

impl<F> StringSimilarity for F
where
    F: Fn(&str, &str) -> f64 + Send + Sync,
{
    fn similarity(&self, reference: &str, hypothesis: &str) -> f64 {
        self(reference, hypothesis)
    }
}

/// Token-sort ratio similarity (order-insensitive, case-insensitive).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenSortRatio;

impl StringSimilarity for TokenSortRatio {
    fn similarity(&self, reference: &str, hypothesis: &str) -> f64 {
        f64::from(token_sort_ratio(reference, hypothesis)) / 100.0
    }
}

/// Fuzzy string similarity score in [0.0, 1.0] using [`TokenSortRatio`].
#[must_use]
pub fn fuzzy_string_match(reference: &str, hypothesis: &str) -> f64 {
    TokenSortRatio.similarity(reference, hypothesis)
}

/// Token-sort ratio as a whole percentage in `0..=100`.
///
/// Two strings that normalize to the same token sequence score 100, even
/// when both are empty. Otherwise an empty side scores 0.
#[must_use]
pub fn token_sort_ratio(a: &str, b: &str) -> u8 {
    let a = sorted_tokens(a);
    let b = sorted_tokens(b);
    ratio(&a, &b)
}

/// Indel ratio of two strings as a whole percentage in `0..=100`.
#[must_use]
pub fn ratio(a: &str, b: &str) -> u8 {
    if a == b {
        return 100;
    }
    if a.is_empty() || b.is_empty() {
        return 0;
    }

    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = (a.len() + b.len()) as f64;
    let lcs = longest_common_subsequence(&a, &b) as f64;

    // 2 * lcs <= total, so the rounded value always fits in a u8.
    (100.0 * 2.0 * lcs / total).round() as u8
}

/// Lowercase, strip non-word characters, sort tokens, rejoin.
fn sorted_tokens(s: &str) -> String {
    let cleaned: String = s
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '_' {
                c
            } else {
                ' '
            }
        })
        .collect::<String>()
        .to_lowercase();

    let mut tokens: Vec<&str> = cleaned.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

/// Length of the longest common subsequence (two-row DP).
fn longest_common_subsequence(a: &[char], b: &[char]) -> usize {
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];

    for &ca in a {
        for (j, &cb) in b.iter().enumerate() {
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
