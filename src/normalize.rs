// src/normalize.rs
//! Title normalization for comparison.
//!
//! The similarity form and the identity-key form come out of the same
//! pipeline and differ only by the [`BracketPolicy`] applied to each. The
//! collectors that used to disagree on tag handling are now a configuration
//! difference rather than separate copies of this code.
//!
//! Pipeline (deterministic, never fails):
//! 1. HTML entity decode (`&amp;`, `&lt;` leak through some boards)
//! 2. Unicode NFKC + lowercase
//! 3. Optional removal of bracketed editorial tags (`[공지]`, `(안내)`, ...)
//! 4. Keep Hangul, Latin letters, digits and whitespace; drop everything else
//! 5. Collapse whitespace runs to a single space and trim

use once_cell::sync::OnceCell;
use regex::Regex;
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

/// What to do with bracketed/parenthesized segments before punctuation is stripped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BracketPolicy {
    /// Keep the segment text; only the bracket characters are dropped.
    #[default]
    Keep,
    /// Remove `[..]`, `(..)`, `{..}`, `<..>` and `【..】` segments, innermost first.
    Strip,
}

/// Bracket handling for the two normalized forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NormalizationPolicy {
    /// Applied to titles before sequence/cosine scoring.
    #[serde(default)]
    pub similarity_brackets: BracketPolicy,
    /// Applied to titles inside the identity key.
    #[serde(default)]
    pub key_brackets: BracketPolicy,
}

impl NormalizationPolicy {
    pub fn similarity_title(&self, raw: &str) -> String {
        normalize_title(raw, self.similarity_brackets)
    }

    pub fn key_title(&self, raw: &str) -> String {
        normalize_title(raw, self.key_brackets)
    }
}

/// Normalize a raw title into its comparison form.
///
/// Missing titles arrive as `""` from storage and normalize to `""`, which
/// then scores low against everything.
pub fn normalize_title(raw: &str, brackets: BracketPolicy) -> String {
    // 1) HTML entity decode
    let decoded = html_escape::decode_html_entities(raw);

    // 2) NFKC folds full-width forms (［공지］, ２０２５) onto their ASCII shapes
    let mut out = decoded.nfkc().collect::<String>().to_lowercase();

    // 3) Editorial tags
    if brackets == BracketPolicy::Strip {
        out = strip_bracketed(&out);
    }

    // 4) Character filter
    let filtered: String = out
        .chars()
        .filter(|&c| is_kept(c) || c.is_whitespace())
        .collect();

    // 5) Collapse whitespace
    filtered.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Remove bracketed segments until none are left, so nested tags like
/// `[[긴급] 공지]` disappear completely. Unbalanced brackets are left for the
/// character filter.
fn strip_bracketed(s: &str) -> String {
    static RE_BRACKETED: OnceCell<Regex> = OnceCell::new();
    let re = RE_BRACKETED.get_or_init(|| {
        Regex::new(r"\[[^\[\]]*\]|\([^()]*\)|\{[^{}]*\}|<[^<>]*>|【[^【】]*】").unwrap()
    });

    let mut out = s.to_string();
    loop {
        let next = re.replace_all(&out, " ").into_owned();
        if next == out {
            return out;
        }
        out = next;
    }
}

fn is_kept(c: char) -> bool {
    c.is_ascii_digit() || is_latin_letter(c) || is_hangul(c)
}

fn is_latin_letter(c: char) -> bool {
    c.is_ascii_alphabetic()
        || (c.is_alphabetic()
            && matches!(c, '\u{00C0}'..='\u{024F}' | '\u{1E00}'..='\u{1EFF}'))
}

fn is_hangul(c: char) -> bool {
    matches!(
        c,
        '\u{AC00}'..='\u{D7A3}'   // syllables
            | '\u{1100}'..='\u{11FF}' // jamo
            | '\u{3130}'..='\u{318F}' // compatibility jamo
            | '\u{A960}'..='\u{A97F}' // jamo extended-A
            | '\u{D7B0}'..='\u{D7FF}' // jamo extended-B
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_punctuation_and_collapses_ws() {
        let out = normalize_title("  2025 하계   공모전 안내!!  ", BracketPolicy::Keep);
        assert_eq!(out, "2025 하계 공모전 안내");
    }

    #[test]
    fn nfkc_folds_fullwidth_and_lowercases() {
        let out = normalize_title("ＡＢＣ　２０２５ Notice", BracketPolicy::Keep);
        assert_eq!(out, "abc 2025 notice");
    }

    #[test]
    fn keep_policy_keeps_tag_text() {
        let out = normalize_title("[공지] 장학금 (안내)", BracketPolicy::Keep);
        assert_eq!(out, "공지 장학금 안내");
    }

    #[test]
    fn strip_policy_removes_nested_tags() {
        let out = normalize_title("[[긴급] 공지] 장학금 신청 (안내)", BracketPolicy::Strip);
        assert_eq!(out, "장학금 신청");
    }

    #[test]
    fn html_entities_are_decoded_before_filtering() {
        let out = normalize_title("R&amp;D &lt;설명회&gt; 개최", BracketPolicy::Strip);
        assert_eq!(out, "rd 개최");
    }

    #[test]
    fn underscore_and_symbols_are_dropped() {
        let out = normalize_title("snake_case ★ 이벤트 ※", BracketPolicy::Keep);
        assert_eq!(out, "snakecase 이벤트");
    }

    #[test]
    fn latin_accents_survive() {
        assert_eq!(normalize_title("Café Résumé", BracketPolicy::Keep), "café résumé");
    }

    #[test]
    fn empty_and_symbol_only_inputs_become_empty() {
        assert_eq!(normalize_title("", BracketPolicy::Keep), "");
        assert_eq!(normalize_title("!!! ??? ...", BracketPolicy::Strip), "");
    }
}
