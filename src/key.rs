// src/key.rs
//! Identity key: `"{normalized title}_{digits of the date}"`.
//!
//! Two records with equal keys are duplicates, full stop. No threshold or
//! date window is consulted, so this is a plain hash-set lookup.

use std::fmt;

use crate::normalize::{normalize_title, BracketPolicy};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NoticeKey(String);

impl NoticeKey {
    /// Build the key from a raw title and a raw date string in any observed format.
    pub fn new(title: &str, date: &str, brackets: BracketPolicy) -> Self {
        Self(format!("{}_{}", normalize_title(title, brackets), digits_only(date)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NoticeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Keep ASCII digits only: `"2025.06.01"`, `"2025-06-01"` and `"2025/06/01"`
/// all become `"20250601"`. `"2025.6.1"` stays `"202561"`.
pub fn digits_only(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn separators_do_not_change_the_key() {
        let a = NoticeKey::new("장학금 신청 안내", "2025.06.01", BracketPolicy::Keep);
        let b = NoticeKey::new("장학금  신청 안내!", "2025-06-01", BracketPolicy::Keep);
        let c = NoticeKey::new("장학금 신청 안내", "2025/06/01 ", BracketPolicy::Keep);
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(a.as_str(), "장학금 신청 안내_20250601");
    }

    #[test]
    fn bracket_policy_applies_to_the_title_part() {
        let keep = NoticeKey::new("[공지] 휴강 안내", "2025.03.02", BracketPolicy::Keep);
        let strip = NoticeKey::new("[공지] 휴강 안내", "2025.03.02", BracketPolicy::Strip);
        assert_eq!(keep.as_str(), "공지 휴강 안내_20250302");
        assert_eq!(strip.as_str(), "휴강 안내_20250302");
    }

    #[test]
    fn unpadded_dates_yield_a_different_key() {
        let padded = NoticeKey::new("행사", "2025.06.01", BracketPolicy::Keep);
        let loose = NoticeKey::new("행사", "2025.6.1", BracketPolicy::Keep);
        assert_ne!(padded, loose);
    }

    #[test]
    fn missing_date_keeps_trailing_separator() {
        let k = NoticeKey::new("행사", "", BracketPolicy::Keep);
        assert_eq!(k.to_string(), "행사_");
    }
}
