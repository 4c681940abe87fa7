// src/record.rs
//! The notice record as collectors hand it over.

use chrono::NaiveDate;
use once_cell::sync::OnceCell;
use regex::Regex;

/// One scraped announcement.
///
/// `published` is kept verbatim so the corpus file round-trips without loss;
/// use [`NoticeRecord::published_date`] for the parsed calendar date.
///
/// `image_refs` holds trimmed, non-empty paths without `;`. Blank pieces and
/// the `nan` placeholder left by spreadsheet exports carry no reference and
/// are dropped both by [`NoticeRecord::with_images`] and on read, so a record
/// in this form round-trips unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NoticeRecord {
    pub title: String,
    pub published: String,
    pub body: String,
    pub link: String,
    pub image_refs: Vec<String>,
}

impl NoticeRecord {
    pub fn new(title: impl Into<String>, published: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            published: published.into(),
            ..Self::default()
        }
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = link.into();
        self
    }

    pub fn with_images<I, S>(mut self, refs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.image_refs = refs
            .into_iter()
            .flat_map(|r| {
                let joined: String = r.into();
                split_image_refs(&joined)
            })
            .collect();
        self
    }

    /// `None` when the date is absent or unparseable.
    pub fn published_date(&self) -> Option<NaiveDate> {
        parse_notice_date(&self.published)
    }
}

/// Parse the date formats seen across boards:
/// `2025.06.01`, `2025-6-1`, `2025/06/01 13:45`, `2025년 6월 1일`, `2025. 06. 01.`
/// and compact `20250601`.
pub fn parse_notice_date(raw: &str) -> Option<NaiveDate> {
    static RE_SEPARATED: OnceCell<Regex> = OnceCell::new();
    static RE_COMPACT: OnceCell<Regex> = OnceCell::new();

    let separated = RE_SEPARATED.get_or_init(|| {
        Regex::new(r"((?:19|20)\d{2})\s*[.\-/년\s]\s*(\d{1,2})\s*[.\-/월\s]\s*(\d{1,2})").unwrap()
    });
    let compact =
        RE_COMPACT.get_or_init(|| Regex::new(r"^\s*((?:19|20)\d{2})(\d{2})(\d{2})\b").unwrap());

    let caps = separated
        .captures(raw)
        .or_else(|| compact.captures(raw))?;
    let year = caps[1].parse().ok()?;
    let month = caps[2].parse().ok()?;
    let day = caps[3].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Split a `;`-joined image reference list, dropping empty pieces.
pub fn split_image_refs(joined: &str) -> Vec<String> {
    joined
        .split(';')
        .map(str::trim)
        .filter(|p| !p.is_empty() && !p.eq_ignore_ascii_case("nan"))
        .map(str::to_string)
        .collect()
}

pub fn join_image_refs(refs: &[String]) -> String {
    refs.join(";")
}
