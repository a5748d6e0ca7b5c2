use serde::{Deserialize, Serialize};

/// Raw policy record as produced by the retrieval collaborators, one CSV per
/// source body. Only `title` is required to be meaningful; everything else
/// degrades to `None` rather than failing the load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawPolicyRecord {
    /// Source body id, tagged by the loader (overrides any `source` column)
    pub source: String,
    pub title: String,
    /// Publication date as scraped, in whatever format the source uses
    pub date: Option<String>,
    pub url: Option<String>,
    /// Free-form document type hint ("full text", "公告", "问答", ...)
    pub doc_type: Option<String>,
    /// Issuing department as scraped, before standardization
    pub department: Option<String>,
    /// Full body text where the scraper captured it
    pub body: Option<String>,
}

/// Parsed document type hint, ordered by preference for canonical selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocTypeHint {
    FullText,
    Announcement,
    Qa,
    Unknown,
}

impl DocTypeHint {
    /// Parse the free-form hint scrapers attach to a record
    pub fn parse(hint: Option<&str>) -> Self {
        let Some(hint) = hint else {
            return DocTypeHint::Unknown;
        };
        let folded = hint.trim().to_lowercase();
        match folded.as_str() {
            "full text" | "fulltext" | "full_text" | "全文" | "正文" => DocTypeHint::FullText,
            "announcement" | "公告" | "通知" | "发布" => DocTypeHint::Announcement,
            "q&a" | "qa" | "问答" | "解读" | "答记者问" => DocTypeHint::Qa,
            _ => DocTypeHint::Unknown,
        }
    }

    /// Selection priority when choosing a cluster's canonical record.
    /// Lower is preferred: full text beats announcement beats Q&A.
    pub fn canonical_priority(&self) -> u8 {
        match self {
            DocTypeHint::FullText => 0,
            DocTypeHint::Announcement => 1,
            DocTypeHint::Qa => 2,
            DocTypeHint::Unknown => 3,
        }
    }

    /// Stable label used in the output table
    pub fn label(&self) -> &'static str {
        match self {
            DocTypeHint::FullText => "full text",
            DocTypeHint::Announcement => "announcement",
            DocTypeHint::Qa => "q&a",
            DocTypeHint::Unknown => "unknown",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doc_type_hint_parses_common_spellings() {
        assert_eq!(DocTypeHint::parse(Some("full text")), DocTypeHint::FullText);
        assert_eq!(DocTypeHint::parse(Some("全文")), DocTypeHint::FullText);
        assert_eq!(DocTypeHint::parse(Some("公告")), DocTypeHint::Announcement);
        assert_eq!(DocTypeHint::parse(Some("Q&A")), DocTypeHint::Qa);
        assert_eq!(DocTypeHint::parse(Some("something else")), DocTypeHint::Unknown);
        assert_eq!(DocTypeHint::parse(None), DocTypeHint::Unknown);
    }

    #[test]
    fn full_text_outranks_announcement_and_qa() {
        assert!(DocTypeHint::FullText.canonical_priority() < DocTypeHint::Announcement.canonical_priority());
        assert!(DocTypeHint::Announcement.canonical_priority() < DocTypeHint::Qa.canonical_priority());
        assert!(DocTypeHint::Qa.canonical_priority() < DocTypeHint::Unknown.canonical_priority());
    }
}
