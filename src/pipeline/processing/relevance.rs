use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::pipeline::processing::normalize::NormalizedRecord;

/// Records survive the relevance filter only when their score is strictly
/// greater than this. The value is fixed: it is what separates policies
/// centrally about AI from ones that merely mention it, and changing it
/// would change the meaning of historical output.
pub const AI_SCORE_THRESHOLD: i64 = 4;

/// Curated AI-relevance lexicon. Each entry carries an integer weight
/// reflecting how strongly the term implies the policy is about AI; the
/// table is declarative so every score is traceable to its matched rows.
pub const AI_LEXICON: &[(&str, i64)] = &[
    // Core AI terminology
    ("人工智能", 3),
    ("大模型", 3),
    ("生成式", 3),
    ("aigc", 3),
    // Key technologies
    ("算法", 2),
    ("智能", 2),
    ("深度合成", 2),
    ("机器学习", 2),
    ("深度学习", 2),
    // Weaker signals
    ("ai", 1),
    ("自然语言处理", 1),
    ("算法推荐", 1),
    ("深度伪造", 1),
];

/// A canonical record together with its AI-relevance score and the lexicon
/// entries that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredRecord {
    pub record: NormalizedRecord,
    pub ai_score: i64,
    /// Lexicon keywords found in the record, in lexicon order
    pub matched_keywords: Vec<String>,
}

/// Retains canonical records whose AI score exceeds the threshold
#[derive(Debug, Clone)]
pub struct RelevanceFilter {
    pub threshold: i64,
}

impl Default for RelevanceFilter {
    fn default() -> Self {
        Self {
            threshold: AI_SCORE_THRESHOLD,
        }
    }
}

impl RelevanceFilter {
    pub fn new(threshold: i64) -> Self {
        Self { threshold }
    }

    /// Score every canonical record and keep the ones above the threshold
    pub fn filter(&self, canonical_records: Vec<NormalizedRecord>) -> Vec<ScoredRecord> {
        let mut survivors = Vec::new();
        for record in canonical_records {
            let (ai_score, matched_keywords) = score_text(&searchable_text(&record));
            if ai_score > self.threshold {
                survivors.push(ScoredRecord {
                    record,
                    ai_score,
                    matched_keywords,
                });
            } else {
                debug!(
                    title = %record.title,
                    ai_score,
                    "record below AI relevance threshold"
                );
            }
        }
        survivors
    }
}

/// The text a record is scored on: the title, plus the body when the
/// scraper captured one. Title-only scoring is expected, not an error.
pub fn searchable_text(record: &NormalizedRecord) -> String {
    match &record.body {
        Some(body) => format!("{}\n{}", record.title, body),
        None => record.title.clone(),
    }
}

/// Sum the weights of all lexicon entries present in the text. Each keyword
/// counts once per record regardless of how often it occurs, so long
/// documents carry no length bias.
pub fn score_text(text: &str) -> (i64, Vec<String>) {
    let haystack = text.to_lowercase();
    let mut score = 0;
    let mut matched = Vec::new();
    for &(keyword, weight) in AI_LEXICON {
        if contains_keyword(&haystack, keyword) {
            score += weight;
            matched.push(keyword.to_string());
        }
    }
    (score, matched)
}

/// Substring match, except that purely ASCII keywords ("ai") must sit on
/// word boundaries so they cannot fire inside unrelated English words.
fn contains_keyword(haystack: &str, keyword: &str) -> bool {
    if !keyword.is_ascii() {
        return haystack.contains(keyword);
    }
    let mut start = 0;
    while let Some(pos) = haystack[start..].find(keyword) {
        let begin = start + pos;
        let end = begin + keyword.len();
        let before_ok = haystack[..begin]
            .chars()
            .next_back()
            .map_or(true, |c| !c.is_ascii_alphanumeric());
        let after_ok = haystack[end..]
            .chars()
            .next()
            .map_or(true, |c| !c.is_ascii_alphanumeric());
        if before_ok && after_ok {
            return true;
        }
        start = end;
    }
    false
}
