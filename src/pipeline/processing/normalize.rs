use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::types::{DocTypeHint, RawPolicyRecord};

/// A raw record after title cleanup, date resolution, and identifier
/// derivation. Never mutated after the normalizer produces it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedRecord {
    /// Stable identifier derived from source + title + date
    pub record_id: String,
    pub source: String,
    pub title: String,
    /// Best-effort calendar date; `None` when the source value is unparsable
    pub date: Option<NaiveDate>,
    pub url: Option<String>,
    pub doc_type: DocTypeHint,
    /// Standardized issuing department, when the source provided one
    pub department: Option<String>,
    pub body: Option<String>,
}

/// Normalizes raw records into canonical ones; records with no usable title
/// are dropped.
pub trait Normalizer {
    fn normalize(&self, raw: &RawPolicyRecord) -> Option<NormalizedRecord>;
}

/// Default normalizer shared by all source bodies
#[derive(Debug, Default)]
pub struct DefaultNormalizer;

// Footnote/annotation markers the scrapers leave behind: [1]-style and
// 【1】-style markers carry no title semantics.
static FOOTNOTE_MARKER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[\d+\]|【\d+】").unwrap());

static WHITESPACE_RUN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

impl Normalizer for DefaultNormalizer {
    fn normalize(&self, raw: &RawPolicyRecord) -> Option<NormalizedRecord> {
        let title = clean_title(&raw.title);
        if title.is_empty() {
            warn!(source = %raw.source, "dropping record with empty title after normalization");
            return None;
        }

        let date = raw.date.as_deref().and_then(parse_publication_date);
        let record_id = derive_record_id(&raw.source, &title, date);

        Some(NormalizedRecord {
            record_id,
            source: raw.source.clone(),
            title,
            date,
            url: raw.url.as_deref().map(str::trim).filter(|u| !u.is_empty()).map(String::from),
            doc_type: DocTypeHint::parse(raw.doc_type.as_deref()),
            department: raw.department.as_deref().map(standardize_department),
            body: raw.body.as_deref().map(str::trim).filter(|b| !b.is_empty()).map(String::from),
        })
    }
}

/// Normalize a batch, counting how many records were dropped for having no
/// usable title.
pub fn normalize_batch(
    normalizer: &dyn Normalizer,
    raw_records: &[RawPolicyRecord],
) -> (Vec<NormalizedRecord>, usize) {
    let mut normalized = Vec::with_capacity(raw_records.len());
    let mut dropped = 0usize;
    for raw in raw_records {
        match normalizer.normalize(raw) {
            Some(record) => normalized.push(record),
            None => dropped += 1,
        }
    }
    (normalized, dropped)
}

/// Strip markup noise and canonicalize whitespace. Substantive wrapper
/// phrases (关于…的通知 and the like) are preserved verbatim.
pub fn clean_title(title: &str) -> String {
    let without_markers = FOOTNOTE_MARKER_RE.replace_all(title, "");
    let unified: String = without_markers
        .chars()
        .map(|c| match c {
            // Zero-width and BOM characters leak in from scraped HTML
            '\u{200b}' | '\u{200c}' | '\u{200d}' | '\u{feff}' => ' ',
            // Full-width and non-breaking spaces collapse like ordinary ones
            '\u{3000}' | '\u{a0}' => ' ',
            other => other,
        })
        .collect();
    WHITESPACE_RUN_RE.replace_all(unified.trim(), " ").into_owned()
}

/// Resolve a scraped date string to a calendar date. Sources disagree on
/// formats; partial dates (year-month, year-only) resolve to the first day
/// of the period. Anything unparsable yields `None` and the record is kept.
pub fn parse_publication_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    // ISO datetime prefix: keep only the date part
    let date_part = trimmed.split(['T', ' ']).next().unwrap_or(trimmed);

    for format in ["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d", "%Y年%m月%d日"] {
        if let Ok(date) = NaiveDate::parse_from_str(date_part, format) {
            return Some(date);
        }
    }

    // Year-month resolves to the first of the month
    let with_day = format!("{}-01", date_part);
    for format in ["%Y-%m-%d", "%Y/%m-%d", "%Y年%m月-%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(&with_day, format) {
            return Some(date);
        }
    }

    // Year-only resolves to January 1st
    if let Ok(year) = date_part.parse::<i32>() {
        if (1900..=2100).contains(&year) {
            return NaiveDate::from_ymd_opt(year, 1, 1);
        }
    }

    None
}

/// Stable identifier: hex SHA-256 over source, cleaned title, and resolved
/// date. Unique within a run for distinct records, identical across runs.
pub fn derive_record_id(source: &str, title: &str, date: Option<NaiveDate>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    hasher.update(b"|");
    hasher.update(title.as_bytes());
    hasher.update(b"|");
    match date {
        Some(d) => hasher.update(d.format("%Y-%m-%d").to_string().as_bytes()),
        None => hasher.update(b"-"),
    }
    hex::encode(hasher.finalize())
}

/// Collapse the department-name variants the sources use into one agency
/// name per agency.
pub fn standardize_department(name: &str) -> String {
    let trimmed = name.trim();
    if trimmed.contains("工业和信息化部") {
        return "中华人民共和国工业和信息化部".to_string();
    }
    if trimmed.contains("网信办") || trimmed.contains("国家互联网信息办公室") {
        return "国家互联网信息办公室".to_string();
    }
    if trimmed.contains("市场监督管理总局") {
        return "国家市场监督管理总局".to_string();
    }
    if trimmed.contains("全国信息安全标准化技术委员会") {
        return "全国信息安全标准化技术委员会".to_string();
    }
    trimmed.to_string()
}
