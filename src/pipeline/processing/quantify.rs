use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::pipeline::processing::relevance::ScoredRecord;

/// Midpoint a record starts from when no polarity phrase matches. Fixed
/// convention: 5, the innovation-leaning side of neutral.
pub const NEUTRAL_REGULATORY_SCORE: i64 = 5;
pub const REGULATORY_SCORE_MIN: i64 = 1;
pub const REGULATORY_SCORE_MAX: i64 = 10;

/// Polarity-indicating phrases with signed weights. Positive weights pull
/// the regulatory score toward 10 (restriction, penalty, prohibition),
/// negative weights toward 1 (support, encouragement, pilot promotion).
/// Each phrase counts once per record; the final score is the midpoint plus
/// the net signed weight, clamped to [1, 10].
pub const POLARITY_PHRASES: &[(&str, i64)] = &[
    // Prohibition and penalty
    ("严禁", 5),
    ("停业", 5),
    ("吊销", 5),
    ("禁止", 4),
    ("违法", 4),
    ("处罚", 4),
    ("查处", 4),
    ("不得", 3),
    ("责令", 3),
    ("督查", 3),
    ("审查", 3),
    // Supervision and compliance
    ("监管", 2),
    ("合规", 2),
    ("审批", 2),
    ("许可", 2),
    ("检查", 2),
    ("整改", 2),
    ("安全评估", 2),
    ("备案", 1),
    ("资质", 1),
    ("认证", 1),
    ("必须", 1),
    ("义务", 1),
    ("风险", 1),
    ("规范", 1),
    ("管理", 1),
    // Encouragement and promotion
    ("鼓励", -4),
    ("支持", -4),
    ("促进", -4),
    ("创新", -4),
    ("突破", -4),
    ("赋能", -4),
    ("推动", -3),
    ("加快", -3),
    ("推广", -3),
    ("发展", -2),
    ("提升", -2),
    ("优化", -2),
    ("试点", -2),
    ("示范", -2),
    ("转型", -2),
    ("升级", -2),
    ("数字化", -2),
    ("应用", -1),
];

/// Subject-matter domains a policy can address
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DomainTag {
    PrivacyProtection,
    AlgorithmTransparency,
    MinorProtection,
    GenerativeAi,
    DataSecurity,
    ContentSafety,
}

impl DomainTag {
    pub fn label(&self) -> &'static str {
        match self {
            DomainTag::PrivacyProtection => "隐私保护",
            DomainTag::AlgorithmTransparency => "算法透明度",
            DomainTag::MinorProtection => "未成年人保护",
            DomainTag::GenerativeAi => "生成式AI",
            DomainTag::DataSecurity => "数据安全",
            DomainTag::ContentSafety => "内容安全",
        }
    }
}

/// Domain label to keyword set. A record receives a tag when any of the
/// domain's keywords appears in its text; zero tags is a valid outcome.
pub const DOMAIN_RULES: &[(DomainTag, &[&str])] = &[
    (DomainTag::PrivacyProtection, &["隐私", "个人信息", "数据保护", "信息保护", "敏感信息"]),
    (DomainTag::AlgorithmTransparency, &["算法", "算法透明", "可解释", "黑盒", "算法歧视", "算法公平"]),
    (DomainTag::MinorProtection, &["未成年", "儿童", "青少年", "学生"]),
    (DomainTag::GenerativeAi, &["生成式", "大模型", "aigc", "生成式人工智能", "深度合成"]),
    (DomainTag::DataSecurity, &["数据安全", "网络安全", "信息安全", "数据泄露", "网络攻击"]),
    (DomainTag::ContentSafety, &["内容安全", "有害信息", "虚假信息", "不良内容", "违法内容"]),
];

/// Legal-authority tier of a document, ordered from highest binding force
/// to lowest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EnforcementLevel {
    LawsRegulations,
    AdministrativeRules,
    SectoralStandards,
    Guidance,
}

impl EnforcementLevel {
    pub fn label(&self) -> &'static str {
        match self {
            EnforcementLevel::LawsRegulations => "法律法规",
            EnforcementLevel::AdministrativeRules => "行政规章",
            EnforcementLevel::SectoralStandards => "行业标准",
            EnforcementLevel::Guidance => "指导性文件",
        }
    }
}

/// Title patterns per tier, evaluated in this order; the first tier with a
/// matching pattern wins. A bare title-final 法 (网络安全法) is statute,
/// but 办法 is not, hence the regex below rather than a 法 keyword.
pub const ENFORCEMENT_RULES: &[(EnforcementLevel, &[&str])] = &[
    (EnforcementLevel::LawsRegulations, &["法律", "法规", "条例", "刑法", "民法"]),
    (EnforcementLevel::AdministrativeRules, &["规定", "办法", "细则", "规章"]),
    (EnforcementLevel::SectoralStandards, &["标准", "规范", "准则", "指引"]),
    (EnforcementLevel::Guidance, &["意见", "通知", "指南", "倡议", "指导", "建议"]),
];

static STATUTE_TITLE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^办]法》?$").unwrap());

static DEADLINE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{4}年\d{1,2}月").unwrap());

const PENALTY_TERMS: &[&str] = &["处罚", "罚款", "责任", "违法"];
const URGENCY_TERMS: &[&str] = &["紧急", "立即", "尽快", "马上"];

/// Compliance-risk signals extracted alongside the three main attributes
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RiskFlags {
    pub has_penalties: bool,
    pub has_deadlines: bool,
    pub urgency_indicators: usize,
}

/// Terminal pipeline entity: a filtered record with all derived analytical
/// attributes. Every field is always computed; none is ever partial.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzedRecord {
    pub scored: ScoredRecord,
    /// 1 = strongly innovation-friendly, 10 = strongly restrictive
    pub regulatory_score: i64,
    pub domain_tags: BTreeSet<DomainTag>,
    pub enforcement_level: EnforcementLevel,
    pub risk: RiskFlags,
}

/// Computes the three derived attributes from independent rule sets
pub trait Quantifier {
    fn quantify(&self, scored: ScoredRecord) -> AnalyzedRecord;
}

/// Default quantifier backed by the static rule tables above
#[derive(Debug, Default)]
pub struct PolicyQuantifier;

impl Quantifier for PolicyQuantifier {
    fn quantify(&self, scored: ScoredRecord) -> AnalyzedRecord {
        let text = crate::pipeline::processing::relevance::searchable_text(&scored.record);
        let haystack = text.to_lowercase();

        let (regulatory_score, _) = regulatory_score_with_matches(&haystack);
        let domain_tags = identify_domains(&haystack);
        let enforcement_level = classify_enforcement(&scored.record.title);
        let risk = assess_risk(&haystack);

        AnalyzedRecord {
            scored,
            regulatory_score,
            domain_tags,
            enforcement_level,
            risk,
        }
    }
}

/// Midpoint plus net signed weight of all matched polarity phrases, clamped
/// to [1, 10]. Returns the matched phrases for auditing.
pub fn regulatory_score_with_matches(haystack: &str) -> (i64, Vec<(&'static str, i64)>) {
    let mut matched = Vec::new();
    let mut net = 0i64;
    for &(phrase, weight) in POLARITY_PHRASES {
        if haystack.contains(phrase) {
            matched.push((phrase, weight));
            net += weight;
        }
    }
    let score = (NEUTRAL_REGULATORY_SCORE + net).clamp(REGULATORY_SCORE_MIN, REGULATORY_SCORE_MAX);
    (score, matched)
}

/// Every domain whose keyword set intersects the text
pub fn identify_domains(haystack: &str) -> BTreeSet<DomainTag> {
    let mut tags = BTreeSet::new();
    for &(tag, keywords) in DOMAIN_RULES {
        if keywords.iter().any(|k| haystack.contains(k)) {
            tags.insert(tag);
        }
    }
    tags
}

/// First matching tier in fixed priority order; 指导性文件 when nothing
/// matches, so classification is total.
pub fn classify_enforcement(title: &str) -> EnforcementLevel {
    if STATUTE_TITLE_RE.is_match(title) {
        return EnforcementLevel::LawsRegulations;
    }
    for &(level, keywords) in ENFORCEMENT_RULES {
        if keywords.iter().any(|k| title.contains(k)) {
            return level;
        }
    }
    EnforcementLevel::Guidance
}

fn assess_risk(haystack: &str) -> RiskFlags {
    RiskFlags {
        has_penalties: PENALTY_TERMS.iter().any(|t| haystack.contains(t)),
        has_deadlines: DEADLINE_RE.is_match(haystack),
        urgency_indicators: URGENCY_TERMS.iter().map(|t| haystack.matches(t).count()).sum(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::processing::normalize::{derive_record_id, NormalizedRecord};
    use crate::pipeline::processing::relevance::ScoredRecord;
    use crate::types::DocTypeHint;

    fn scored(title: &str, body: Option<&str>) -> ScoredRecord {
        ScoredRecord {
            record: NormalizedRecord {
                record_id: derive_record_id("cac", title, None),
                source: "cac".to_string(),
                title: title.to_string(),
                date: None,
                url: None,
                doc_type: DocTypeHint::Unknown,
                department: None,
                body: body.map(String::from),
            },
            ai_score: 5,
            matched_keywords: vec!["人工智能".to_string()],
        }
    }

    #[test]
    fn restrictive_text_scores_high() {
        let (score, matched) =
            regulatory_score_with_matches("严禁利用算法从事违法活动，违者吊销许可并处罚");
        assert_eq!(score, REGULATORY_SCORE_MAX);
        assert!(matched.iter().any(|(p, _)| *p == "严禁"));
    }

    #[test]
    fn supportive_text_scores_low() {
        let (score, _) = regulatory_score_with_matches("鼓励创新，支持试点示范，促进产业发展");
        assert_eq!(score, REGULATORY_SCORE_MIN);
    }

    #[test]
    fn unmatched_text_stays_at_midpoint() {
        let (score, matched) = regulatory_score_with_matches("某部门年度工作会议在京召开");
        assert_eq!(score, NEUTRAL_REGULATORY_SCORE);
        assert!(matched.is_empty());
    }

    #[test]
    fn score_is_always_in_range() {
        for text in ["严禁禁止不得违法处罚停业吊销责令查处", "鼓励支持促进创新突破赋能推动加快", ""] {
            let (score, _) = regulatory_score_with_matches(text);
            assert!((REGULATORY_SCORE_MIN..=REGULATORY_SCORE_MAX).contains(&score));
        }
    }

    #[test]
    fn domains_accumulate_and_empty_is_valid() {
        let tags = identify_domains("个人信息保护与数据安全管理，涉及算法备案");
        assert!(tags.contains(&DomainTag::PrivacyProtection));
        assert!(tags.contains(&DomainTag::DataSecurity));
        assert!(tags.contains(&DomainTag::AlgorithmTransparency));

        assert!(identify_domains("年度工作总结").is_empty());
    }

    #[test]
    fn enforcement_priority_order_is_fixed() {
        // 条例 outranks the 规定 also present in the title
        assert_eq!(classify_enforcement("互联网信息服务管理条例实施规定"), EnforcementLevel::LawsRegulations);
        assert_eq!(classify_enforcement("生成式人工智能服务管理暂行办法"), EnforcementLevel::AdministrativeRules);
        assert_eq!(classify_enforcement("网络安全标准实践指引"), EnforcementLevel::SectoralStandards);
        assert_eq!(classify_enforcement("关于加强科技伦理治理的意见"), EnforcementLevel::Guidance);
    }

    #[test]
    fn title_final_fa_is_statute_but_banfa_is_not() {
        assert_eq!(classify_enforcement("中华人民共和国网络安全法"), EnforcementLevel::LawsRegulations);
        assert_eq!(classify_enforcement("《个人信息保护法》"), EnforcementLevel::LawsRegulations);
        assert_eq!(classify_enforcement("网络安全审查办法"), EnforcementLevel::AdministrativeRules);
    }

    #[test]
    fn unmatched_title_defaults_to_guidance() {
        assert_eq!(classify_enforcement("2024年世界人工智能大会"), EnforcementLevel::Guidance);
    }

    #[test]
    fn quantifier_is_total() {
        let quantifier = PolicyQuantifier;
        let analyzed = quantifier.quantify(scored("完全不含规则词汇的题目", None));
        assert_eq!(analyzed.regulatory_score, NEUTRAL_REGULATORY_SCORE);
        assert!(analyzed.domain_tags.is_empty());
        assert_eq!(analyzed.enforcement_level, EnforcementLevel::Guidance);
        assert!(!analyzed.risk.has_penalties);
    }

    #[test]
    fn risk_flags_detect_penalties_and_deadlines() {
        let quantifier = PolicyQuantifier;
        let analyzed = quantifier.quantify(scored(
            "算法安全管理规定",
            Some("违反本规定的，处以罚款。相关系统应于2024年6月前完成整改。"),
        ));
        assert!(analyzed.risk.has_penalties);
        assert!(analyzed.risk.has_deadlines);
    }
}
