use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::pipeline::processing::normalize::NormalizedRecord;

/// Configuration for policy clustering, passed in explicitly so tests can
/// run with synthetic thresholds.
#[derive(Debug, Clone)]
pub struct ClusterConfig {
    /// Publication-proximity window: artifacts of one policy are expected
    /// within this many days of each other
    pub window_days: i64,
    /// Minimum title similarity for records from the same source body
    pub similarity_threshold: f64,
    /// Minimum title similarity across source bodies (cross-posting only
    /// joins on near-identical titles)
    pub cross_source_threshold: f64,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            window_days: 14,
            similarity_threshold: 0.60,
            cross_source_threshold: 0.90,
        }
    }
}

/// A set of records believed to be artifacts of one underlying policy,
/// with one deterministically chosen canonical record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyCluster {
    pub canonical: NormalizedRecord,
    /// All members including the canonical record, ordered by record id
    pub members: Vec<NormalizedRecord>,
}

/// Groups normalized records into policy clusters
pub trait Clusterer {
    fn cluster(&self, records: Vec<NormalizedRecord>) -> Vec<PolicyCluster>;
}

/// Default clusterer: pairwise title similarity inside a sliding date
/// window, joined transitively with union-find.
#[derive(Debug, Default)]
pub struct TitleClusterer {
    pub config: ClusterConfig,
}

impl TitleClusterer {
    pub fn new(config: ClusterConfig) -> Self {
        Self { config }
    }

    fn pair_joins(&self, a: &NormalizedRecord, b: &NormalizedRecord) -> bool {
        let same_source = a.source == b.source;
        let threshold = if same_source {
            self.config.similarity_threshold
        } else {
            self.config.cross_source_threshold
        };

        match (a.date, b.date) {
            (Some(da), Some(db)) => {
                if (da - db).num_days().abs() > self.config.window_days {
                    return false;
                }
                title_similarity(&a.title, &b.title) >= threshold
            }
            // Neither record is dated: similarity alone decides
            (None, None) => title_similarity(&a.title, &b.title) >= threshold,
            // Exactly one date missing: only an identical core title joins,
            // so an undated artifact can still attach to its dated policy
            _ => comparable_title(&a.title) == comparable_title(&b.title),
        }
    }
}

impl Clusterer for TitleClusterer {
    fn cluster(&self, records: Vec<NormalizedRecord>) -> Vec<PolicyCluster> {
        if records.is_empty() {
            return Vec::new();
        }

        // Deterministic working order regardless of input order
        let mut records = records;
        records.sort_by(|a, b| a.record_id.cmp(&b.record_id));

        let mut uf = UnionFind::new(records.len());

        // Dated records, sorted by date so the window scan can stop early
        let mut dated: Vec<usize> = (0..records.len()).filter(|&i| records[i].date.is_some()).collect();
        dated.sort_by_key(|&i| (records[i].date, records[i].record_id.clone()));
        let undated: Vec<usize> = (0..records.len()).filter(|&i| records[i].date.is_none()).collect();

        for (pos, &i) in dated.iter().enumerate() {
            for &j in &dated[pos + 1..] {
                let gap = (records[j].date.unwrap() - records[i].date.unwrap()).num_days();
                if gap > self.config.window_days {
                    break;
                }
                if self.pair_joins(&records[i], &records[j]) {
                    uf.union(i, j);
                }
            }
        }

        // Undated records have no window to scan; compare against everything
        for (pos, &i) in undated.iter().enumerate() {
            for &j in &undated[pos + 1..] {
                if self.pair_joins(&records[i], &records[j]) {
                    uf.union(i, j);
                }
            }
            for &j in &dated {
                if self.pair_joins(&records[i], &records[j]) {
                    uf.union(i, j);
                }
            }
        }

        // Group members by their union-find root, keyed by the smallest
        // member record id so cluster order is reproducible
        let mut groups: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for i in 0..records.len() {
            let root = uf.find(i);
            groups
                .entry(records[root].record_id.clone())
                .or_default()
                .push(i);
        }

        groups
            .into_values()
            .map(|mut indices| {
                indices.sort_by(|&a, &b| records[a].record_id.cmp(&records[b].record_id));
                let members: Vec<NormalizedRecord> =
                    indices.iter().map(|&i| records[i].clone()).collect();
                let canonical = select_canonical(&members).clone();
                PolicyCluster { canonical, members }
            })
            .collect()
    }
}

/// Deterministic canonical-record choice: document-type priority first
/// (full text over announcement over Q&A), then earliest publication date
/// with undated members last, then smallest record id.
pub fn select_canonical(members: &[NormalizedRecord]) -> &NormalizedRecord {
    members
        .iter()
        .min_by(|a, b| {
            a.doc_type
                .canonical_priority()
                .cmp(&b.doc_type.canonical_priority())
                .then_with(|| cmp_date_earliest_first(a.date, b.date))
                .then_with(|| a.record_id.cmp(&b.record_id))
        })
        .expect("cluster has at least one member")
}

fn cmp_date_earliest_first(a: Option<NaiveDate>, b: Option<NaiveDate>) -> Ordering {
    match (a, b) {
        (Some(da), Some(db)) => da.cmp(&db),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

// Book-title quoting marks the strongest identity signal a title carries
static CORE_TITLE_RE: Lazy<Regex> = Lazy::new(|| Regex::new("《([^》]+)》").unwrap());

// Wrapper affixes that distinguish artifacts of one policy without changing
// which policy the title names
const WRAPPER_PREFIXES: &[&str] = &["关于印发", "关于发布", "关于"];
const WRAPPER_SUFFIXES: &[&str] = &[
    "的通知",
    "的公告",
    "的意见",
    "的决定",
    "的函",
    "（全文）",
    "(全文)",
    "全文",
    "政策解读",
    "解读",
    "问答",
];

/// The part of a title that identifies the policy itself: the 《...》 core
/// when present, otherwise the title with wrapper affixes peeled off.
pub fn comparable_title(title: &str) -> String {
    if let Some(captures) = CORE_TITLE_RE.captures(title) {
        return fold_title(&captures[1]);
    }

    let mut core = title.trim();
    for prefix in WRAPPER_PREFIXES {
        if let Some(stripped) = core.strip_prefix(prefix) {
            core = stripped.trim();
            break;
        }
    }
    for suffix in WRAPPER_SUFFIXES {
        if let Some(stripped) = core.strip_suffix(suffix) {
            core = stripped.trim();
            break;
        }
    }

    let folded = fold_title(core);
    if folded.is_empty() {
        fold_title(title)
    } else {
        folded
    }
}

/// Case- and punctuation-insensitive fold
fn fold_title(title: &str) -> String {
    title
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Title similarity in [0, 1]: Jaccard overlap of character bigrams over the
/// comparable titles. Equal comparable titles short-circuit to 1.0.
pub fn title_similarity(a: &str, b: &str) -> f64 {
    let core_a = comparable_title(a);
    let core_b = comparable_title(b);

    if core_a.is_empty() || core_b.is_empty() {
        return 0.0;
    }
    if core_a == core_b {
        return 1.0;
    }

    let bigrams_a = char_bigrams(&core_a);
    let bigrams_b = char_bigrams(&core_b);
    if bigrams_a.is_empty() || bigrams_b.is_empty() {
        return 0.0;
    }

    let intersection = bigrams_a.intersection(&bigrams_b).count();
    let union = bigrams_a.union(&bigrams_b).count();
    intersection as f64 / union as f64
}

fn char_bigrams(text: &str) -> HashSet<(char, char)> {
    let chars: Vec<char> = text.chars().collect();
    chars.windows(2).map(|w| (w[0], w[1])).collect()
}

/// Union-find with path compression, used to close the pairwise similarity
/// relation transitively.
struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new(size: usize) -> Self {
        Self {
            parent: (0..size).collect(),
        }
    }

    fn find(&mut self, i: usize) -> usize {
        if self.parent[i] != i {
            let root = self.find(self.parent[i]);
            self.parent[i] = root;
        }
        self.parent[i]
    }

    fn union(&mut self, a: usize, b: usize) {
        let root_a = self.find(a);
        let root_b = self.find(b);
        if root_a != root_b {
            // Smaller index wins so the result is order-independent
            let (keep, absorb) = if root_a < root_b { (root_a, root_b) } else { (root_b, root_a) };
            self.parent[absorb] = keep;
        }
    }
}
