use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;

use crate::error::{PipelineError, Result};
use crate::pipeline::processing::quantify::{AnalyzedRecord, EnforcementLevel};

pub const OUTPUT_TABLE_FILE: &str = "all_policies_analyzed.csv";
pub const METADATA_FILE: &str = "metadata.json";
pub const ALERTS_FILE: &str = "alerts.json";

/// Paths of the artifacts a run produced, plus the alert count for the run
/// summary.
#[derive(Debug)]
pub struct OutputArtifacts {
    pub table_path: PathBuf,
    pub metadata_path: PathBuf,
    pub alerts_path: PathBuf,
    pub alerts: usize,
}

/// One row of the analyzed output table. Column set and order are part of
/// the external interface and must stay stable.
#[derive(Debug, Serialize)]
struct OutputRow {
    source: String,
    title: String,
    date: String,
    url: String,
    doc_type: String,
    department: String,
    ai_score: i64,
    regulatory_score: i64,
    domain_tags: String,
    enforcement_level: String,
}

impl OutputRow {
    fn from_record(record: &AnalyzedRecord) -> Self {
        let base = &record.scored.record;
        Self {
            source: base.source.clone(),
            title: base.title.clone(),
            date: base.date.map(format_date).unwrap_or_default(),
            url: base.url.clone().unwrap_or_default(),
            doc_type: base.doc_type.label().to_string(),
            department: base.department.clone().unwrap_or_default(),
            ai_score: record.scored.ai_score,
            regulatory_score: record.regulatory_score,
            domain_tags: record
                .domain_tags
                .iter()
                .map(|t| t.label())
                .collect::<Vec<_>>()
                .join(";"),
            enforcement_level: record.enforcement_level.label().to_string(),
        }
    }
}

/// A record whose regulatory score reached the alert threshold. Offline
/// artifact for downstream reporting; delivery is someone else's job.
#[derive(Debug, Serialize)]
struct RiskAlert {
    title: String,
    url: String,
    source: String,
    date: String,
    regulatory_score: i64,
    enforcement_level: String,
    affected_domains: Vec<String>,
    risk_factors: Vec<String>,
}

impl RiskAlert {
    fn from_record(record: &AnalyzedRecord) -> Self {
        let base = &record.scored.record;
        let mut risk_factors = Vec::new();
        if record.risk.has_penalties {
            risk_factors.push("包含处罚条款".to_string());
        }
        if record.risk.has_deadlines {
            risk_factors.push("设定时间期限".to_string());
        }
        if record.risk.urgency_indicators > 0 {
            risk_factors.push("存在紧急性指标".to_string());
        }
        if matches!(
            record.enforcement_level,
            EnforcementLevel::LawsRegulations | EnforcementLevel::AdministrativeRules
        ) {
            risk_factors.push("强制执行级别高".to_string());
        }

        Self {
            title: base.title.clone(),
            url: base.url.clone().unwrap_or_default(),
            source: base.source.clone(),
            date: base.date.map(format_date).unwrap_or_default(),
            regulatory_score: record.regulatory_score,
            enforcement_level: record.enforcement_level.label().to_string(),
            affected_domains: record.domain_tags.iter().map(|t| t.label().to_string()).collect(),
            risk_factors,
        }
    }
}

/// Serialize the analyzed table plus its metadata and alert sidecars.
/// Everything is written atomically: a temp file in the target directory,
/// renamed over the destination on success, so readers never observe a
/// truncated artifact.
pub fn write_outputs(
    output_dir: &Path,
    analyzed: &[AnalyzedRecord],
    latest_date: Option<NaiveDate>,
    alert_threshold: i64,
) -> Result<OutputArtifacts> {
    fs::create_dir_all(output_dir)?;

    let mut ordered: Vec<&AnalyzedRecord> = analyzed.iter().collect();
    ordered.sort_by(|a, b| output_order(a, b));

    // Write the header explicitly so an empty result is still a well-formed
    // table rather than a zero-byte file
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(Vec::new());
    writer.write_record([
        "source",
        "title",
        "date",
        "url",
        "doc_type",
        "department",
        "ai_score",
        "regulatory_score",
        "domain_tags",
        "enforcement_level",
    ])?;
    for record in &ordered {
        writer.serialize(OutputRow::from_record(record))?;
    }
    let table_bytes = writer
        .into_inner()
        .map_err(|e| PipelineError::OutputWrite {
            path: OUTPUT_TABLE_FILE.to_string(),
            message: e.to_string(),
        })?;
    let table_path = atomic_write(output_dir, OUTPUT_TABLE_FILE, &table_bytes)?;
    info!(rows = ordered.len(), path = %table_path.display(), "wrote analyzed table");

    let metadata = serde_json::json!({
        "latest_date": latest_date.map(format_date),
    });
    let metadata_path = atomic_write(output_dir, METADATA_FILE, &serde_json::to_vec_pretty(&metadata)?)?;

    let mut alerts: Vec<&AnalyzedRecord> = ordered
        .iter()
        .copied()
        .filter(|r| r.regulatory_score >= alert_threshold)
        .collect();
    alerts.sort_by(|a, b| {
        b.regulatory_score
            .cmp(&a.regulatory_score)
            .then_with(|| a.scored.record.record_id.cmp(&b.scored.record.record_id))
    });
    let alert_rows: Vec<RiskAlert> = alerts.iter().map(|r| RiskAlert::from_record(r)).collect();
    let alerts_path = atomic_write(output_dir, ALERTS_FILE, &serde_json::to_vec_pretty(&alert_rows)?)?;
    if !alert_rows.is_empty() {
        info!(alerts = alert_rows.len(), "high regulatory score alerts generated");
    }

    Ok(OutputArtifacts {
        table_path,
        metadata_path,
        alerts_path,
        alerts: alert_rows.len(),
    })
}

/// Output table order: publication date descending with undated rows last,
/// then source, then record id. Total and deterministic, so reruns are
/// byte-identical.
fn output_order(a: &AnalyzedRecord, b: &AnalyzedRecord) -> Ordering {
    let ra = &a.scored.record;
    let rb = &b.scored.record;
    let date_order = match (ra.date, rb.date) {
        (Some(da), Some(db)) => db.cmp(&da),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    date_order
        .then_with(|| ra.source.cmp(&rb.source))
        .then_with(|| ra.record_id.cmp(&rb.record_id))
}

fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn atomic_write(dir: &Path, name: &str, bytes: &[u8]) -> Result<PathBuf> {
    let final_path = dir.join(name);
    let tmp_path = dir.join(format!(".{}.tmp", name));
    fs::write(&tmp_path, bytes).map_err(|e| PipelineError::OutputWrite {
        path: tmp_path.display().to_string(),
        message: e.to_string(),
    })?;
    fs::rename(&tmp_path, &final_path).map_err(|e| PipelineError::OutputWrite {
        path: final_path.display().to_string(),
        message: e.to_string(),
    })?;
    Ok(final_path)
}
