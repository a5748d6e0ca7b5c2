pub mod ingestion;
pub mod processing;

use std::collections::HashSet;

use chrono::NaiveDate;
use metrics::{counter, histogram};
use serde::Serialize;
use tracing::{info, instrument};

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::output::{write_outputs, OutputArtifacts};
use crate::pipeline::ingestion::SourceLoader;
use crate::pipeline::processing::cluster::{Clusterer, TitleClusterer};
use crate::pipeline::processing::normalize::{normalize_batch, DefaultNormalizer};
use crate::pipeline::processing::quantify::{PolicyQuantifier, Quantifier};
use crate::pipeline::processing::relevance::RelevanceFilter;

/// Per-stage counts for a complete pipeline run, so silent data loss is
/// observable from the run report.
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub raw_records: usize,
    pub normalized_records: usize,
    /// Records dropped for having no usable title
    pub dropped_records: usize,
    /// Exact duplicate rows collapsed after normalization
    pub duplicate_records: usize,
    pub clusters: usize,
    pub ai_relevant_records: usize,
    pub analyzed_records: usize,
    pub alerts: usize,
    /// Most recent publication date across all inputs, filtered or not
    pub latest_date: Option<NaiveDate>,
    pub output_file: String,
}

/// One-shot batch pipeline: load, normalize, cluster, filter, quantify,
/// write. Holds no state across runs beyond the files it reads and writes.
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<RunSummary> {
        counter!("arpi_pipeline_runs_total").increment(1);
        let run_start = std::time::Instant::now();

        // Stage 1: load every configured source
        let raw_records = SourceLoader::from_config(&self.config).load_all().await;
        info!(records = raw_records.len(), "loaded raw records");
        counter!("arpi_raw_records_total").increment(raw_records.len() as u64);

        // Stage 2: normalize and collapse exact duplicates
        let (mut normalized, dropped) = normalize_batch(&DefaultNormalizer, &raw_records);
        let mut seen = HashSet::new();
        let before_dedup = normalized.len();
        normalized.retain(|record| seen.insert(record.record_id.clone()));
        let duplicates = before_dedup - normalized.len();
        info!(
            records = normalized.len(),
            dropped, duplicates, "normalized raw records"
        );

        // Freshness metadata covers every input record, including the ones
        // the filter will discard
        let latest_date = normalized.iter().filter_map(|r| r.date).max();

        // Stage 3: collapse policy artifacts into clusters
        let clusterer = TitleClusterer::new(self.config.cluster.clone());
        let clusters = clusterer.cluster(normalized);
        info!(clusters = clusters.len(), "formed policy clusters");
        counter!("arpi_policy_clusters_total").increment(clusters.len() as u64);

        // Stage 4: AI relevance filter over canonical records
        let canonical: Vec<_> = clusters.into_iter().map(|c| c.canonical).collect();
        let filter = RelevanceFilter::new(self.config.ai_score_threshold);
        let cluster_count = canonical.len();
        let scored = filter.filter(canonical);
        info!(
            retained = scored.len(),
            scanned = cluster_count,
            "applied AI relevance filter"
        );
        counter!("arpi_ai_relevant_records_total").increment(scored.len() as u64);

        // Stage 5: quantify every surviving record
        let quantifier = PolicyQuantifier;
        let analyzed: Vec<_> = scored.into_iter().map(|s| quantifier.quantify(s)).collect();

        // Stage 6: write the analyzed table and its sidecars atomically
        let OutputArtifacts {
            table_path,
            alerts: alert_count,
            ..
        } = write_outputs(
            &self.config.output_dir,
            &analyzed,
            latest_date,
            self.config.alert_threshold,
        )?;

        histogram!("arpi_pipeline_duration_seconds").record(run_start.elapsed().as_secs_f64());

        Ok(RunSummary {
            raw_records: raw_records.len(),
            normalized_records: before_dedup - duplicates,
            dropped_records: dropped,
            duplicate_records: duplicates,
            clusters: cluster_count,
            ai_relevant_records: analyzed.len(),
            analyzed_records: analyzed.len(),
            alerts: alert_count,
            latest_date,
            output_file: table_path.display().to_string(),
        })
    }
}
