use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::config::PipelineConfig;
use crate::constants;
use crate::error::{PipelineError, Result};
use crate::types::RawPolicyRecord;

/// A retrieval collaborator: something that yields raw policy records for
/// one source body. The production implementation reads the CSV file the
/// source's scraper produced.
#[async_trait]
pub trait PolicySource: Send + Sync {
    /// Source body id this collaborator produces records for
    fn source_id(&self) -> &str;

    /// Fetch all raw records from this source
    async fn fetch_records(&self) -> Result<Vec<RawPolicyRecord>>;
}

/// Reads one source body's records from its scraped CSV file
pub struct CsvPolicySource {
    source_id: String,
    path: PathBuf,
}

impl CsvPolicySource {
    pub fn new(source_id: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            source_id: source_id.into(),
            path: path.into(),
        }
    }
}

#[async_trait]
impl PolicySource for CsvPolicySource {
    fn source_id(&self) -> &str {
        &self.source_id
    }

    async fn fetch_records(&self) -> Result<Vec<RawPolicyRecord>> {
        let source_id = self.source_id.clone();
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || read_csv_records(&source_id, &path))
            .await
            .map_err(|e| PipelineError::Config(format!("source load task failed: {}", e)))?
    }
}

/// Input row as the scrapers write it. The aliases accept the column
/// spellings of the historical scraper output alongside the unified ones.
#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(default)]
    #[allow(dead_code)]
    source: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default, alias = "publication_date")]
    date: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    doc_type: Option<String>,
    #[serde(default, alias = "issuing_department")]
    department: Option<String>,
    #[serde(default, alias = "full_text")]
    body: Option<String>,
}

fn read_csv_records(source_id: &str, path: &Path) -> Result<Vec<RawPolicyRecord>> {
    let content = fs::read_to_string(path)?;
    // pandas-produced files open with a UTF-8 BOM that would otherwise glue
    // itself onto the first header name
    let content = content.strip_prefix('\u{feff}').unwrap_or(&content);

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut records = Vec::new();
    for (index, row) in reader.deserialize::<CsvRow>().enumerate() {
        match row {
            Ok(row) => records.push(RawPolicyRecord {
                // The loader tags provenance; a `source` column in the file
                // does not override it
                source: source_id.to_string(),
                title: row.title.unwrap_or_default(),
                date: row.date,
                url: row.url,
                doc_type: row.doc_type,
                department: row.department,
                body: row.body,
            }),
            Err(e) => {
                warn!(source = source_id, row = index + 1, "skipping malformed row: {}", e);
            }
        }
    }
    Ok(records)
}

/// Loads every configured source concurrently and concatenates the results
/// in configuration order. An absent input file is a warning, not an error;
/// the run proceeds on whatever subset exists.
pub struct SourceLoader {
    sources: Vec<Arc<dyn PolicySource>>,
}

impl SourceLoader {
    pub fn new(sources: Vec<Arc<dyn PolicySource>>) -> Self {
        Self { sources }
    }

    /// Build the conventional per-source CSV loaders for a pipeline run
    pub fn from_config(config: &PipelineConfig) -> Self {
        let sources = config
            .sources
            .iter()
            .map(|source| {
                let path = config.input_dir.join(constants::source_input_filename(source));
                Arc::new(CsvPolicySource::new(source.clone(), path)) as Arc<dyn PolicySource>
            })
            .collect();
        Self::new(sources)
    }

    pub async fn load_all(&self) -> Vec<RawPolicyRecord> {
        let mut tasks = JoinSet::new();
        for (index, source) in self.sources.iter().enumerate() {
            let source = Arc::clone(source);
            tasks.spawn(async move {
                let source_id = source.source_id().to_string();
                (index, source_id, source.fetch_records().await)
            });
        }

        let mut loaded: Vec<(usize, Vec<RawPolicyRecord>)> = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            let Ok((index, source_id, result)) = joined else {
                warn!("source load task panicked");
                continue;
            };
            match result {
                Ok(records) => {
                    info!(source = %source_id, records = records.len(), "loaded source");
                    loaded.push((index, records));
                }
                Err(PipelineError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                    warn!(source = %source_id, "input file not found, skipping source");
                }
                Err(e) => {
                    warn!(source = %source_id, "failed to load source, skipping: {}", e);
                }
            }
        }

        // Concatenate in configuration order so a run's raw sequence does
        // not depend on task completion order
        loaded.sort_by_key(|(index, _)| *index);
        loaded.into_iter().flat_map(|(_, records)| records).collect()
    }
}
