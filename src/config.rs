use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::constants;
use crate::error::{PipelineError, Result};
use crate::pipeline::processing::cluster::ClusterConfig;
use crate::pipeline::processing::relevance::AI_SCORE_THRESHOLD;

/// Run-scoped configuration, passed explicitly into each stage. Tests build
/// one by hand with synthetic values; production loads `config.toml` when
/// it exists and falls back to the defaults below.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Directory holding the per-source input CSV files
    pub input_dir: PathBuf,
    /// Directory the analyzed table and sidecars are written to
    pub output_dir: PathBuf,
    /// Source bodies to load, in output concatenation order
    pub sources: Vec<String>,
    pub cluster: ClusterConfig,
    pub ai_score_threshold: i64,
    /// Regulatory score at or above which a risk alert is generated
    pub alert_threshold: i64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("."),
            output_dir: PathBuf::from("output"),
            sources: constants::default_sources().iter().map(|s| s.to_string()).collect(),
            cluster: ClusterConfig::default(),
            ai_score_threshold: AI_SCORE_THRESHOLD,
            alert_threshold: 8,
        }
    }
}

/// The subset of configuration that may come from `config.toml`
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    input_dir: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    sources: Option<Vec<String>>,
    alert_threshold: Option<i64>,
}

impl PipelineConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = Self::default();
        if !path.exists() {
            return Ok(config);
        }

        let content = fs::read_to_string(path).map_err(|e| {
            PipelineError::Config(format!("failed to read config file '{}': {}", path.display(), e))
        })?;
        let file: FileConfig = toml::from_str(&content)?;

        if let Some(input_dir) = file.input_dir {
            config.input_dir = input_dir;
        }
        if let Some(output_dir) = file.output_dir {
            config.output_dir = output_dir;
        }
        if let Some(sources) = file.sources {
            config.sources = sources;
        }
        if let Some(alert_threshold) = file.alert_threshold {
            config.alert_threshold = alert_threshold;
        }
        Ok(config)
    }
}
