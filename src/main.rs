use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing::error;

use arpi_pipeline::config::PipelineConfig;
use arpi_pipeline::logging;
use arpi_pipeline::pipeline::processing::quantify::{
    classify_enforcement, identify_domains, regulatory_score_with_matches,
};
use arpi_pipeline::pipeline::processing::relevance::{score_text, AI_SCORE_THRESHOLD};
use arpi_pipeline::pipeline::Pipeline;

#[derive(Parser)]
#[command(name = "arpi_pipeline")]
#[command(about = "AI regulatory policy intelligence pipeline")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the unify-filter-analyze batch pipeline
    Run {
        /// Specific sources to load (comma-separated). Available: cac, miit, tc260
        #[arg(long)]
        sources: Option<String>,
        /// Directory containing the per-source input CSV files
        #[arg(long)]
        input_dir: Option<PathBuf>,
        /// Directory the analyzed table and sidecars are written to
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Print the rule-by-rule audit trace for a piece of policy text
    Score {
        /// Title or combined text to evaluate
        #[arg(long)]
        text: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    logging::init_logging();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            sources,
            input_dir,
            output_dir,
        } => {
            println!("🚀 Running policy analysis pipeline...");

            let mut config = PipelineConfig::load(Path::new("config.toml"))?;
            if let Some(source_list) = sources {
                config.sources = source_list.split(',').map(|s| s.trim().to_string()).collect();
            }
            if let Some(input_dir) = input_dir {
                config.input_dir = input_dir;
            }
            if let Some(output_dir) = output_dir {
                config.output_dir = output_dir;
            }

            match Pipeline::new(config).run().await {
                Ok(summary) => {
                    println!("\n📊 Pipeline Results:");
                    println!("   Raw records: {}", summary.raw_records);
                    println!(
                        "   Normalized: {} ({} dropped, {} duplicates)",
                        summary.normalized_records, summary.dropped_records, summary.duplicate_records
                    );
                    println!("   Policy clusters: {}", summary.clusters);
                    println!("   AI-relevant: {}", summary.ai_relevant_records);
                    println!("   Risk alerts: {}", summary.alerts);
                    match summary.latest_date {
                        Some(date) => println!("   Latest publication date: {}", date),
                        None => println!("   Latest publication date: unknown"),
                    }
                    println!("   Output file: {}", summary.output_file);
                }
                Err(e) => {
                    error!("Pipeline failed: {}", e);
                    println!("❌ Pipeline failed: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Commands::Score { text } => {
            let (ai_score, matched_keywords) = score_text(&text);
            println!("AI relevance score: {} (threshold {}, exclusive)", ai_score, AI_SCORE_THRESHOLD);
            if matched_keywords.is_empty() {
                println!("   No lexicon keywords matched");
            } else {
                println!("   Matched keywords: {}", matched_keywords.join(", "));
            }

            let haystack = text.to_lowercase();
            let (regulatory_score, matched_phrases) = regulatory_score_with_matches(&haystack);
            println!("Regulatory score: {}/10", regulatory_score);
            for (phrase, weight) in matched_phrases {
                println!("   {} ({:+})", phrase, weight);
            }

            let domains: Vec<&str> = identify_domains(&haystack).iter().map(|d| d.label()).collect();
            if domains.is_empty() {
                println!("Domains: none");
            } else {
                println!("Domains: {}", domains.join(", "));
            }

            println!("Enforcement level: {}", classify_enforcement(&text).label());
        }
    }
    Ok(())
}
