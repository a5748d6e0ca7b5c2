use std::fs;
use std::path::Path;

use anyhow::Result;
use arpi_pipeline::config::PipelineConfig;
use arpi_pipeline::output::{ALERTS_FILE, METADATA_FILE, OUTPUT_TABLE_FILE};
use arpi_pipeline::pipeline::Pipeline;
use tempfile::tempdir;

fn write_source(dir: &Path, name: &str, rows: &[&str]) {
    let mut content = String::from("title,publication_date,url,doc_type,issuing_department,full_text\n");
    for row in rows {
        content.push_str(row);
        content.push('\n');
    }
    fs::write(dir.join(name), content).unwrap();
}

fn test_config(input_dir: &Path, output_dir: &Path) -> PipelineConfig {
    PipelineConfig {
        input_dir: input_dir.to_path_buf(),
        output_dir: output_dir.to_path_buf(),
        ..PipelineConfig::default()
    }
}

const MIIT_ANNOUNCEMENT: &str =
    "关于人工智能安全管理的通知,2024-01-10,https://miit.example/a,announcement,工业和信息化部,";
const MIIT_FULL_TEXT: &str =
    "人工智能安全管理办法（全文）,2024-01-12,https://miit.example/b,full text,工业和信息化部,";
const CAC_REVIEW_MEASURES: &str =
    "网络安全审查办法,2024-02-01,https://cac.example/c,full text,国家网信办,";

#[tokio::test]
async fn end_to_end_clusters_filters_and_analyzes() -> Result<()> {
    let input = tempdir()?;
    let output = tempdir()?;
    write_source(input.path(), "miit_all_policies.csv", &[MIIT_ANNOUNCEMENT, MIIT_FULL_TEXT]);
    write_source(input.path(), "cac_all_policies.csv", &[CAC_REVIEW_MEASURES]);

    let summary = Pipeline::new(test_config(input.path(), output.path())).run().await?;

    assert_eq!(summary.raw_records, 3);
    assert_eq!(summary.normalized_records, 3);
    // The announcement and the full text are artifacts of one policy
    assert_eq!(summary.clusters, 2);
    // Only the AI policy survives the relevance filter
    assert_eq!(summary.ai_relevant_records, 1);

    let table = fs::read_to_string(output.path().join(OUTPUT_TABLE_FILE))?;
    let rows: Vec<&str> = table.lines().skip(1).collect();
    assert_eq!(rows.len(), 1);
    // The full text is the canonical artifact, not the announcement
    assert!(rows[0].contains("人工智能安全管理办法（全文）"));
    assert!(rows[0].contains("full text"));
    assert!(rows[0].starts_with("miit,"));
    assert!(!table.contains("网络安全审查办法"));

    // Freshness metadata covers filtered-out records too
    let metadata: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(output.path().join(METADATA_FILE))?)?;
    assert_eq!(metadata["latest_date"], "2024-02-01");

    Ok(())
}

#[tokio::test]
async fn rerunning_identical_inputs_is_byte_identical() -> Result<()> {
    let input = tempdir()?;
    let output = tempdir()?;
    write_source(input.path(), "miit_all_policies.csv", &[MIIT_ANNOUNCEMENT, MIIT_FULL_TEXT]);
    write_source(input.path(), "cac_all_policies.csv", &[CAC_REVIEW_MEASURES]);

    let config = test_config(input.path(), output.path());
    Pipeline::new(config.clone()).run().await?;
    let first_table = fs::read(output.path().join(OUTPUT_TABLE_FILE))?;
    let first_metadata = fs::read(output.path().join(METADATA_FILE))?;
    let first_alerts = fs::read(output.path().join(ALERTS_FILE))?;

    Pipeline::new(config).run().await?;
    assert_eq!(first_table, fs::read(output.path().join(OUTPUT_TABLE_FILE))?);
    assert_eq!(first_metadata, fs::read(output.path().join(METADATA_FILE))?);
    assert_eq!(first_alerts, fs::read(output.path().join(ALERTS_FILE))?);

    Ok(())
}

#[tokio::test]
async fn shuffled_input_order_produces_identical_output() -> Result<()> {
    let forward = tempdir()?;
    let shuffled = tempdir()?;
    let output_a = tempdir()?;
    let output_b = tempdir()?;

    let extra = "生成式人工智能服务管理暂行办法,2024-01-20,https://miit.example/d,full text,工业和信息化部,";
    write_source(forward.path(), "miit_all_policies.csv", &[MIIT_ANNOUNCEMENT, MIIT_FULL_TEXT, extra]);
    write_source(forward.path(), "cac_all_policies.csv", &[CAC_REVIEW_MEASURES]);
    write_source(shuffled.path(), "miit_all_policies.csv", &[extra, MIIT_FULL_TEXT, MIIT_ANNOUNCEMENT]);
    write_source(shuffled.path(), "cac_all_policies.csv", &[CAC_REVIEW_MEASURES]);

    Pipeline::new(test_config(forward.path(), output_a.path())).run().await?;
    Pipeline::new(test_config(shuffled.path(), output_b.path())).run().await?;

    assert_eq!(
        fs::read(output_a.path().join(OUTPUT_TABLE_FILE))?,
        fs::read(output_b.path().join(OUTPUT_TABLE_FILE))?
    );

    Ok(())
}

#[tokio::test]
async fn score_exactly_at_threshold_is_excluded() -> Result<()> {
    let input = tempdir()?;
    let output = tempdir()?;
    // 算法 (2) + 智能 (2) = 4, exactly the threshold
    write_source(
        input.path(),
        "miit_all_policies.csv",
        &["智能网联汽车算法备案要求,2024-03-01,https://miit.example/e,announcement,工业和信息化部,"],
    );

    let summary = Pipeline::new(test_config(input.path(), output.path())).run().await?;
    assert_eq!(summary.ai_relevant_records, 0);

    // An empty run is a valid outcome with a well-formed table
    let table = fs::read_to_string(output.path().join(OUTPUT_TABLE_FILE))?;
    assert!(table.lines().skip(1).next().is_none());

    Ok(())
}

#[tokio::test]
async fn missing_sources_and_duplicates_are_tolerated() -> Result<()> {
    let input = tempdir()?;
    let output = tempdir()?;
    // cac and tc260 files are absent; miit contains an exact duplicate row
    write_source(
        input.path(),
        "miit_all_policies.csv",
        &[MIIT_FULL_TEXT, MIIT_FULL_TEXT],
    );

    let summary = Pipeline::new(test_config(input.path(), output.path())).run().await?;
    assert_eq!(summary.raw_records, 2);
    assert_eq!(summary.duplicate_records, 1);
    assert_eq!(summary.ai_relevant_records, 1);

    Ok(())
}

#[tokio::test]
async fn restrictive_policy_generates_alert() -> Result<()> {
    let input = tempdir()?;
    let output = tempdir()?;
    write_source(
        input.path(),
        "cac_all_policies.csv",
        &["人工智能算法安全管理规定,2024-04-01,https://cac.example/f,full text,国家网信办,\
           严禁利用算法危害国家安全，违者依法处罚并吊销许可。"],
    );

    let summary = Pipeline::new(test_config(input.path(), output.path())).run().await?;
    assert_eq!(summary.ai_relevant_records, 1);
    assert_eq!(summary.alerts, 1);

    let alerts: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(output.path().join(ALERTS_FILE))?)?;
    assert_eq!(alerts[0]["regulatory_score"], 10);
    assert!(alerts[0]["risk_factors"]
        .as_array()
        .unwrap()
        .iter()
        .any(|f| f == "包含处罚条款"));

    Ok(())
}
