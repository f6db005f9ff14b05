use anyhow::Result;
use clap::Parser;
use gradcafe_etl::core::checkpoint::Checkpoint;
use gradcafe_etl::{
    group_page, ApplicantRecord, CliConfig, EtlEngine, EtlError, GradCafePipeline, LocalStorage,
    Phase,
};
use httpmock::prelude::*;
use serde_json::Value;
use std::path::Path;
use tempfile::TempDir;

const LISTING_PAGE: &str = include_str!("fixtures/listing_page.html");

fn cli_config(source_url: &str, output_path: &str, extra: &[&str]) -> CliConfig {
    let mut args = vec![
        "gradcafe-etl",
        "--source-url",
        source_url,
        "--output-path",
        output_path,
        "--timeout-seconds",
        "5",
    ];
    args.extend_from_slice(extra);
    CliConfig::parse_from(args)
}

fn engine_for(config: CliConfig) -> Result<EtlEngine<GradCafePipeline<LocalStorage, CliConfig>>> {
    let storage = LocalStorage::new(config.output_path.clone());
    let pipeline = GradCafePipeline::new(storage, config)?;
    Ok(EtlEngine::new(pipeline))
}

fn read_json(path: &Path) -> Result<Value> {
    let data = std::fs::read(path)?;
    Ok(serde_json::from_slice(&data)?)
}

#[tokio::test]
async fn test_end_to_end_scrape_and_clean() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let output_path = temp_dir.path().to_str().unwrap().to_string();

    let server = MockServer::start();
    let page_mock = server.mock(|when, then| {
        when.method(GET).path("/survey/").query_param("page", "1");
        then.status(200)
            .header("Content-Type", "text/html; charset=utf-8")
            .body(LISTING_PAGE);
    });

    let source_url = server.url("/survey/");
    let engine = engine_for(cli_config(&source_url, &output_path, &["--pages", "1"]))?;
    let outcome = engine.run().await?;

    page_mock.assert();
    assert_eq!(outcome.records, 2);
    assert!(outcome.clean_snapshot.ends_with("applicant_data.json"));

    // 原始快照：兩組，分別是三列與一列，廣告與佔位列都不在裡面
    let raw = read_json(&temp_dir.path().join("raw_data.json"))?;
    let groups = raw.as_array().unwrap();
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].as_array().unwrap().len(), 3);
    assert_eq!(groups[1].as_array().unwrap().len(), 1);
    let raw_text = raw.to_string();
    assert!(!raw_text.contains("results-ad-placement"));
    assert!(!temp_dir.path().join("raw_data.json.partial.jsonl").exists());

    let clean = read_json(&temp_dir.path().join("applicant_data.json"))?;
    let records = clean.as_array().unwrap();
    assert_eq!(records.len(), 2);
    for record in records {
        let object = record.as_object().unwrap();
        assert_eq!(object.len(), 14);
        for name in ApplicantRecord::FIELD_NAMES {
            assert!(object.contains_key(name), "missing key {}", name);
        }
    }

    let first = &records[0];
    assert_eq!(first["university"], "Johns Hopkins University");
    assert_eq!(first["program"], "Computer Science");
    assert_eq!(first["degree"], "Masters");
    assert_eq!(first["date_added"], "January 31, 2025");
    assert_eq!(first["status"], "Accepted");
    assert_eq!(first["date_decision"], "30 Jan");
    assert_eq!(first["url"], "https://www.thegradcafe.com/result/964118");
    assert_eq!(first["term"], "Fall 2025");
    assert_eq!(first["nationality"], "International");
    assert_eq!(first["gre"], "322");
    assert_eq!(first["gre_v"], "158");
    assert_eq!(first["gre_aw"], "4.00");
    assert_eq!(first["gpa"], "3.70");
    assert_eq!(first["comments"], "Funded offer, very happy!");

    let second = &records[1];
    assert_eq!(second["university"], "University of Toronto");
    assert_eq!(second["status"], "Pending");
    assert!(second["date_decision"].is_null());
    assert!(second["term"].is_null());
    assert!(second["gre"].is_null());
    assert!(second["comments"].is_null());
    assert_eq!(second["url"], "https://www.thegradcafe.com/result/964117");

    Ok(())
}

#[tokio::test]
async fn test_clean_phase_reads_snapshot_without_network() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let output_path = temp_dir.path().to_str().unwrap().to_string();

    let server = MockServer::start();
    let mut page_mock = server.mock(|when, then| {
        when.method(GET).path("/survey/");
        then.status(200).body(LISTING_PAGE);
    });

    let source_url = server.url("/survey/");
    let engine = engine_for(cli_config(&source_url, &output_path, &["--pages", "1"]))?;
    let raw_path = engine.run_phase(Phase::Scrape).await?;

    assert!(raw_path.ends_with("raw_data.json"));
    assert!(!temp_dir.path().join("applicant_data.json").exists());
    page_mock.assert_hits(1);
    page_mock.delete();

    // 來源已下線，Clean 仍只依賴快照
    let engine = engine_for(cli_config(&source_url, &output_path, &["--pages", "1"]))?;
    engine.run_phase(Phase::Clean).await?;
    let first_run = std::fs::read(temp_dir.path().join("applicant_data.json"))?;

    engine.run_phase(Phase::Clean).await?;
    let second_run = std::fs::read(temp_dir.path().join("applicant_data.json"))?;

    assert_eq!(first_run, second_run);
    Ok(())
}

#[tokio::test]
async fn test_clean_phase_without_snapshot_fails() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let output_path = temp_dir.path().to_str().unwrap().to_string();

    let config = cli_config("http://127.0.0.1:9/survey/", &output_path, &["--pages", "1"]);
    let engine = engine_for(config)?;
    let err = engine.run_phase(Phase::Clean).await.unwrap_err();

    assert!(matches!(err, EtlError::SnapshotError { .. }));
    Ok(())
}

#[tokio::test]
async fn test_csv_export_alongside_json() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let output_path = temp_dir.path().to_str().unwrap().to_string();

    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/survey/");
        then.status(200).body(LISTING_PAGE);
    });

    let source_url = server.url("/survey/");
    let engine = engine_for(cli_config(&source_url, &output_path, &["--pages", "1", "--csv"]))?;
    engine.run().await?;

    let mut reader = csv::Reader::from_path(temp_dir.path().join("applicant_data.csv"))?;
    let headers: Vec<String> = reader.headers()?.iter().map(String::from).collect();
    assert_eq!(headers, ApplicantRecord::FIELD_NAMES);

    let rows = reader
        .records()
        .collect::<std::result::Result<Vec<csv::StringRecord>, _>>()?;
    assert_eq!(rows.len(), 2);
    assert_eq!(&rows[0][1], "Johns Hopkins University");
    // 缺值在 CSV 中是空欄位
    assert_eq!(&rows[1][9], "");
    Ok(())
}

#[tokio::test]
async fn test_resume_continues_from_checkpoint() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let output_path = temp_dir.path().to_str().unwrap().to_string();
    let storage = LocalStorage::new(output_path.clone());

    // 模擬上次執行只完成第一頁就中斷
    let checkpoint = Checkpoint::new(&storage, "raw_data.json.partial.jsonl");
    checkpoint.record(1, &group_page(LISTING_PAGE).groups).await?;

    let server = MockServer::start();
    let first_page = server.mock(|when, then| {
        when.method(GET).path("/survey/").query_param("page", "1");
        then.status(200).body(LISTING_PAGE);
    });
    let second_page = server.mock(|when, then| {
        when.method(GET).path("/survey/").query_param("page", "2");
        then.status(200).body(LISTING_PAGE);
    });

    let config = cli_config(
        &server.url("/survey/"),
        &output_path,
        &["--pages", "2", "--resume"],
    );
    let engine = engine_for(config)?;
    let outcome = engine.scrape().await?;

    first_page.assert_hits(0);
    second_page.assert_hits(1);
    assert_eq!(outcome.summary.pages_resumed, 1);
    assert_eq!(outcome.summary.pages_fetched, 1);
    assert_eq!(outcome.summary.groups, 4);
    assert!(!temp_dir.path().join("raw_data.json.partial.jsonl").exists());

    let raw = read_json(&temp_dir.path().join("raw_data.json"))?;
    assert_eq!(raw.as_array().unwrap().len(), 4);
    Ok(())
}

#[tokio::test]
async fn test_unreachable_source_writes_nothing() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let output_path = temp_dir.path().to_str().unwrap().to_string();

    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/survey/");
        then.status(503);
    });

    let source_url = server.url("/survey/");
    let engine = engine_for(cli_config(&source_url, &output_path, &["--pages", "1"]))?;
    let err = engine.run().await.unwrap_err();

    assert!(matches!(err, EtlError::SourceUnreachable { .. }));
    assert!(!temp_dir.path().join("raw_data.json").exists());
    assert!(!temp_dir.path().join("applicant_data.json").exists());
    Ok(())
}
