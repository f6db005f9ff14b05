pub mod cli;
pub mod toml_config;

use crate::core::ConfigProvider;
use crate::utils::error::Result;
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_SOURCE_URL: &str = "https://www.thegradcafe.com/survey/";
pub const DEFAULT_PAGE_COUNT: u32 = 750;
pub const DEFAULT_RAW_FILENAME: &str = "raw_data.json";
pub const DEFAULT_CLEAN_FILENAME: &str = "applicant_data.json";
pub const MAX_CONCURRENT_REQUESTS: usize = 32;

/// 要執行的階段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Scrape,
    Clean,
    #[default]
    All,
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Serialize, Deserialize, clap::Parser)]
#[command(name = "gradcafe-etl")]
#[command(about = "Scrape GradCafe admission results into structured applicant records")]
pub struct CliConfig {
    #[arg(long, default_value = DEFAULT_SOURCE_URL)]
    pub source_url: String,

    #[arg(long, default_value_t = DEFAULT_PAGE_COUNT)]
    pub pages: u32,

    #[arg(long, default_value = "./data")]
    pub output_path: String,

    #[arg(long, default_value = DEFAULT_RAW_FILENAME)]
    pub raw_file: String,

    #[arg(long, default_value = DEFAULT_CLEAN_FILENAME)]
    pub clean_file: String,

    #[arg(long, default_value = "1")]
    pub concurrent_requests: usize,

    #[arg(long, default_value = "30")]
    pub timeout_seconds: u64,

    #[arg(long, default_value = "0", help = "Extra attempts per page after a failed fetch")]
    pub retry_attempts: u32,

    #[arg(long, default_value = "1000")]
    pub retry_delay_ms: u64,

    #[arg(long, help = "Continue from an existing scrape checkpoint")]
    pub resume: bool,

    #[arg(long, help = "Also export cleaned records as CSV")]
    pub csv: bool,

    #[arg(long, value_enum, default_value_t = Phase::All)]
    pub phase: Phase,

    #[arg(long, help = "Load settings from a TOML file instead of flags")]
    pub config: Option<String>,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Log timing and memory after each phase")]
    pub monitor: bool,

    #[arg(long, help = "Emit JSON formatted logs")]
    pub json_logs: bool,
}

#[cfg(feature = "cli")]
impl ConfigProvider for CliConfig {
    fn source_url(&self) -> &str {
        &self.source_url
    }

    fn page_count(&self) -> u32 {
        self.pages
    }

    fn output_path(&self) -> &str {
        &self.output_path
    }

    fn raw_filename(&self) -> &str {
        &self.raw_file
    }

    fn clean_filename(&self) -> &str {
        &self.clean_file
    }

    fn concurrent_requests(&self) -> usize {
        self.concurrent_requests
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    fn retry_attempts(&self) -> u32 {
        self.retry_attempts
    }

    fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    fn resume(&self) -> bool {
        self.resume
    }

    fn export_csv(&self) -> bool {
        self.csv
    }
}

#[cfg(feature = "cli")]
impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validate_provider(self)
    }
}

/// 兩種設定來源共用的檢查
pub fn validate_provider<C: ConfigProvider + ?Sized>(config: &C) -> Result<()> {
    validation::validate_url("source_url", config.source_url())?;
    validation::validate_range("pages", config.page_count(), 1, u32::MAX)?;
    validation::validate_path("output_path", config.output_path())?;
    validation::validate_filename("raw_file", config.raw_filename())?;
    validation::validate_filename("clean_file", config.clean_filename())?;
    let checkpoint_file = config.checkpoint_filename();
    let csv_file = config.csv_filename();
    let mut outputs = vec![
        ("raw_file", config.raw_filename()),
        ("clean_file", config.clean_filename()),
        ("checkpoint", checkpoint_file.as_str()),
    ];
    if config.export_csv() {
        outputs.push(("csv export", csv_file.as_str()));
    }
    validation::validate_distinct_files(&outputs)?;
    validation::validate_range(
        "concurrent_requests",
        config.concurrent_requests(),
        1,
        MAX_CONCURRENT_REQUESTS,
    )?;
    if config.request_timeout().is_zero() {
        return Err(crate::utils::error::EtlError::InvalidConfigValueError {
            field: "timeout_seconds".to_string(),
            value: "0".to_string(),
            reason: "Timeout must be greater than zero".to_string(),
        });
    }
    Ok(())
}
