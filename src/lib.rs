pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use crate::config::CliConfig;

pub use crate::config::{cli::LocalStorage, toml_config::TomlConfig, Phase};
pub use crate::core::{
    etl::{CleanOutcome, EtlEngine, ScrapeOutcome},
    extractor::extract_applicant,
    grouper::group_page,
    pipeline::GradCafePipeline,
};
pub use crate::domain::model::{ApplicantRecord, RowGroup, ScrapeSummary};
pub use crate::utils::error::{EtlError, Result};
