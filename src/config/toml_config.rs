use crate::config::{
    validate_provider, DEFAULT_CLEAN_FILENAME, DEFAULT_PAGE_COUNT, DEFAULT_RAW_FILENAME,
};
use crate::core::ConfigProvider;
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;

static ENV_VAR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").unwrap());

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub pipeline: PipelineConfig,
    pub source: SourceConfig,
    #[serde(default)]
    pub extract: ExtractConfig,
    pub load: LoadConfig,
    pub monitoring: Option<MonitoringConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub name: String,
    pub description: Option<String>,
    pub version: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub endpoint: String,
    pub pages: Option<u32>,
    pub timeout_seconds: Option<u64>,
    pub retry_attempts: Option<u32>,
    pub retry_delay_ms: Option<u64>,
    pub headers: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractConfig {
    pub concurrent_requests: Option<usize>,
    pub resume: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadConfig {
    pub output_path: String,
    pub raw_filename: Option<String>,
    pub clean_filename: Option<String>,
    #[serde(default = "default_output_formats")]
    pub output_formats: Vec<String>,
}

fn default_output_formats() -> Vec<String> {
    vec!["json".to_string()]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: bool,
    pub log_level: Option<String>,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content =
            std::fs::read_to_string(&path).map_err(|e| EtlError::ConfigError {
                message: format!("Cannot read {}: {}", path.as_ref().display(), e),
            })?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| EtlError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${GRADCAFE_PAGES})，未設定的保留原樣
    fn substitute_env_vars(content: &str) -> String {
        ENV_VAR_RE
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .into_owned()
    }

    pub fn validate_config(&self) -> Result<()> {
        if self.source.endpoint.trim().is_empty() {
            return Err(EtlError::MissingConfigError {
                field: "source.endpoint".to_string(),
            });
        }
        validate_provider(self)?;
        validation::validate_output_formats("load.output_formats", &self.load.output_formats)?;
        if let Some(level) = self.log_level() {
            validation::validate_log_level("monitoring.log_level", level)?;
        }

        if !self.load.output_formats.iter().any(|f| f == "json") {
            // 下游載入只吃 JSON 快照
            return Err(EtlError::ConfigValidationError {
                field: "load.output_formats".to_string(),
                message: "\"json\" must be one of the output formats".to_string(),
            });
        }
        Ok(())
    }

    /// `[monitoring] log_level`，覆蓋 `--verbose` 的預設等級
    pub fn log_level(&self) -> Option<&str> {
        self.monitoring.as_ref().and_then(|m| m.log_level.as_deref())
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }
}

impl ConfigProvider for TomlConfig {
    fn source_url(&self) -> &str {
        &self.source.endpoint
    }

    fn page_count(&self) -> u32 {
        self.source.pages.unwrap_or(DEFAULT_PAGE_COUNT)
    }

    fn output_path(&self) -> &str {
        &self.load.output_path
    }

    fn raw_filename(&self) -> &str {
        self.load.raw_filename.as_deref().unwrap_or(DEFAULT_RAW_FILENAME)
    }

    fn clean_filename(&self) -> &str {
        self.load
            .clean_filename
            .as_deref()
            .unwrap_or(DEFAULT_CLEAN_FILENAME)
    }

    fn concurrent_requests(&self) -> usize {
        self.extract.concurrent_requests.unwrap_or(1)
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.source.timeout_seconds.unwrap_or(30))
    }

    fn retry_attempts(&self) -> u32 {
        self.source.retry_attempts.unwrap_or(0)
    }

    fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.source.retry_delay_ms.unwrap_or(1000))
    }

    fn resume(&self) -> bool {
        self.extract.resume.unwrap_or(false)
    }

    fn export_csv(&self) -> bool {
        self.load.output_formats.iter().any(|f| f == "csv")
    }

    fn headers(&self) -> Option<&HashMap<String, String>> {
        self.source.headers.as_ref()
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
