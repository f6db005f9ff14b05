use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("HTTP request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Failed to fetch page {page}: {reason}")]
    FetchError { page: u32, reason: String },

    #[error("Listing source unreachable at {url}: {reason}")]
    SourceUnreachable { url: String, reason: String },

    #[error("Invalid snapshot {path}: {message}")]
    SnapshotError { path: String, message: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Configuration,
    Data,
    Storage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl EtlError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            EtlError::ApiError(_) | EtlError::FetchError { .. } | EtlError::SourceUnreachable { .. } => {
                ErrorCategory::Network
            }
            EtlError::ConfigError { .. }
            | EtlError::ConfigValidationError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::MissingConfigError { .. } => ErrorCategory::Configuration,
            EtlError::CsvError(_)
            | EtlError::SerializationError(_)
            | EtlError::SnapshotError { .. }
            | EtlError::ProcessingError { .. } => ErrorCategory::Data,
            EtlError::IoError(_) => ErrorCategory::Storage,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // 單頁失敗只影響該頁
            EtlError::FetchError { .. } => ErrorSeverity::Low,
            EtlError::ApiError(_) => ErrorSeverity::Medium,
            EtlError::SourceUnreachable { .. } | EtlError::IoError(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::High,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Network => match self {
                EtlError::SourceUnreachable { .. } => {
                    "檢查網路連線與 --source-url 是否正確，稍後再試"
                }
                _ => "可加上 --retry-attempts 重試，或用 --resume 從檢查點繼續",
            },
            ErrorCategory::Configuration => "檢查命令列參數或 TOML 設定檔內容",
            ErrorCategory::Data => match self {
                EtlError::SnapshotError { .. } => "先執行 --phase scrape 重新產生原始快照",
                _ => "檢查輸入資料格式是否正確",
            },
            ErrorCategory::Storage => "確認輸出目錄存在且具有寫入權限",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            EtlError::SourceUnreachable { url, .. } => format!("無法連線到資料來源: {}", url),
            EtlError::FetchError { page, .. } => format!("第 {} 頁抓取失敗", page),
            EtlError::SnapshotError { path, .. } => format!("原始快照無法讀取: {}", path),
            EtlError::IoError(e) => format!("檔案存取失敗: {}", e),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;
