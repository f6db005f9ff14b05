use crate::core::ConfigProvider;
use crate::utils::error::{EtlError, Result};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use reqwest::Client;
use std::time::Duration;

const DEFAULT_USER_AGENT: &str = concat!("gradcafe-etl/", env!("CARGO_PKG_VERSION"));

/// 取回單一列表頁的原始 HTML，不做任何解析
#[derive(Debug, Clone)]
pub struct PageFetcher {
    client: Client,
    source_url: String,
    retry_attempts: u32,
    retry_delay: Duration,
}

impl PageFetcher {
    pub fn new(source_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        Self::with_headers(source_url, timeout, HeaderMap::new())
    }

    fn with_headers(
        source_url: impl Into<String>,
        timeout: Duration,
        mut headers: HeaderMap,
    ) -> Result<Self> {
        headers
            .entry(USER_AGENT)
            .or_insert(HeaderValue::from_static(DEFAULT_USER_AGENT));

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            source_url: source_url.into(),
            retry_attempts: 0,
            retry_delay: Duration::from_millis(1000),
        })
    }

    pub fn from_config<C: ConfigProvider + ?Sized>(config: &C) -> Result<Self> {
        let mut headers = HeaderMap::new();
        if let Some(configured) = config.headers() {
            for (key, value) in configured {
                let name = HeaderName::from_bytes(key.as_bytes()).map_err(|e| {
                    EtlError::InvalidConfigValueError {
                        field: "source.headers".to_string(),
                        value: key.clone(),
                        reason: e.to_string(),
                    }
                })?;
                let value =
                    HeaderValue::from_str(value).map_err(|e| EtlError::InvalidConfigValueError {
                        field: "source.headers".to_string(),
                        value: value.clone(),
                        reason: e.to_string(),
                    })?;
                headers.insert(name, value);
            }
        }

        Ok(Self::with_headers(config.source_url(), config.request_timeout(), headers)?
            .with_retry(config.retry_attempts(), config.retry_delay()))
    }

    pub fn with_retry(mut self, attempts: u32, delay: Duration) -> Self {
        self.retry_attempts = attempts;
        self.retry_delay = delay;
        self
    }

    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    /// 抓取第 `page` 頁 (從 1 開始)；非 2xx 一律視為失敗
    pub async fn fetch(&self, page: u32) -> Result<String> {
        let mut attempt = 0;
        loop {
            match self.fetch_once(page).await {
                Ok(body) => return Ok(body),
                Err(e) if attempt < self.retry_attempts => {
                    let delay = self.retry_delay.saturating_mul(2u32.saturating_pow(attempt));
                    tracing::debug!(
                        "🔁 Page {} attempt {} failed ({}), retrying in {:?}",
                        page,
                        attempt + 1,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn fetch_once(&self, page: u32) -> Result<String> {
        tracing::debug!("Requesting page {} from {}", page, self.source_url);

        let response = self
            .client
            .get(&self.source_url)
            .query(&[("page", page)])
            .send()
            .await
            .map_err(|e| EtlError::FetchError {
                page,
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(EtlError::FetchError {
                page,
                reason: format!("HTTP {}", status),
            });
        }

        response.text().await.map_err(|e| EtlError::FetchError {
            page,
            reason: e.to_string(),
        })
    }
}
