use crate::domain::model::{RowGroup, ScrapeSummary, TransformResult};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    fn append_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    fn remove_file(&self, path: &str) -> impl std::future::Future<Output = Result<()>> + Send;
    fn exists(&self, path: &str) -> impl std::future::Future<Output = bool> + Send;
    /// 給使用者看的完整路徑
    fn display_path(&self, path: &str) -> String;
}

pub trait ConfigProvider: Send + Sync {
    fn source_url(&self) -> &str;
    fn page_count(&self) -> u32;
    fn output_path(&self) -> &str;
    fn raw_filename(&self) -> &str;
    fn clean_filename(&self) -> &str;
    fn concurrent_requests(&self) -> usize;
    fn request_timeout(&self) -> Duration;
    fn retry_attempts(&self) -> u32;
    fn retry_delay(&self) -> Duration;
    fn resume(&self) -> bool;
    fn export_csv(&self) -> bool;

    fn headers(&self) -> Option<&HashMap<String, String>> {
        None
    }

    fn checkpoint_filename(&self) -> String {
        format!("{}.partial.jsonl", self.raw_filename())
    }

    fn csv_filename(&self) -> String {
        match self.clean_filename().strip_suffix(".json") {
            Some(stem) => format!("{}.csv", stem),
            None => format!("{}.csv", self.clean_filename()),
        }
    }
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    /// 抓取並分組所有頁面，逐頁寫入檢查點
    async fn extract(&self) -> Result<(Vec<RowGroup>, ScrapeSummary)>;
    /// 寫出原始快照並清除檢查點
    async fn stage(&self, groups: &[RowGroup]) -> Result<String>;
    /// 讀回原始快照
    async fn load_staged(&self) -> Result<Vec<RowGroup>>;
    async fn transform(&self, groups: Vec<RowGroup>) -> Result<TransformResult>;
    async fn load(&self, result: TransformResult) -> Result<String>;
}
