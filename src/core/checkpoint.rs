use crate::core::Storage;
use crate::domain::model::RowGroup;
use crate::utils::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Serialize, Deserialize)]
struct PageEntry {
    page: u32,
    groups: Vec<RowGroup>,
}

/// 逐頁追加的 JSON Lines 檢查點
///
/// 每一行是一頁完整的分組結果，只追加不改寫；中途中止時已寫入的頁面不受影響。
pub struct Checkpoint<'a, S: Storage> {
    storage: &'a S,
    path: String,
}

impl<'a, S: Storage> Checkpoint<'a, S> {
    pub fn new(storage: &'a S, path: impl Into<String>) -> Self {
        Self {
            storage,
            path: path.into(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// 讀回已完成的頁面；最後一行若寫到一半就忽略，並把檔案截回最後一個完整行
    pub async fn restore(&self) -> Result<BTreeMap<u32, Vec<RowGroup>>> {
        let mut pages = BTreeMap::new();
        if !self.storage.exists(&self.path).await {
            return Ok(pages);
        }

        let data = self.storage.read_file(&self.path).await?;
        let content = String::from_utf8_lossy(&data);
        let mut valid_len = 0;

        for (line_no, line) in content.split_inclusive('\n').enumerate() {
            if line.trim().is_empty() {
                valid_len += line.len();
                continue;
            }
            match serde_json::from_str::<PageEntry>(line.trim_end()) {
                Ok(entry) if line.ends_with('\n') => {
                    pages.insert(entry.page, entry.groups);
                    valid_len += line.len();
                }
                Ok(_) => {
                    tracing::warn!(
                        "⚠️ Ignoring unterminated checkpoint line {} in {}",
                        line_no + 1,
                        self.path
                    );
                    break;
                }
                Err(e) => {
                    tracing::warn!(
                        "⚠️ Ignoring unreadable checkpoint line {} in {}: {}",
                        line_no + 1,
                        self.path,
                        e
                    );
                    break;
                }
            }
        }

        // 後續 record 只會追加，殘缺的尾巴必須先清掉
        if valid_len < content.len() {
            self.storage
                .write_file(&self.path, &content.as_bytes()[..valid_len])
                .await?;
        }

        tracing::debug!("Restored {} pages from {}", pages.len(), self.path);
        Ok(pages)
    }

    pub async fn record(&self, page: u32, groups: &[RowGroup]) -> Result<()> {
        let entry = PageEntry {
            page,
            groups: groups.to_vec(),
        };
        let mut line = serde_json::to_vec(&entry)?;
        line.push(b'\n');
        self.storage.append_file(&self.path, &line).await
    }

    pub async fn clear(&self) -> Result<()> {
        self.storage.remove_file(&self.path).await
    }
}
