use crate::core::checkpoint::Checkpoint;
use crate::core::extractor::extract_applicant;
use crate::core::fetcher::PageFetcher;
use crate::core::grouper::{group_page, PageGrouping};
use crate::core::{ConfigProvider, Pipeline, Storage};
use crate::domain::model::{ApplicantRecord, RowGroup, ScrapeSummary, TransformResult};
use crate::utils::error::{EtlError, Result};
use std::collections::BTreeMap;
use tokio::task::JoinSet;

/// 執行中與等待提交的頁面合計不得超過並行上限
fn window_has_room(in_flight: usize, buffered: usize, concurrency: usize) -> bool {
    in_flight + buffered < concurrency
}

pub struct GradCafePipeline<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
    fetcher: PageFetcher,
}

impl<S: Storage, C: ConfigProvider> GradCafePipeline<S, C> {
    pub fn new(storage: S, config: C) -> Result<Self> {
        let fetcher = PageFetcher::from_config(&config)?;
        Ok(Self {
            storage,
            config,
            fetcher,
        })
    }

    pub fn config(&self) -> &C {
        &self.config
    }

    /// 依頁碼順序寫入檢查點並收進結果
    async fn commit_page(
        &self,
        checkpoint: &Checkpoint<'_, S>,
        page: u32,
        grouping: PageGrouping,
        completed: &mut BTreeMap<u32, Vec<RowGroup>>,
        summary: &mut ScrapeSummary,
    ) -> Result<()> {
        if !grouping.table_found {
            tracing::warn!("⚠️ Page {} has no results table", page);
        }
        tracing::debug!(
            "Page {}: {} groups ({} ads, {} placeholders, {} orphan rows dropped)",
            page,
            grouping.groups.len(),
            grouping.stats.ads_dropped,
            grouping.stats.placeholders_dropped,
            grouping.stats.orphans_dropped
        );

        summary.pages_fetched += 1;
        summary.ads_dropped += grouping.stats.ads_dropped;
        summary.placeholders_dropped += grouping.stats.placeholders_dropped;
        summary.orphans_dropped += grouping.stats.orphans_dropped;

        checkpoint.record(page, &grouping.groups).await?;
        completed.insert(page, grouping.groups);
        Ok(())
    }

    fn export_csv(records: &[ApplicantRecord]) -> Result<String> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(Vec::new());

        writer.write_record(ApplicantRecord::FIELD_NAMES)?;
        for record in records {
            writer.serialize(record)?;
        }

        let bytes = writer.into_inner().map_err(|e| EtlError::ProcessingError {
            message: format!("Failed to flush CSV output: {}", e),
        })?;
        String::from_utf8(bytes).map_err(|e| EtlError::ProcessingError {
            message: format!("CSV output is not valid UTF-8: {}", e),
        })
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for GradCafePipeline<S, C> {
    async fn extract(&self) -> Result<(Vec<RowGroup>, ScrapeSummary)> {
        let page_count = self.config.page_count();
        let checkpoint = Checkpoint::new(&self.storage, self.config.checkpoint_filename());

        let mut completed = if self.config.resume() {
            checkpoint.restore().await?
        } else {
            checkpoint.clear().await?;
            BTreeMap::new()
        };
        completed.retain(|page, _| *page <= page_count);

        let mut summary = ScrapeSummary {
            pages_requested: page_count,
            pages_resumed: completed.len() as u32,
            ..Default::default()
        };
        if summary.pages_resumed > 0 {
            tracing::info!(
                "♻️ Resuming from checkpoint: {} pages already scraped",
                summary.pages_resumed
            );
        }

        let pending: Vec<u32> = (1..=page_count)
            .filter(|page| !completed.contains_key(page))
            .collect();

        tracing::info!(
            "🚀 Scraping {} pages from {} ({} concurrent)",
            pending.len(),
            self.fetcher.source_url(),
            self.config.concurrent_requests()
        );

        // 第一頁失敗代表整個來源無法連線，直接中止
        let mut next_commit = 0;
        if pending.first() == Some(&1) {
            let html = self
                .fetcher
                .fetch(1)
                .await
                .map_err(|e| EtlError::SourceUnreachable {
                    url: self.fetcher.source_url().to_string(),
                    reason: e.to_string(),
                })?;
            self.commit_page(&checkpoint, 1, group_page(&html), &mut completed, &mut summary)
                .await?;
            next_commit = 1;
        }

        let concurrency = self.config.concurrent_requests().max(1);
        let mut queue = pending[next_commit..].iter().copied();
        let mut in_flight = JoinSet::new();
        let mut ready: BTreeMap<u32, Result<PageGrouping>> = BTreeMap::new();

        loop {
            // 已完成但還不能提交的頁面也佔用視窗
            while window_has_room(in_flight.len(), ready.len(), concurrency) {
                let Some(page) = queue.next() else { break };
                let fetcher = self.fetcher.clone();
                in_flight.spawn(async move {
                    let outcome = fetcher.fetch(page).await.map(|html| group_page(&html));
                    (page, outcome)
                });
            }

            let Some(joined) = in_flight.join_next().await else {
                break;
            };
            let (page, outcome) = joined.map_err(|e| EtlError::ProcessingError {
                message: format!("Page task failed: {}", e),
            })?;
            ready.insert(page, outcome);

            // 完成順序不一定照頁碼，只提交連續的前段
            while let Some(&page) = pending.get(next_commit) {
                let Some(outcome) = ready.remove(&page) else { break };
                next_commit += 1;
                match outcome {
                    Ok(grouping) => {
                        self.commit_page(&checkpoint, page, grouping, &mut completed, &mut summary)
                            .await?
                    }
                    Err(e) => {
                        tracing::warn!("⚠️ Skipping page {}: {}", page, e);
                        summary.failed_pages.push(page);
                    }
                }
            }
        }

        let groups: Vec<RowGroup> = completed.into_values().flatten().collect();
        summary.groups = groups.len();

        if !summary.failed_pages.is_empty() {
            tracing::warn!(
                "⚠️ {} pages failed and were skipped: {:?}",
                summary.failed_pages.len(),
                summary.failed_pages
            );
        }
        tracing::info!(
            "📊 Scraped {} applicants from {} pages",
            summary.groups,
            summary.pages_fetched + summary.pages_resumed
        );

        Ok((groups, summary))
    }

    async fn stage(&self, groups: &[RowGroup]) -> Result<String> {
        let raw_file = self.config.raw_filename();
        let data = serde_json::to_vec_pretty(groups)?;

        tracing::debug!("Writing raw snapshot ({} bytes)", data.len());
        self.storage.write_file(raw_file, &data).await?;

        // 快照落地後檢查點就沒有用了
        Checkpoint::new(&self.storage, self.config.checkpoint_filename())
            .clear()
            .await?;

        Ok(self.storage.display_path(raw_file))
    }

    async fn load_staged(&self) -> Result<Vec<RowGroup>> {
        let raw_file = self.config.raw_filename();
        let path = self.storage.display_path(raw_file);

        if !self.storage.exists(raw_file).await {
            return Err(EtlError::SnapshotError {
                path,
                message: "raw snapshot not found".to_string(),
            });
        }

        let data = self.storage.read_file(raw_file).await?;
        let groups: Vec<RowGroup> =
            serde_json::from_slice(&data).map_err(|e| EtlError::SnapshotError {
                path,
                message: e.to_string(),
            })?;

        tracing::info!("📥 Loaded {} row groups from raw snapshot", groups.len());
        Ok(groups)
    }

    async fn transform(&self, groups: Vec<RowGroup>) -> Result<TransformResult> {
        let records: Vec<ApplicantRecord> = groups.iter().map(extract_applicant).collect();

        let sparse = records
            .iter()
            .filter(|record| record.populated_fields() == 0)
            .count();
        if sparse > 0 {
            tracing::debug!("{} applicants produced no fields at all", sparse);
        }

        let csv_output = if self.config.export_csv() {
            Some(Self::export_csv(&records)?)
        } else {
            None
        };

        tracing::info!("🧹 Cleaned {} applicant records", records.len());
        Ok(TransformResult {
            records,
            csv_output,
        })
    }

    async fn load(&self, result: TransformResult) -> Result<String> {
        let clean_file = self.config.clean_filename();
        let data = serde_json::to_vec_pretty(&result.records)?;
        self.storage.write_file(clean_file, &data).await?;

        if let Some(csv_output) = &result.csv_output {
            let csv_file = self.config.csv_filename();
            self.storage
                .write_file(&csv_file, csv_output.as_bytes())
                .await?;
            tracing::info!("📁 CSV export saved to: {}", self.storage.display_path(&csv_file));
        }

        Ok(self.storage.display_path(clean_file))
    }
}
