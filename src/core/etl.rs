use crate::config::Phase;
use crate::core::{Pipeline, ScrapeSummary};
use crate::utils::error::Result;
use crate::utils::monitor::RunMonitor;

/// Scrape 階段的產出
#[derive(Debug, Clone)]
pub struct ScrapeOutcome {
    pub raw_snapshot: String,
    pub summary: ScrapeSummary,
}

/// Clean 階段的產出
#[derive(Debug, Clone)]
pub struct CleanOutcome {
    pub clean_snapshot: String,
    pub records: usize,
}

/// 兩階段驅動器：先 Scrape 並寫出原始快照，再由快照 Clean
pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
    monitor: RunMonitor,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: RunMonitor::new(monitor_enabled),
        }
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    pub async fn scrape(&self) -> Result<ScrapeOutcome> {
        tracing::info!("🕸️ Scrape phase starting");
        self.monitor.start_phase("Scrape");

        let (groups, summary) = self.pipeline.extract().await?;
        let raw_snapshot = self.pipeline.stage(&groups).await?;

        tracing::info!("📁 Raw snapshot saved to: {}", raw_snapshot);
        self.monitor.finish_phase("Scrape");

        Ok(ScrapeOutcome {
            raw_snapshot,
            summary,
        })
    }

    /// 永遠從已落地的原始快照開始，不沿用記憶體中的資料
    pub async fn clean(&self) -> Result<CleanOutcome> {
        tracing::info!("🧹 Clean phase starting");
        self.monitor.start_phase("Clean");

        let groups = self.pipeline.load_staged().await?;
        let result = self.pipeline.transform(groups).await?;
        let records = result.records.len();
        let clean_snapshot = self.pipeline.load(result).await?;

        tracing::info!("📁 Cleaned snapshot saved to: {}", clean_snapshot);
        self.monitor.finish_phase("Clean");

        Ok(CleanOutcome {
            clean_snapshot,
            records,
        })
    }

    pub async fn run(&self) -> Result<CleanOutcome> {
        let scraped = self.scrape().await?;
        tracing::info!(
            "Scrape complete: {} applicants, {} failed pages",
            scraped.summary.groups,
            scraped.summary.failed_pages.len()
        );

        let cleaned = self.clean().await?;
        self.monitor.log_final_stats();
        Ok(cleaned)
    }

    /// 執行指定階段並回傳該階段輸出的路徑
    pub async fn run_phase(&self, phase: Phase) -> Result<String> {
        match phase {
            Phase::Scrape => self.scrape().await.map(|outcome| outcome.raw_snapshot),
            Phase::Clean => self.clean().await.map(|outcome| outcome.clean_snapshot),
            Phase::All => self.run().await.map(|outcome| outcome.clean_snapshot),
        }
    }
}
