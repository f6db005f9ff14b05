use clap::Parser;
use gradcafe_etl::core::ConfigProvider;
use gradcafe_etl::utils::error::{EtlError, ErrorSeverity};
use gradcafe_etl::utils::{logger, validation::Validate};
use gradcafe_etl::{CliConfig, EtlEngine, GradCafePipeline, LocalStorage, Phase, TomlConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = CliConfig::parse();

    // 設定檔可能指定日誌等級，必須先於日誌初始化載入
    let toml_config = cli.config.as_deref().map(TomlConfig::from_file);
    let log_level = match &toml_config {
        Some(Ok(config)) => config.log_level(),
        _ => None,
    };

    // 初始化日誌
    if cli.json_logs {
        logger::init_json_logger(cli.verbose, log_level);
    } else {
        logger::init_cli_logger(cli.verbose, log_level);
    }

    tracing::info!("Starting gradcafe-etl CLI");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    let phase = cli.phase;
    let result = match toml_config {
        Some(Ok(toml_config)) => {
            tracing::info!("📄 Loaded configuration '{}'", toml_config.pipeline.name);
            let monitor = cli.monitor || toml_config.monitoring_enabled();
            run_with(toml_config, phase, monitor).await
        }
        Some(Err(e)) => Err(e),
        None => {
            let monitor = cli.monitor;
            run_with(cli, phase, monitor).await
        }
    };

    match result {
        Ok(output_path) => {
            tracing::info!("✅ GradCafe ETL completed successfully!");
            tracing::info!("📁 Output saved to: {}", output_path);
            println!("✅ GradCafe ETL completed successfully!");
            println!("📁 Output saved to: {}", output_path);
        }
        Err(e) => {
            tracing::error!(
                "❌ GradCafe ETL failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 建議: {}", e.recovery_suggestion());

            let exit_code = exit_code_for(&e);
            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }

    Ok(())
}

/// 驗證設定後組裝 pipeline 並執行指定階段
async fn run_with<C>(config: C, phase: Phase, monitor_enabled: bool) -> Result<String, EtlError>
where
    C: ConfigProvider + Validate + Send + Sync + 'static,
{
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        return Err(e);
    }

    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    tracing::info!(
        "🎯 Source: {} ({} pages, {} concurrent)",
        config.source_url(),
        config.page_count(),
        config.concurrent_requests()
    );

    let storage = LocalStorage::new(config.output_path().to_string());
    let pipeline = GradCafePipeline::new(storage, config)?;
    let engine = EtlEngine::new_with_monitoring(pipeline, monitor_enabled);

    engine.run_phase(phase).await
}

/// 根據錯誤嚴重程度決定退出碼
fn exit_code_for(error: &EtlError) -> i32 {
    match error.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    }
}
