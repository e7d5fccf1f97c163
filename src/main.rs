use std::sync::Arc;

use clap::Parser;
use tokio::sync::mpsc;

use lineitem_sync::domain::model::RowEvent;
use lineitem_sync::domain::ports::SnapshotStore;
use lineitem_sync::utils::{logger, validation::Validate};
use lineitem_sync::{
    plan_reconcile, CliConfig, FieldConvention, HttpPriceSource, InMemoryForm, LocalSnapshots,
    SyncEngine, SyncProfile,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = CliConfig::parse();

    // 初始化日誌
    logger::init_cli_logger(config.verbose);

    let run_id = format!("sync_{}", chrono::Utc::now().format("%Y%m%dT%H%M%S"));
    tracing::info!("Starting lineitem-sync run {}", run_id);
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    match run(&config).await {
        Ok(()) => {
            tracing::info!("✅ Reconcile completed successfully!");
            tracing::info!("📁 Snapshot saved to: {}", config.output);
            println!("✅ Reconcile completed successfully!");
            println!("📁 Snapshot saved to: {}", config.output);
        }
        Err(e) => {
            tracing::error!(
                "❌ Reconcile failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());

            let exit_code = match e.severity() {
                lineitem_sync::utils::error::ErrorSeverity::Low => 0,
                lineitem_sync::utils::error::ErrorSeverity::Medium => 2,
                lineitem_sync::utils::error::ErrorSeverity::High => 1,
                lineitem_sync::utils::error::ErrorSeverity::Critical => 3,
            };

            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }

    Ok(())
}

async fn run(config: &CliConfig) -> lineitem_sync::Result<()> {
    // Profile：TOML 檔案或內建 admin inline 預設
    let mut profile = match &config.profile {
        Some(path) => SyncProfile::from_file(path)?,
        None => SyncProfile::admin_inline(
            config.api_base.as_deref().unwrap_or("http://localhost:8000"),
        ),
    };
    if let Some(api_base) = &config.api_base {
        profile.api.base_url = api_base.clone();
    }
    profile.validate()?;

    tracing::info!(
        "Using profile '{}' against {}",
        profile.profile.name,
        profile.api.base_url
    );

    let snapshots = LocalSnapshots::new(".".to_string());
    let data = snapshots.read_file(&config.input).await?;
    let form = Arc::new(InMemoryForm::from_snapshot(&data)?);

    let convention = FieldConvention::from_profile(&profile.form)?;
    let source = Arc::new(HttpPriceSource::new(profile.api.clone())?);

    // 事件：重播腳本或計畫 reconcile
    let events: Vec<RowEvent> = match &config.events {
        Some(path) => {
            let raw = snapshots.read_file(path).await?;
            serde_json::from_slice(&raw)?
        }
        None => plan_reconcile(form.as_ref(), &convention, config.force_refresh),
    };
    tracing::info!("📋 {} events to process", events.len());

    let engine = SyncEngine::new_with_monitoring(form.clone(), source, convention, config.monitor);

    let (tx, rx) = mpsc::channel(events.len().max(1));
    for event in events {
        // Receiver 未被輪詢前容量已足夠，send 不會卡住
        tx.send(event).await.map_err(|e| {
            lineitem_sync::SyncError::ProcessingError {
                message: format!("event channel closed early: {}", e),
            }
        })?;
    }
    drop(tx);

    engine.run(rx).await?;

    snapshots
        .write_file(&config.output, &form.snapshot()?)
        .await?;

    Ok(())
}
