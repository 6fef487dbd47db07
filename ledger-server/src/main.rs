use std::sync::Arc;

use ledger_server::{
    AnchorQueue, AnchorWorker, Config, DbService, LedgerAdapter, MockLedger,
    init_logger_with_file,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. 设置环境 (dotenv, 工作目录, 日志)
    dotenv::dotenv().ok();
    let config = Config::from_env();
    std::fs::create_dir_all(&config.work_dir)?;
    std::fs::create_dir_all(&config.blob_dir)?;
    init_logger_with_file(Some(&config.log_level), config.log_dir.as_deref());

    tracing::info!("Ledger anchoring service starting...");
    tracing::info!(
        work_dir = %config.work_dir,
        environment = %config.environment,
        "Configuration loaded"
    );

    // 2. 打开存储层
    let db = DbService::new(&config.database_path).await?;
    let queue = AnchorQueue::open(&config.queue_path)?;
    let ledger: Arc<dyn LedgerAdapter> = Arc::new(MockLedger::new());

    // 3. 运行锚定 worker，直到收到 Ctrl+C
    let worker = AnchorWorker::new(queue, db.pool.clone(), ledger);
    tokio::select! {
        _ = worker.run() => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received, stopping");
        }
    }

    Ok(())
}
