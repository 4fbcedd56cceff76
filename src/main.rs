// ==========================================
// 服装批次流转系统 - 命令行入口
// ==========================================
// 用途: 初始化数据库并打印当前批次/结算概况
// 数据库路径: 第一个命令行参数, 缺省 garment_batch_flow.db
// ==========================================

use std::sync::{Arc, Mutex};

use garment_batch_flow::config::ConfigManager;
use garment_batch_flow::repository::{BatchRepository, InvoiceRepository};
use garment_batch_flow::{db, logging};

fn main() -> anyhow::Result<()> {
    logging::init();

    tracing::info!("==================================================");
    tracing::info!("{}", garment_batch_flow::APP_NAME);
    tracing::info!("系统版本: {}", garment_batch_flow::VERSION);
    tracing::info!("==================================================");

    let db_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "garment_batch_flow.db".to_string());
    tracing::info!("使用数据库: {}", db_path);

    let conn = Arc::new(Mutex::new(db::open_and_init(&db_path)?));

    let batch_repo = BatchRepository::new(conn.clone());
    let invoice_repo = InvoiceRepository::new(conn.clone());

    let config = ConfigManager::from_connection(conn).map_err(|e| anyhow::anyhow!("{}", e))?;
    tracing::info!("当前配置: {}", config.snapshot_json().map_err(|e| anyhow::anyhow!("{}", e))?);

    let batches = batch_repo.list_all()?;
    let open_count = batches.iter().filter(|b| b.is_open()).count();
    let unpaid_count = batches.iter().filter(|b| !b.paid).count();
    let invoices = invoice_repo.list(None)?;

    tracing::info!(
        "批次总数 {}, 在途 {}, 未结算 {}", batches.len(), open_count, unpaid_count
    );
    tracing::info!("结算单总数 {}", invoices.len());

    Ok(())
}
