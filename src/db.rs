// ==========================================
// 服装批次流转系统 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为，避免部分模块外键开启/部分不开启
// - 统一 busy_timeout，减少并发写入时的偶发 busy 错误
// - 提供建表入口, 库/测试/演示程序共用同一份 schema
// ==========================================

use rusqlite::Connection;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要每个连接单独开启
/// - busy_timeout 需要每个连接单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 初始化数据库 schema（幂等, CREATE TABLE IF NOT EXISTS）
///
/// 表清单:
/// - batch / batch_line_item: 批次与明细
/// - invoice / invoice_batch_link: 结算单与批次关联
/// - batch_history: 批次操作历史 (只追加)
/// - config_kv: 全局配置键值
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS batch (
            batch_id TEXT PRIMARY KEY,
            code TEXT NOT NULL,
            cut_date TEXT NOT NULL,
            status TEXT NOT NULL,
            workshop_id TEXT,
            expected_return_date TEXT,
            actual_return_date TEXT,
            observations TEXT,
            paid INTEGER NOT NULL DEFAULT 0,
            image_url TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now', 'localtime'))
        );

        CREATE TABLE IF NOT EXISTS batch_line_item (
            batch_id TEXT NOT NULL REFERENCES batch(batch_id),
            product_id TEXT NOT NULL,
            quantity INTEGER NOT NULL CHECK (quantity >= 1),
            selected_color TEXT NOT NULL,
            selected_size TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS invoice (
            invoice_id TEXT PRIMARY KEY,
            workshop_id TEXT NOT NULL,
            invoice_number TEXT NOT NULL,
            issue_date TEXT NOT NULL,
            due_date TEXT NOT NULL,
            total_amount REAL NOT NULL,
            status TEXT NOT NULL,
            paid_date TEXT,
            notes TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now', 'localtime'))
        );

        CREATE UNIQUE INDEX IF NOT EXISTS idx_invoice_number
            ON invoice(invoice_number);

        CREATE TABLE IF NOT EXISTS invoice_batch_link (
            invoice_id TEXT NOT NULL REFERENCES invoice(invoice_id),
            batch_id TEXT NOT NULL REFERENCES batch(batch_id),
            amount REAL NOT NULL,
            PRIMARY KEY (invoice_id, batch_id)
        );

        CREATE UNIQUE INDEX IF NOT EXISTS idx_invoice_batch_link_batch
            ON invoice_batch_link(batch_id);

        CREATE TABLE IF NOT EXISTS batch_history (
            entry_id TEXT PRIMARY KEY,
            batch_id TEXT NOT NULL REFERENCES batch(batch_id),
            action TEXT NOT NULL,
            user_id TEXT NOT NULL,
            logged_at TEXT NOT NULL,
            notes TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_batch_history_batch
            ON batch_history(batch_id);

        CREATE TABLE IF NOT EXISTS config_kv (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now', 'localtime'))
        );
        "#,
    )?;
    Ok(())
}

/// 打开连接并保证 schema 就绪（演示程序/测试入口）
pub fn open_and_init(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = open_sqlite_connection(db_path)?;
    init_schema(&conn)?;
    Ok(conn)
}
