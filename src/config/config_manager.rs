// ==========================================
// 服装批次流转系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value)
// ==========================================

use crate::db::configure_sqlite_connection;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::sync::{Arc, Mutex};

// ===== 配置键 =====
const KEY_BATCH_CODE_PAD_WIDTH: &str = "batch_code_pad_width";
const KEY_INVOICE_SEQUENCE_BASE: &str = "invoice_sequence_base";
const KEY_DEFAULT_DUE_DAYS: &str = "default_due_days";

// ===== 默认值 =====
const DEFAULT_BATCH_CODE_PAD_WIDTH: usize = 3;
const DEFAULT_INVOICE_SEQUENCE_BASE: i64 = 1000;
const DEFAULT_DUE_DAYS: i64 = 30;

/// 核心配置快照
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// 批次编号补零宽度
    pub batch_code_pad_width: usize,
    /// 结算单号序号起始值（同车间同日首张）
    pub invoice_sequence_base: i64,
    /// 未显式给出应付日期时的默认账期（天）
    pub default_due_days: i64,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            batch_code_pad_width: DEFAULT_BATCH_CODE_PAD_WIDTH,
            invoice_sequence_base: DEFAULT_INVOICE_SEQUENCE_BASE,
            default_due_days: DEFAULT_DUE_DAYS,
        }
    }
}

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            configure_sqlite_connection(&conn_guard)?;
        }
        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值
    fn get_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 写入配置值（UPSERT）
    pub fn set_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            r#"
            INSERT INTO config_kv (key, value, updated_at)
            VALUES (?1, ?2, datetime('now', 'localtime'))
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
            params![key, value],
        )?;
        Ok(())
    }

    /// 批次编号补零宽度
    pub fn batch_code_pad_width(&self) -> Result<usize, Box<dyn Error>> {
        match self.get_config_value(KEY_BATCH_CODE_PAD_WIDTH)? {
            Some(v) => Ok(v.parse()?),
            None => Ok(DEFAULT_BATCH_CODE_PAD_WIDTH),
        }
    }

    /// 结算单号序号起始值
    pub fn invoice_sequence_base(&self) -> Result<i64, Box<dyn Error>> {
        match self.get_config_value(KEY_INVOICE_SEQUENCE_BASE)? {
            Some(v) => Ok(v.parse()?),
            None => Ok(DEFAULT_INVOICE_SEQUENCE_BASE),
        }
    }

    /// 默认账期（天）
    pub fn default_due_days(&self) -> Result<i64, Box<dyn Error>> {
        match self.get_config_value(KEY_DEFAULT_DUE_DAYS)? {
            Some(v) => Ok(v.parse()?),
            None => Ok(DEFAULT_DUE_DAYS),
        }
    }

    /// 获取完整配置快照
    pub fn snapshot(&self) -> Result<CoreConfig, Box<dyn Error>> {
        Ok(CoreConfig {
            batch_code_pad_width: self.batch_code_pad_width()?,
            invoice_sequence_base: self.invoice_sequence_base()?,
            default_due_days: self.default_due_days()?,
        })
    }

    /// 获取配置快照的 JSON 字符串（日志与诊断用）
    pub fn snapshot_json(&self) -> Result<String, Box<dyn Error>> {
        Ok(serde_json::to_string(&self.snapshot()?)?)
    }
}
