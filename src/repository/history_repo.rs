// ==========================================
// 服装批次流转系统 - 批次历史仓储
// ==========================================
// 红线: 只追加, 不更新; 删除只发生在批次删除事务内 (见 BatchRepository)
// ==========================================

use crate::domain::history::HistoryEntry;
use crate::domain::types::HistoryAction;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

// ==========================================
// HistoryRepository - 批次历史仓储
// ==========================================
pub struct HistoryRepository {
    conn: Arc<Mutex<Connection>>,
}

impl HistoryRepository {
    /// 创建新的批次历史仓储
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 追加一条历史记录
    pub fn append(&self, entry: &HistoryEntry) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO batch_history (entry_id, batch_id, action, user_id, logged_at, notes)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
            params![
                entry.entry_id,
                entry.batch_id,
                entry.action.to_string(),
                entry.user_id,
                entry.logged_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                entry.notes,
            ],
        )?;
        Ok(entry.entry_id.clone())
    }

    /// 按批次查历史（时间升序）
    pub fn list_by_batch(&self, batch_id: &str) -> RepositoryResult<Vec<HistoryEntry>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT entry_id, batch_id, action, user_id, logged_at, notes
            FROM batch_history
            WHERE batch_id = ?
            ORDER BY logged_at ASC, entry_id ASC
            "#,
        )?;
        let entries = stmt
            .query_map(params![batch_id], |row| {
                let action_str: String = row.get("action")?;
                let action = HistoryAction::parse(&action_str).ok_or_else(|| {
                    rusqlite::Error::FromSqlConversionFailure(
                        0,
                        rusqlite::types::Type::Text,
                        format!("未知历史动作: {}", action_str).into(),
                    )
                })?;
                Ok(HistoryEntry {
                    entry_id: row.get("entry_id")?,
                    batch_id: row.get("batch_id")?,
                    action,
                    user_id: row.get("user_id")?,
                    logged_at: row.get("logged_at")?,
                    notes: row.get("notes")?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }
}
