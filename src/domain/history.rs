// ==========================================
// 服装批次流转系统 - 批次历史日志模型
// ==========================================
// 红线: 只追加, 不修改; 仅随所属批次一起删除
// ==========================================

use crate::domain::types::HistoryAction;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ==========================================
// HistoryEntry - 批次操作历史
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub entry_id: String,          // 日志ID
    pub batch_id: String,          // 所属批次
    pub action: HistoryAction,     // 动作类型
    pub user_id: String,           // 操作人
    pub logged_at: NaiveDateTime,  // 记录时间
    pub notes: Option<String>,     // 详情
}

impl HistoryEntry {
    /// 构造一条新日志（记录时间取当前本地时间）
    pub fn new(
        batch_id: impl Into<String>,
        action: HistoryAction,
        user_id: impl Into<String>,
        notes: Option<String>,
    ) -> Self {
        Self {
            entry_id: uuid::Uuid::new_v4().to_string(),
            batch_id: batch_id.into(),
            action,
            user_id: user_id.into(),
            logged_at: chrono::Local::now().naive_local(),
            notes,
        }
    }
}
