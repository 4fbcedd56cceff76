// ==========================================
// 服装批次流转系统 - 领域类型定义
// ==========================================
// 批次状态机: WAITING → {INTERNAL_PRODUCTION, EXTERNAL_WORKSHOP} → RETURNED
// RETURNED ↔ WAITING 为人工回退通道（不是错误）
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 批次状态 (Batch Status)
// ==========================================
// 序列化格式: SCREAMING_SNAKE_CASE (与数据库一致)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatchStatus {
    Waiting,            // 待安排
    InternalProduction, // 厂内生产
    ExternalWorkshop,   // 外发车间
    Returned,           // 已回厂
}

impl BatchStatus {
    /// 判断向 `to` 的状态转换是否合法
    ///
    /// 合法转换:
    /// - WAITING → INTERNAL_PRODUCTION / EXTERNAL_WORKSHOP
    /// - INTERNAL_PRODUCTION / EXTERNAL_WORKSHOP → RETURNED
    /// - RETURNED ↔ WAITING (人工回退通道)
    pub fn can_transition_to(self, to: BatchStatus) -> bool {
        use BatchStatus::*;
        matches!(
            (self, to),
            (Waiting, InternalProduction)
                | (Waiting, ExternalWorkshop)
                | (InternalProduction, Returned)
                | (ExternalWorkshop, Returned)
                | (Returned, Waiting)
                | (Waiting, Returned)
        )
    }

    /// 判断批次是否仍在途（占用车间档期）
    pub fn is_open(self) -> bool {
        self != BatchStatus::Returned
    }

    /// 从数据库字符串解析
    pub fn parse(s: &str) -> Option<BatchStatus> {
        match s {
            "WAITING" => Some(BatchStatus::Waiting),
            "INTERNAL_PRODUCTION" => Some(BatchStatus::InternalProduction),
            "EXTERNAL_WORKSHOP" => Some(BatchStatus::ExternalWorkshop),
            "RETURNED" => Some(BatchStatus::Returned),
            _ => None,
        }
    }
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchStatus::Waiting => write!(f, "WAITING"),
            BatchStatus::InternalProduction => write!(f, "INTERNAL_PRODUCTION"),
            BatchStatus::ExternalWorkshop => write!(f, "EXTERNAL_WORKSHOP"),
            BatchStatus::Returned => write!(f, "RETURNED"),
        }
    }
}

// ==========================================
// 结算单状态 (Invoice Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceStatus {
    Pending, // 待付款
    Paid,    // 已付款
}

impl InvoiceStatus {
    pub fn parse(s: &str) -> Option<InvoiceStatus> {
        match s {
            "PENDING" => Some(InvoiceStatus::Pending),
            "PAID" => Some(InvoiceStatus::Paid),
            _ => None,
        }
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvoiceStatus::Pending => write!(f, "PENDING"),
            InvoiceStatus::Paid => write!(f, "PAID"),
        }
    }
}

// ==========================================
// 日历窗口模式 (Calendar Mode)
// ==========================================
// BIWEEKLY: 半月窗口 [1,15] / [16,月末]
// MONTHLY: 整月窗口
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CalendarMode {
    Biweekly,
    Monthly,
}

impl fmt::Display for CalendarMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CalendarMode::Biweekly => write!(f, "BIWEEKLY"),
            CalendarMode::Monthly => write!(f, "MONTHLY"),
        }
    }
}

// ==========================================
// 日历泳道键 (Lane Key)
// ==========================================
// 厂内生产归入 Internal 泳道，外发批次按车间分道
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", tag = "kind", content = "workshop_id")]
pub enum LaneKey {
    Internal,
    Workshop(String),
}

impl fmt::Display for LaneKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LaneKey::Internal => write!(f, "INTERNAL"),
            LaneKey::Workshop(id) => write!(f, "{}", id),
        }
    }
}

// ==========================================
// 批次历史动作 (History Action)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HistoryAction {
    Created,          // 批次创建
    StatusChanged,    // 状态流转
    ConflictResolved, // 档期冲突人工解除
    Invoiced,         // 纳入结算单
}

impl fmt::Display for HistoryAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HistoryAction::Created => write!(f, "CREATED"),
            HistoryAction::StatusChanged => write!(f, "STATUS_CHANGED"),
            HistoryAction::ConflictResolved => write!(f, "CONFLICT_RESOLVED"),
            HistoryAction::Invoiced => write!(f, "INVOICED"),
        }
    }
}

impl HistoryAction {
    pub fn parse(s: &str) -> Option<HistoryAction> {
        match s {
            "CREATED" => Some(HistoryAction::Created),
            "STATUS_CHANGED" => Some(HistoryAction::StatusChanged),
            "CONFLICT_RESOLVED" => Some(HistoryAction::ConflictResolved),
            "INVOICED" => Some(HistoryAction::Invoiced),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_status_transitions() {
        use BatchStatus::*;

        assert!(Waiting.can_transition_to(InternalProduction));
        assert!(Waiting.can_transition_to(ExternalWorkshop));
        assert!(ExternalWorkshop.can_transition_to(Returned));
        assert!(InternalProduction.can_transition_to(Returned));

        // 人工回退通道
        assert!(Returned.can_transition_to(Waiting));
        assert!(Waiting.can_transition_to(Returned));

        // 非法转换
        assert!(!Returned.can_transition_to(ExternalWorkshop));
        assert!(!InternalProduction.can_transition_to(ExternalWorkshop));
        assert!(!ExternalWorkshop.can_transition_to(Waiting));
    }

    #[test]
    fn test_batch_status_roundtrip() {
        for s in [
            BatchStatus::Waiting,
            BatchStatus::InternalProduction,
            BatchStatus::ExternalWorkshop,
            BatchStatus::Returned,
        ] {
            assert_eq!(BatchStatus::parse(&s.to_string()), Some(s));
        }
        assert_eq!(BatchStatus::parse("SHIPPED"), None);
    }

    #[test]
    fn test_is_open() {
        assert!(BatchStatus::Waiting.is_open());
        assert!(BatchStatus::ExternalWorkshop.is_open());
        assert!(!BatchStatus::Returned.is_open());
    }
}
