// ==========================================
// 服装批次流转系统 - 结算引擎
// ==========================================
// 职责: 批次估值、单号前缀派生、车间汇总结构
// 红线: 估值永不报错 — 缺失款号/工价按 0 计, 不拦开单
// ==========================================

use crate::domain::batch::BatchLineItem;
use crate::domain::catalog::ProductCatalog;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// 单号前缀车间段长度（匹配 [A-Z]{3}）
const PREFIX_LETTERS: usize = 3;

// ==========================================
// WorkshopSummary - 车间结算汇总
// ==========================================
// 只读报表行, 按车间排期顺序产出
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkshopSummary {
    pub workshop_id: String,      // 车间ID
    pub workshop_name: String,    // 车间名称
    pub pending_batch_count: i64, // 区间内未结算批次数
    pub paid_batch_count: i64,    // 区间内已结算批次数
    pub total_unpaid_value: f64,  // 未结算批次估值合计
}

// ==========================================
// SettlementEngine - 结算引擎
// ==========================================
pub struct SettlementEngine;

impl SettlementEngine {
    /// 批次估值: Σ 件数 × 工价, 保留两位小数
    ///
    /// 缺失款号或未定价的明细行按 0 计, 永不报错
    pub fn valuate_line_items(items: &[BatchLineItem], catalog: &dyn ProductCatalog) -> f64 {
        let total: f64 = items
            .iter()
            .map(|item| {
                let unit = catalog.production_value(&item.product_id).unwrap_or(0.0);
                item.quantity as f64 * unit
            })
            .sum();
        round2(total)
    }

    /// 结算单号前缀: {车间名前三个字母大写}-{DDMMYY}-
    ///
    /// 取车间名中前三个 ASCII 字母转大写; 不足三个时以 'X' 补齐,
    /// 保证前缀始终匹配 [A-Z]{3}
    pub fn invoice_number_prefix(workshop_name: &str, issue_date: NaiveDate) -> String {
        let mut letters: String = workshop_name
            .chars()
            .filter(|c| c.is_ascii_alphabetic())
            .take(PREFIX_LETTERS)
            .collect::<String>()
            .to_uppercase();
        while letters.len() < PREFIX_LETTERS {
            letters.push('X');
        }

        format!("{}-{}-", letters, issue_date.format("%d%m%y"))
    }
}

/// 金额统一保留两位小数
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
