// ==========================================
// 服装批次流转系统 - 结算单领域模型
// ==========================================
// 红线: total_amount 开单时冻结, 之后工价变动不回溯重算
// 红线: 一个批次至多出现在一条 InvoiceBatchLink 中 (经 Batch.paid 保证)
// ==========================================

use crate::domain::types::InvoiceStatus;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// ==========================================
// Invoice - 车间结算单
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    pub invoice_id: String,            // 结算单ID
    pub workshop_id: String,           // 车间ID
    pub invoice_number: String,        // 结算单号 (全局唯一, {前缀}-{DDMMYY}-{序号})
    pub issue_date: NaiveDate,         // 开单日期
    pub due_date: NaiveDate,           // 应付日期
    pub total_amount: f64,             // 总金额 (开单时冻结)
    pub status: InvoiceStatus,         // 状态
    pub paid_date: Option<NaiveDate>,  // 付款日期
    pub notes: Option<String>,         // 备注
    pub created_at: NaiveDateTime,     // 创建时间
}

impl Invoice {
    pub fn is_paid(&self) -> bool {
        self.status == InvoiceStatus::Paid
    }
}

// ==========================================
// InvoiceBatchLink - 结算单-批次关联
// ==========================================
// amount = 开单时该批次的估值快照
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceBatchLink {
    pub invoice_id: String, // 结算单ID
    pub batch_id: String,   // 批次ID
    pub amount: f64,        // 批次估值快照
}
