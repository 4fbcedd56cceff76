// ==========================================
// 服装批次流转系统 - 批次领域模型
// ==========================================
// 不变量: status=EXTERNAL_WORKSHOP 时 workshop_id 必填
//         status=INTERNAL_PRODUCTION 时 workshop_id 必为空
// paid 字段只允许结算引擎修改
// ==========================================

use crate::domain::types::BatchStatus;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// ==========================================
// Batch - 生产批次
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Batch {
    pub batch_id: String,                        // 批次ID
    pub code: String,                            // 批次编号 (顺序号, 补零)
    pub cut_date: NaiveDate,                     // 裁剪日期
    pub status: BatchStatus,                     // 批次状态
    pub workshop_id: Option<String>,             // 外发车间 (None=厂内)
    pub expected_return_date: Option<NaiveDate>, // 预计回厂日期
    pub actual_return_date: Option<NaiveDate>,   // 实际回厂日期 (转RETURNED时自动落)
    pub observations: Option<String>,            // 备注
    pub paid: bool,                              // 是否已结算
    pub image_url: Option<String>,               // 图片地址 (图片服务写入)
    pub created_at: NaiveDateTime,               // 创建时间
}

impl Batch {
    /// 判断批次是否仍在途（未回厂，占用车间档期）
    pub fn is_open(&self) -> bool {
        self.status.is_open()
    }

    /// 判断是否为外发批次
    pub fn is_external(&self) -> bool {
        self.workshop_id.is_some()
    }

    /// 日历布局用的有效结束日期
    ///
    /// 规则: 已回厂取实际回厂日, 否则取预计回厂日, 都没有则裁剪日+1天
    pub fn effective_end_date(&self) -> NaiveDate {
        if self.status == BatchStatus::Returned {
            if let Some(d) = self.actual_return_date {
                return d;
            }
        }
        self.expected_return_date
            .unwrap_or_else(|| self.cut_date + chrono::Duration::days(1))
    }
}

// ==========================================
// BatchLineItem - 批次明细行
// ==========================================
// 一个批次创建时至少包含一行
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchLineItem {
    pub batch_id: String,           // 所属批次
    pub product_id: String,         // 款号/产品ID
    pub quantity: i64,              // 件数 (≥1)
    pub selected_color: String,     // 颜色
    pub selected_size: String,      // 尺码
}
