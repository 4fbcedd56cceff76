// ==========================================
// 服装批次流转系统 - API层输入校验
// ==========================================
// 职责: 请求参数校验, 失败返回 ApiError::InvalidInput
// 校验失败的请求不会被自动重试
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::domain::types::BatchStatus;
use crate::repository::batch_repo::NewBatchLineItem;
use chrono::NaiveDate;

/// 校验非空ID
pub fn require_id(value: &str, field: &str) -> ApiResult<()> {
    if value.trim().is_empty() {
        return Err(ApiError::InvalidInput(format!("{}不能为空", field)));
    }
    Ok(())
}

/// 校验批次明细: 至少一行, 件数 ≥ 1
pub fn validate_line_items(items: &[NewBatchLineItem]) -> ApiResult<()> {
    if items.is_empty() {
        return Err(ApiError::InvalidInput(
            "批次至少需要一行明细".to_string(),
        ));
    }
    for item in items {
        require_id(&item.product_id, "明细款号")?;
        if item.quantity < 1 {
            return Err(ApiError::InvalidInput(format!(
                "明细件数必须 ≥ 1: product_id={}, quantity={}",
                item.product_id, item.quantity
            )));
        }
    }
    Ok(())
}

/// 校验批次状态与车间归属的不变量
///
/// - EXTERNAL_WORKSHOP 必须带车间
/// - INTERNAL_PRODUCTION 不得带车间
pub fn validate_status_workshop(
    status: BatchStatus,
    workshop_id: Option<&str>,
) -> ApiResult<()> {
    match status {
        BatchStatus::ExternalWorkshop if workshop_id.is_none() => Err(ApiError::InvalidInput(
            "外发批次必须指定车间".to_string(),
        )),
        BatchStatus::InternalProduction if workshop_id.is_some() => Err(ApiError::InvalidInput(
            "厂内批次不得指定车间".to_string(),
        )),
        _ => Ok(()),
    }
}

/// 校验日期区间
pub fn validate_date_range(start: NaiveDate, end: NaiveDate) -> ApiResult<()> {
    if start > end {
        return Err(ApiError::InvalidInput(format!(
            "区间起始日不得晚于结束日: {} > {}",
            start, end
        )));
    }
    Ok(())
}
