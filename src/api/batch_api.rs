// ==========================================
// 服装批次流转系统 - 批次 API
// ==========================================
// 职责: 批次登记 (BatchRegistry) 的业务入口
// - 创建/状态流转/删除批次, 全部落历史
// - 档期冲突检测与人工解除
// 红线: 冲突检测与创建在同一临界区内, 并发创建不会用到过期的检测结果
// ==========================================

use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::api::error::{ApiError, ApiResult};
use crate::api::validator;
use crate::config::ConfigManager;
use crate::domain::batch::{Batch, BatchLineItem};
use crate::domain::history::HistoryEntry;
use crate::domain::types::{BatchStatus, HistoryAction};
use crate::engine::conflict::{ConflictDetector, ScheduleConflict};
use crate::repository::batch_repo::{BatchRepository, NewBatch, NewBatchLineItem};
use crate::repository::history_repo::HistoryRepository;

// ==========================================
// 请求/响应 DTO
// ==========================================

/// 创建批次请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBatchRequest {
    pub cut_date: NaiveDate,
    pub status: BatchStatus,
    pub workshop_id: Option<String>,
    pub expected_return_date: Option<NaiveDate>,
    pub observations: Option<String>,
    pub line_items: Vec<CreateBatchLineItem>,
    pub user_id: String,
}

/// 创建批次的明细行
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBatchLineItem {
    pub product_id: String,
    pub quantity: i64,
    pub selected_color: String,
    pub selected_size: String,
}

impl CreateBatchLineItem {
    fn to_new(&self) -> NewBatchLineItem {
        NewBatchLineItem {
            product_id: self.product_id.clone(),
            quantity: self.quantity,
            selected_color: self.selected_color.clone(),
            selected_size: self.selected_size.clone(),
        }
    }
}

/// 冲突检测响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictCheckResponse {
    pub conflict: Option<ScheduleConflict>,
}

// ==========================================
// BatchApi - 批次 API
// ==========================================
pub struct BatchApi {
    batch_repo: Arc<BatchRepository>,
    history_repo: Arc<HistoryRepository>,
    config: Arc<ConfigManager>,
    /// 创建临界区: 冲突检测与落库之间不允许并发创建插队
    creation_lock: Mutex<()>,
}

impl BatchApi {
    /// 创建新的 BatchApi 实例
    pub fn new(
        batch_repo: Arc<BatchRepository>,
        history_repo: Arc<HistoryRepository>,
        config: Arc<ConfigManager>,
    ) -> Self {
        Self {
            batch_repo,
            history_repo,
            config,
            creation_lock: Mutex::new(()),
        }
    }

    // ==========================================
    // 创建与冲突
    // ==========================================

    /// 创建批次
    ///
    /// 流程: 输入校验 → (外发) 档期冲突检测 → 编号派生 + 落库 + 创建历史
    ///
    /// # 错误
    /// - InvalidInput: 明细为空 / 件数 < 1 / 状态与车间归属不符
    /// - ScheduleConflict: 车间在候选裁剪日仍压着未回厂批次
    #[instrument(skip(self, request), fields(
        cut_date = %request.cut_date,
        status = %request.status,
        workshop_id = request.workshop_id.as_deref().unwrap_or("-"),
        line_items = request.line_items.len()
    ))]
    pub fn create_batch(&self, request: &CreateBatchRequest) -> ApiResult<Batch> {
        let line_items: Vec<NewBatchLineItem> =
            request.line_items.iter().map(|i| i.to_new()).collect();

        validator::validate_line_items(&line_items)?;
        validator::validate_status_workshop(request.status, request.workshop_id.as_deref())?;
        validator::require_id(&request.user_id, "操作人")?;

        // 临界区: 检测与创建之间不允许并发创建插队
        let _guard = self
            .creation_lock
            .lock()
            .map_err(|e| ApiError::InternalError(format!("创建锁获取失败: {}", e)))?;

        if let Some(workshop_id) = request.workshop_id.as_deref() {
            if let Some(conflict) = self.detect_conflict(workshop_id, request.cut_date)? {
                return Err(ApiError::ScheduleConflict {
                    batch_id: conflict.batch_id,
                    batch_code: conflict.batch_code,
                    expected_return_date: conflict.expected_return_date.to_string(),
                    message: conflict.message,
                });
            }
        }

        let pad_width = self
            .config
            .batch_code_pad_width()
            .map_err(|e| ApiError::InternalError(e.to_string()))?;

        let new_batch = NewBatch {
            cut_date: request.cut_date,
            status: request.status,
            workshop_id: request.workshop_id.clone(),
            expected_return_date: request.expected_return_date,
            observations: request.observations.clone(),
            line_items,
        };
        let history = HistoryEntry::new(
            String::new(), // batch_id 由仓储回填
            HistoryAction::Created,
            request.user_id.clone(),
            Some(format!("创建批次, 状态 {}", request.status)),
        );

        let batch = self.batch_repo.create(&new_batch, &history, pad_width)?;
        info!(batch_id = %batch.batch_id, code = %batch.code, "批次已创建");
        Ok(batch)
    }

    /// 档期冲突检测（只读, 供前端创建前预检）
    pub fn check_conflict(
        &self,
        workshop_id: &str,
        candidate_cut_date: NaiveDate,
    ) -> ApiResult<ConflictCheckResponse> {
        validator::require_id(workshop_id, "车间ID")?;
        Ok(ConflictCheckResponse {
            conflict: self.detect_conflict(workshop_id, candidate_cut_date)?,
        })
    }

    fn detect_conflict(
        &self,
        workshop_id: &str,
        candidate_cut_date: NaiveDate,
    ) -> ApiResult<Option<ScheduleConflict>> {
        let open = self.batch_repo.list_open_by_workshop(workshop_id)?;
        Ok(ConflictDetector::check(&open, candidate_cut_date))
    }

    /// 人工解除档期冲突
    ///
    /// 将冲突批次的预计回厂日期改为新批次裁剪日的前一天, 状态置为已回厂,
    /// 为后续创建让出档期。这是人工确认的覆盖动作, 引擎从不自动调用
    #[instrument(skip(self))]
    pub fn resolve_conflict(
        &self,
        batch_id: &str,
        candidate_cut_date: NaiveDate,
        user_id: &str,
    ) -> ApiResult<Batch> {
        validator::require_id(batch_id, "批次ID")?;
        validator::require_id(user_id, "操作人")?;

        let mut batch = self.batch_repo.get(batch_id)?;
        if !batch.status.is_open() {
            return Err(ApiError::InvalidInput(format!(
                "批次已回厂, 无冲突可解除: batch_id={}",
                batch_id
            )));
        }

        let new_return = ConflictDetector::resolved_return_date(candidate_cut_date);
        batch.expected_return_date = Some(new_return);
        batch.status = BatchStatus::Returned;
        if batch.actual_return_date.is_none() {
            batch.actual_return_date = Some(chrono::Local::now().date_naive());
        }

        let history = HistoryEntry::new(
            batch_id,
            HistoryAction::ConflictResolved,
            user_id,
            Some(format!("人工解除档期冲突, 预计回厂改为 {}", new_return)),
        );
        self.batch_repo.update_status_fields(&batch, &history)?;
        info!(batch_id, %new_return, "档期冲突已人工解除");
        Ok(batch)
    }

    // ==========================================
    // 状态流转
    // ==========================================

    /// 批次状态流转
    ///
    /// 合法转换见 BatchStatus::can_transition_to; RETURNED↔WAITING
    /// 是人工回退通道。转入 RETURNED 且实际回厂日期未落时自动取当天
    #[instrument(skip(self, observations))]
    pub fn update_status(
        &self,
        batch_id: &str,
        new_status: BatchStatus,
        workshop_id: Option<String>,
        observations: Option<String>,
        user_id: &str,
    ) -> ApiResult<Batch> {
        validator::require_id(batch_id, "批次ID")?;
        validator::require_id(user_id, "操作人")?;

        let mut batch = self.batch_repo.get(batch_id)?;
        let old_status = batch.status;

        if !old_status.can_transition_to(new_status) {
            return Err(ApiError::InvalidStateTransition {
                from: old_status.to_string(),
                to: new_status.to_string(),
            });
        }

        // 车间归属: 显式传入优先, 转厂内时清空
        let next_workshop = match new_status {
            BatchStatus::InternalProduction => None,
            _ => workshop_id.or_else(|| batch.workshop_id.clone()),
        };
        validator::validate_status_workshop(new_status, next_workshop.as_deref())?;

        batch.status = new_status;
        batch.workshop_id = next_workshop;
        if let Some(obs) = observations {
            batch.observations = Some(obs);
        }
        match new_status {
            BatchStatus::Returned => {
                if batch.actual_return_date.is_none() {
                    batch.actual_return_date = Some(chrono::Local::now().date_naive());
                }
            }
            // 人工回退: 回厂记录作废, 批次重新占用档期
            BatchStatus::Waiting if old_status == BatchStatus::Returned => {
                batch.actual_return_date = None;
            }
            _ => {}
        }

        let history = HistoryEntry::new(
            batch_id,
            HistoryAction::StatusChanged,
            user_id,
            Some(format!("{} → {}", old_status, new_status)),
        );
        self.batch_repo.update_status_fields(&batch, &history)?;
        info!(batch_id, from = %old_status, to = %new_status, "批次状态已流转");
        Ok(batch)
    }

    // ==========================================
    // 删除与杂项
    // ==========================================

    /// 删除批次（已关联结算单的批次拒绝删除）
    #[instrument(skip(self))]
    pub fn delete_batch(&self, batch_id: &str) -> ApiResult<()> {
        validator::require_id(batch_id, "批次ID")?;
        self.batch_repo.delete(batch_id)?;
        info!(batch_id, "批次已删除");
        Ok(())
    }

    /// 设置批次图片地址（图片服务回写）
    pub fn set_image_url(&self, batch_id: &str, image_url: &str) -> ApiResult<()> {
        validator::require_id(batch_id, "批次ID")?;
        Ok(self.batch_repo.set_image_url(batch_id, image_url)?)
    }

    // ==========================================
    // 查询
    // ==========================================

    /// 按ID查批次
    pub fn get_batch(&self, batch_id: &str) -> ApiResult<Batch> {
        validator::require_id(batch_id, "批次ID")?;
        Ok(self.batch_repo.get(batch_id)?)
    }

    /// 查询批次明细行
    pub fn get_line_items(&self, batch_id: &str) -> ApiResult<Vec<BatchLineItem>> {
        validator::require_id(batch_id, "批次ID")?;
        Ok(self.batch_repo.get_line_items(batch_id)?)
    }

    /// 列出全部批次
    pub fn list_batches(&self) -> ApiResult<Vec<Batch>> {
        Ok(self.batch_repo.list_all()?)
    }

    /// 查询批次操作历史（时间升序）
    pub fn get_history(&self, batch_id: &str) -> ApiResult<Vec<HistoryEntry>> {
        validator::require_id(batch_id, "批次ID")?;
        Ok(self.history_repo.list_by_batch(batch_id)?)
    }
}
