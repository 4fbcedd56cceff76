// ==========================================
// 服装批次流转系统 - 档期日历 API
// ==========================================
// 职责: 读取批次, 产出渲染就绪的窗口几何 (泳道 + 列号/跨度)
// 像素渲染与泳道内视觉避让由前端负责
// ==========================================

use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::api::error::ApiResult;
use crate::domain::types::{CalendarMode, LaneKey};
use crate::engine::calendar::{CalendarEngine, CalendarWindow, WindowDirection};
use crate::repository::batch_repo::BatchRepository;

// ==========================================
// 响应 DTO
// ==========================================

/// 泳道内的批次落位
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacedBatchView {
    pub batch_id: String,
    pub code: String,
    pub start_column: i64,
    pub span: i64,
}

/// 一条泳道
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaneView {
    pub lane_key: LaneKey,
    pub batches: Vec<PlacedBatchView>,
}

/// 日历窗口响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarWindowResponse {
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub day_count: i64,
    pub lanes: Vec<LaneView>,
}

// ==========================================
// CalendarApi - 档期日历 API
// ==========================================
pub struct CalendarApi {
    batch_repo: Arc<BatchRepository>,
}

impl CalendarApi {
    /// 创建新的 CalendarApi 实例
    pub fn new(batch_repo: Arc<BatchRepository>) -> Self {
        Self { batch_repo }
    }

    /// 查询日历窗口（窗口几何 + 泳道分组 + 批次落位）
    ///
    /// 与窗口无交集的批次不出现; 空泳道不产出
    pub fn get_calendar_window(
        &self,
        reference_date: NaiveDate,
        mode: CalendarMode,
    ) -> ApiResult<CalendarWindowResponse> {
        let window = CalendarEngine::compute_window(reference_date, mode);
        let batches = self.batch_repo.list_all()?;

        let lanes = CalendarEngine::group_by_lane(batches)
            .into_iter()
            .filter_map(|(lane_key, lane_batches)| {
                let placed: Vec<PlacedBatchView> = lane_batches
                    .iter()
                    .filter_map(|batch| {
                        CalendarEngine::layout_batch(batch, &window).map(|p| PlacedBatchView {
                            batch_id: batch.batch_id.clone(),
                            code: batch.code.clone(),
                            start_column: p.start_column,
                            span: p.span,
                        })
                    })
                    .collect();
                if placed.is_empty() {
                    None
                } else {
                    Some(LaneView {
                        lane_key,
                        batches: placed,
                    })
                }
            })
            .collect();

        Ok(CalendarWindowResponse {
            period_start: window.period_start,
            period_end: window.period_end,
            day_count: window.day_count,
            lanes,
        })
    }

    /// 窗口导航（上一/下一个半月或整月窗口）
    pub fn shift_window(
        &self,
        reference_date: NaiveDate,
        mode: CalendarMode,
        direction: WindowDirection,
    ) -> CalendarWindow {
        let current = CalendarEngine::compute_window(reference_date, mode);
        CalendarEngine::shift_window(&current, mode, direction)
    }
}
