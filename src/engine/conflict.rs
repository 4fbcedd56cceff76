// ==========================================
// 服装批次流转系统 - 档期冲突检测引擎
// ==========================================
// 职责: 判断车间在候选裁剪日是否还压着未回厂的批次
// 红线: Engine 不拼 SQL; 所有冲突必须输出 reason (可解释性)
// 红线: 引擎只检测, 从不自动解除 — 解除是人工确认动作
// ==========================================

use crate::domain::batch::Batch;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ==========================================
// ScheduleConflict - 档期冲突
// ==========================================
// 携带足够细节供人工决策: 哪个批次、哪个日期
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConflict {
    pub batch_id: String,                // 冲突批次ID
    pub batch_code: String,              // 冲突批次编号
    pub expected_return_date: NaiveDate, // 该批次的预计回厂日期
    pub message: String,                 // 人类可读说明
}

// ==========================================
// ConflictDetector - 冲突检测引擎
// ==========================================
pub struct ConflictDetector;

impl ConflictDetector {
    /// 检测候选裁剪日与在途批次的档期冲突
    ///
    /// 规则: 在 `open_batches`（同一车间、status != RETURNED）中,
    /// 按预计回厂日期升序取第一个 `expected_return_date` 严格晚于
    /// 候选裁剪日的批次; 没有预计回厂日期的批次不参与判定
    ///
    /// # 参数
    /// - `open_batches`: 目标车间的在途批次
    /// - `candidate_cut_date`: 新批次的候选裁剪日期
    ///
    /// # 返回
    /// - Some(ScheduleConflict): 最早到期的冲突批次
    /// - None: 无冲突
    pub fn check(
        open_batches: &[Batch],
        candidate_cut_date: NaiveDate,
    ) -> Option<ScheduleConflict> {
        let mut candidates: Vec<&Batch> = open_batches
            .iter()
            .filter(|b| b.status.is_open())
            .filter(|b| {
                b.expected_return_date
                    .map(|d| d > candidate_cut_date)
                    .unwrap_or(false)
            })
            .collect();

        // 升序排序保证结果确定性
        candidates.sort_by_key(|b| b.expected_return_date);

        candidates.first().map(|b| {
            let expected = b
                .expected_return_date
                .unwrap_or(candidate_cut_date);
            ScheduleConflict {
                batch_id: b.batch_id.clone(),
                batch_code: b.code.clone(),
                expected_return_date: expected,
                message: format!(
                    "批次 {} 预计 {} 回厂, 晚于候选裁剪日 {}, 车间档期冲突",
                    b.code, expected, candidate_cut_date
                ),
            }
        })
    }

    /// 人工解除冲突时, 冲突批次的新预计回厂日期
    ///
    /// 规则: 新批次裁剪日的前一天
    pub fn resolved_return_date(candidate_cut_date: NaiveDate) -> NaiveDate {
        candidate_cut_date - chrono::Duration::days(1)
    }
}
