// ==========================================
// 服装批次流转系统 - 档期日历引擎
// ==========================================
// 职责: 时间窗口计算 + 批次到列的映射 + 泳道分组
// 只产出几何量 (列号/跨度), 像素渲染是前端的事
// 泳道内的视觉重叠不在引擎职责内
// ==========================================

use crate::domain::batch::Batch;
use crate::domain::types::{CalendarMode, LaneKey};
use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ==========================================
// CalendarWindow - 时间窗口
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarWindow {
    pub period_start: NaiveDate, // 窗口起始日 (含)
    pub period_end: NaiveDate,   // 窗口结束日 (含)
    pub day_count: i64,          // 窗口天数
}

/// 批次在窗口内的落位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchPlacement {
    pub start_column: i64, // 起始列 (0-based)
    pub span: i64,         // 跨度 (列数)
}

/// 窗口导航方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WindowDirection {
    Previous,
    Next,
}

// ==========================================
// CalendarEngine - 日历引擎
// ==========================================
pub struct CalendarEngine;

impl CalendarEngine {
    /// 计算参考日期所在的时间窗口
    ///
    /// - MONTHLY: 参考日期所在整月
    /// - BIWEEKLY: 日 ≤ 15 取 [1,15], 否则取 [16, 月末]
    pub fn compute_window(reference_date: NaiveDate, mode: CalendarMode) -> CalendarWindow {
        let (start, end) = match mode {
            CalendarMode::Monthly => (
                first_day_of_month(reference_date),
                last_day_of_month(reference_date),
            ),
            CalendarMode::Biweekly => {
                if reference_date.day() <= 15 {
                    (
                        first_day_of_month(reference_date),
                        mid_month(reference_date),
                    )
                } else {
                    (
                        mid_month(reference_date) + Duration::days(1),
                        last_day_of_month(reference_date),
                    )
                }
            }
        };

        CalendarWindow {
            period_start: start,
            period_end: end,
            day_count: (end - start).num_days() + 1,
        }
    }

    /// 窗口导航（半月/整月步进, 正确跨越月与年边界）
    ///
    /// # 返回
    /// 相邻窗口
    pub fn shift_window(
        window: &CalendarWindow,
        mode: CalendarMode,
        direction: WindowDirection,
    ) -> CalendarWindow {
        let reference = match direction {
            // 上一窗口: 取当前窗口起始日前一天
            WindowDirection::Previous => window.period_start - Duration::days(1),
            // 下一窗口: 取当前窗口结束日后一天
            WindowDirection::Next => window.period_end + Duration::days(1),
        };
        Self::compute_window(reference, mode)
    }

    /// 批次在窗口内的落位
    ///
    /// 有效结束日 = 已回厂取实际回厂日, 否则预计回厂日, 否则裁剪日+1;
    /// 裁剪日晚于窗口末尾或结束日早于窗口起始 → 不落位;
    /// 列偏移裁剪到 [0, day_count-1], 跨度按结束日不含计, 至少 1 列
    pub fn layout_batch(batch: &Batch, window: &CalendarWindow) -> Option<BatchPlacement> {
        let effective_end = batch.effective_end_date();

        if batch.cut_date > window.period_end || effective_end < window.period_start {
            return None;
        }

        let max_col = window.day_count - 1;
        let start_column =
            ((batch.cut_date - window.period_start).num_days()).clamp(0, max_col);
        let end_column =
            ((effective_end - window.period_start).num_days()).clamp(0, max_col);
        let span = (end_column - start_column).max(1);

        Some(BatchPlacement { start_column, span })
    }

    /// 按泳道分组（厂内一条道, 每个外发车间一条道）
    ///
    /// 泳道内批次按裁剪日期升序; 返回 BTreeMap 保证泳道顺序稳定
    pub fn group_by_lane(batches: Vec<Batch>) -> BTreeMap<LaneKey, Vec<Batch>> {
        let mut lanes: BTreeMap<LaneKey, Vec<Batch>> = BTreeMap::new();
        for batch in batches {
            let key = match &batch.workshop_id {
                Some(id) => LaneKey::Workshop(id.clone()),
                None => LaneKey::Internal,
            };
            lanes.entry(key).or_default().push(batch);
        }
        for lane in lanes.values_mut() {
            lane.sort_by(|a, b| a.cut_date.cmp(&b.cut_date).then(a.code.cmp(&b.code)));
        }
        lanes
    }
}

/// 当月 1 日
fn first_day_of_month(date: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(date.year(), date.month(), 1)
        .unwrap_or(date)
}

/// 当月 15 日
fn mid_month(date: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(date.year(), date.month(), 15)
        .unwrap_or(date)
}

/// 当月最后一天
fn last_day_of_month(date: NaiveDate) -> NaiveDate {
    let (next_year, next_month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .map(|d| d - Duration::days(1))
        .unwrap_or(date)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::BatchStatus;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn batch_on(cut: NaiveDate, expected: Option<NaiveDate>) -> Batch {
        Batch {
            batch_id: "b".to_string(),
            code: "001".to_string(),
            cut_date: cut,
            status: BatchStatus::Waiting,
            workshop_id: None,
            expected_return_date: expected,
            actual_return_date: None,
            observations: None,
            paid: false,
            image_url: None,
            created_at: cut.and_hms_opt(8, 0, 0).unwrap(),
        }
    }

    // ===== 窗口计算 =====

    #[test]
    fn test_monthly_window() {
        let w = CalendarEngine::compute_window(date(2025, 2, 10), CalendarMode::Monthly);
        assert_eq!(w.period_start, date(2025, 2, 1));
        assert_eq!(w.period_end, date(2025, 2, 28));
        assert_eq!(w.day_count, 28);
    }

    #[test]
    fn test_biweekly_first_half() {
        let w = CalendarEngine::compute_window(date(2025, 3, 15), CalendarMode::Biweekly);
        assert_eq!(w.period_start, date(2025, 3, 1));
        assert_eq!(w.period_end, date(2025, 3, 15));
        assert_eq!(w.day_count, 15);
    }

    #[test]
    fn test_biweekly_second_half() {
        // 场景: 参考日 2025-03-20 → [03-16, 03-31], 16 天
        let w = CalendarEngine::compute_window(date(2025, 3, 20), CalendarMode::Biweekly);
        assert_eq!(w.period_start, date(2025, 3, 16));
        assert_eq!(w.period_end, date(2025, 3, 31));
        assert_eq!(w.day_count, 16);
    }

    // ===== 窗口导航 =====

    #[test]
    fn test_shift_biweekly_across_month_boundary() {
        let w = CalendarEngine::compute_window(date(2025, 3, 20), CalendarMode::Biweekly);
        let next = CalendarEngine::shift_window(&w, CalendarMode::Biweekly, WindowDirection::Next);
        assert_eq!(next.period_start, date(2025, 4, 1));
        assert_eq!(next.period_end, date(2025, 4, 15));

        let prev =
            CalendarEngine::shift_window(&w, CalendarMode::Biweekly, WindowDirection::Previous);
        assert_eq!(prev.period_start, date(2025, 3, 1));
        assert_eq!(prev.period_end, date(2025, 3, 15));
    }

    #[test]
    fn test_shift_monthly_across_year_boundary() {
        let w = CalendarEngine::compute_window(date(2025, 12, 10), CalendarMode::Monthly);
        let next = CalendarEngine::shift_window(&w, CalendarMode::Monthly, WindowDirection::Next);
        assert_eq!(next.period_start, date(2026, 1, 1));
        assert_eq!(next.period_end, date(2026, 1, 31));

        let jan = CalendarEngine::compute_window(date(2025, 1, 5), CalendarMode::Monthly);
        let prev =
            CalendarEngine::shift_window(&jan, CalendarMode::Monthly, WindowDirection::Previous);
        assert_eq!(prev.period_start, date(2024, 12, 1));
        assert_eq!(prev.period_end, date(2024, 12, 31));
    }

    // ===== 批次落位 =====

    #[test]
    fn test_layout_batch_without_expected_return() {
        // 场景: 裁剪 2025-01-05, 无预计回厂, 1月整月窗口 → 列4, 跨度1
        let w = CalendarEngine::compute_window(date(2025, 1, 10), CalendarMode::Monthly);
        let b = batch_on(date(2025, 1, 5), None);
        let p = CalendarEngine::layout_batch(&b, &w).expect("应落位");
        assert_eq!(p.start_column, 4);
        assert_eq!(p.span, 1);
    }

    #[test]
    fn test_layout_batch_with_expected_return() {
        let w = CalendarEngine::compute_window(date(2025, 3, 1), CalendarMode::Monthly);
        let b = batch_on(date(2025, 3, 10), Some(date(2025, 3, 14)));
        let p = CalendarEngine::layout_batch(&b, &w).expect("应落位");
        assert_eq!(p.start_column, 9);
        assert_eq!(p.span, 4);
    }

    #[test]
    fn test_layout_clips_to_window() {
        // 批次横跨整个窗口 → 列偏移裁剪到窗口内
        let w = CalendarEngine::compute_window(date(2025, 3, 20), CalendarMode::Biweekly);
        let b = batch_on(date(2025, 3, 1), Some(date(2025, 5, 1)));
        let p = CalendarEngine::layout_batch(&b, &w).expect("应落位");
        assert_eq!(p.start_column, 0);
        assert!(p.start_column + p.span <= w.day_count);
        assert_eq!(p.span, w.day_count - 1);
    }

    #[test]
    fn test_layout_none_when_no_overlap() {
        let w = CalendarEngine::compute_window(date(2025, 3, 1), CalendarMode::Monthly);
        // 裁剪日晚于窗口末尾
        assert!(CalendarEngine::layout_batch(&batch_on(date(2025, 4, 2), None), &w).is_none());
        // 结束日早于窗口起始
        assert!(CalendarEngine::layout_batch(
            &batch_on(date(2025, 2, 1), Some(date(2025, 2, 20))),
            &w
        )
        .is_none());
    }

    #[test]
    fn test_layout_uses_actual_return_when_returned() {
        let w = CalendarEngine::compute_window(date(2025, 3, 1), CalendarMode::Monthly);
        let mut b = batch_on(date(2025, 3, 10), Some(date(2025, 3, 20)));
        b.status = BatchStatus::Returned;
        b.actual_return_date = Some(date(2025, 3, 12));
        let p = CalendarEngine::layout_batch(&b, &w).expect("应落位");
        assert_eq!(p.span, 2);
    }

    // ===== 泳道分组 =====

    #[test]
    fn test_group_by_lane() {
        let mut b1 = batch_on(date(2025, 3, 12), None);
        b1.batch_id = "b1".to_string();
        b1.workshop_id = Some("w-1".to_string());
        let mut b2 = batch_on(date(2025, 3, 10), None);
        b2.batch_id = "b2".to_string();
        b2.workshop_id = Some("w-1".to_string());
        let mut b3 = batch_on(date(2025, 3, 11), None);
        b3.batch_id = "b3".to_string(); // 厂内批次

        let lanes = CalendarEngine::group_by_lane(vec![b1, b2, b3]);
        assert_eq!(lanes.len(), 2);

        let internal = lanes.get(&LaneKey::Internal).expect("应有厂内泳道");
        assert_eq!(internal.len(), 1);

        let w1 = lanes
            .get(&LaneKey::Workshop("w-1".to_string()))
            .expect("应有 w-1 泳道");
        // 泳道内按裁剪日期升序
        assert_eq!(w1[0].batch_id, "b2");
        assert_eq!(w1[1].batch_id, "b1");
    }
}
