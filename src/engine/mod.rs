// ==========================================
// 服装批次流转系统 - 引擎层
// ==========================================
// 职责: 实现业务规则引擎, 不拼 SQL
// 红线: Engine 不拼 SQL, 所有规则必须输出 reason
// ==========================================

pub mod calendar;
pub mod conflict;
pub mod settlement;

// 重导出核心引擎
pub use calendar::{
    BatchPlacement, CalendarEngine, CalendarWindow, WindowDirection,
};
pub use conflict::{ConflictDetector, ScheduleConflict};
pub use settlement::{round2, SettlementEngine, WorkshopSummary};
