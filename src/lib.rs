// ==========================================
// 服装批次流转系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 批次排期与车间结算核心 (主数据/鉴权/打印为外部协作方)
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 业务规则
pub mod engine;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/建表）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{BatchStatus, CalendarMode, HistoryAction, InvoiceStatus, LaneKey};

// 领域实体
pub use domain::{
    Batch, BatchLineItem, HistoryEntry, InMemoryProductCatalog, InMemoryWorkshopDirectory,
    Invoice, InvoiceBatchLink, ProductCatalog, WorkshopDirectory, WorkshopRef,
};

// 引擎
pub use engine::{
    BatchPlacement, CalendarEngine, CalendarWindow, ConflictDetector, ScheduleConflict,
    SettlementEngine, WindowDirection, WorkshopSummary,
};

// API
pub use api::{BatchApi, CalendarApi, SettlementApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "服装生产批次流转与结算系统";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
