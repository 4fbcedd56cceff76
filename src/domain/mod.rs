// ==========================================
// 服装批次流转系统 - 领域层
// ==========================================
// 职责: 实体与类型安全枚举, 不做持久化
// ==========================================

pub mod batch;
pub mod catalog;
pub mod history;
pub mod invoice;
pub mod types;

// 重导出领域实体
pub use batch::{Batch, BatchLineItem};
pub use catalog::{
    InMemoryProductCatalog, InMemoryWorkshopDirectory, ProductCatalog, WorkshopDirectory,
    WorkshopRef,
};
pub use history::HistoryEntry;
pub use invoice::{Invoice, InvoiceBatchLink};
pub use types::{BatchStatus, CalendarMode, HistoryAction, InvoiceStatus, LaneKey};
