// ==========================================
// 服装批次流转系统 - API 层
// ==========================================
// 职责: 业务入口, 输入校验 + 引擎/仓储编排 + 错误转换
// ==========================================

pub mod batch_api;
pub mod calendar_api;
pub mod error;
pub mod settlement_api;
pub mod validator;

pub use batch_api::{BatchApi, ConflictCheckResponse, CreateBatchLineItem, CreateBatchRequest};
pub use calendar_api::{CalendarApi, CalendarWindowResponse, LaneView, PlacedBatchView};
pub use error::{ApiError, ApiResult};
pub use settlement_api::{
    GenerateInvoiceRequest, InvoiceBatchView, InvoiceDetail, SettlementApi, ValuatedLineItem,
};
