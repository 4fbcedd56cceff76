// ==========================================
// 服装批次流转系统 - 数据仓储层
// ==========================================
// 红线: Repository 不做业务逻辑, 只做数据映射
// 共享连接: Arc<Mutex<Connection>>, 互斥锁即多步读写的临界区
// ==========================================

pub mod batch_repo;
pub mod error;
pub mod history_repo;
pub mod invoice_repo;

pub use batch_repo::{BatchRepository, NewBatch, NewBatchLineItem};
pub use error::{RepositoryError, RepositoryResult};
pub use history_repo::HistoryRepository;
pub use invoice_repo::{InvoiceDraft, InvoiceRepository};
