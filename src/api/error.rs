// ==========================================
// 服装批次流转系统 - API层错误类型
// ==========================================
// 职责: 定义API层错误类型, 转换Repository错误为用户友好的错误消息
// 红线: 冲突类错误必须带上批次/日期细节, 供人工决策; 引擎从不自动解除
// ==========================================

use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 业务冲突错误 (对应 409)
    // ==========================================
    /// 车间档期冲突: 候选裁剪日早于在途批次的预计回厂日
    #[error("车间档期冲突: 批次{batch_code}预计{expected_return_date}回厂, {message}")]
    ScheduleConflict {
        batch_id: String,
        batch_code: String,
        expected_return_date: String,
        message: String,
    },

    /// 结算冲突: 重复开单 / 批次归属不符 / 删除已结算批次
    #[error("结算冲突: {0}")]
    BillingConflict(String),

    // ==========================================
    // 业务规则错误 (对应 400)
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("无效的状态转换: from={from} to={to}")]
    InvalidStateTransition { from: String, to: String },

    // ==========================================
    // 资源错误 (对应 404)
    // ==========================================
    #[error("资源未找到: {0}")]
    NotFound(String),

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库事务失败: {0}")]
    DatabaseTransactionError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ==========================================
// 从 RepositoryError 转换
// 目的: 将Repository层的技术错误转换为用户友好的业务错误
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseTransactionError(msg) => {
                ApiError::DatabaseTransactionError(msg)
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::BillingConflict(format!("唯一约束违反: {}", msg))
            }
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::BillingConflict(format!("外键约束违反: {}", msg))
            }
            RepositoryError::BusinessRuleViolation(msg) => ApiError::BillingConflict(msg),
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;
