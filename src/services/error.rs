// ==========================================
// 库存对账引擎 - 外部服务错误类型
// ==========================================
// 工具: thiserror 派生宏
// ==========================================

use thiserror::Error;

/// 外部服务（身份服务 / 通知服务）调用错误
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("HTTP 请求失败: {0}")]
    Http(#[from] reqwest::Error),

    #[error("外部调用超时（{0} ms）")]
    Timeout(u64),

    /// 创建用户时邮箱已被占用（并发开通的良性竞争）
    #[error("邮箱已被占用: {0}")]
    EmailInUse(String),

    #[error("外部服务返回错误: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("响应解析失败: {0}")]
    Parse(String),
}

/// Result 类型别名
pub type ServiceResult<T> = Result<T, ServiceError>;
