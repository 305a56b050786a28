// ==========================================
// 库存对账引擎 - API 层错误类型
// ==========================================
// 职责: 将导入/仓储错误转换为对外错误
// 响应体: { "error": 简述, "detalle": 详细原因 }
// 状态码: 文件格式/请求错误 → 400，其余 → 500
// ==========================================

use crate::importer::error::ImportError;
use crate::repository::error::RepositoryError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// API 层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ===== 客户端错误 =====
    #[error("无效请求: {0}")]
    InvalidInput(String),

    #[error("文件格式错误: {0}")]
    FileFormat(String),

    // ===== 服务端错误 =====
    #[error("导入失败: {0}")]
    ImportFailed(String),

    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("内部错误: {0}")]
    InternalError(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidInput(_) | ApiError::FileFormat(_) => StatusCode::BAD_REQUEST,
            ApiError::ImportFailed(_) | ApiError::DatabaseError(_) | ApiError::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// 对外错误简述
    pub fn title(&self) -> &'static str {
        match self {
            ApiError::InvalidInput(_) => "请求无效",
            ApiError::FileFormat(_) => "文件格式错误",
            ApiError::ImportFailed(_) => "导入失败",
            ApiError::DatabaseError(_) => "数据库错误",
            ApiError::InternalError(_) => "内部错误",
        }
    }

    fn detail(&self) -> &str {
        match self {
            ApiError::InvalidInput(msg)
            | ApiError::FileFormat(msg)
            | ApiError::ImportFailed(msg)
            | ApiError::DatabaseError(msg)
            | ApiError::InternalError(msg) => msg,
        }
    }
}

// ==========================================
// 从 ImportError 转换
// ==========================================
impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        if err.is_format_error() {
            ApiError::FileFormat(err.to_string())
        } else {
            ApiError::ImportFailed(err.to_string())
        }
    }
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        ApiError::DatabaseError(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "导入请求失败");
        } else {
            tracing::warn!(error = %self, "导入请求被拒绝");
        }

        let body = json!({
            "error": self.title(),
            "detalle": self.detail(),
        });
        (status, Json(body)).into_response()
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::ImportStage;

    #[test]
    fn test_import_error_classification() {
        let err: ApiError = ImportError::UnsupportedFormat("pdf".to_string()).into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.title(), "文件格式错误");

        let err: ApiError = ImportError::persistence(ImportStage::PersistingLedger)(
            RepositoryError::LockError("poisoned".to_string()),
        )
        .into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.to_string().contains("PersistingLedger"));
    }

    #[test]
    fn test_into_response_status() {
        let response = ApiError::InvalidInput("缺少 file 字段".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = ApiError::InternalError("x".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
