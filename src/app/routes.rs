// ==========================================
// 库存对账引擎 - HTTP 路由
// ==========================================
// POST /csv/upload-product      商品库存文件（multipart 字段 file）
// POST /csv/upload-warehouses   仓库文件（multipart 字段 file）
// GET  /health                  存活检查
//
// 上传文件先落盘为临时文件，导入在独立任务中执行，
// 客户端断开不会中止已开始的导入
// ==========================================

use crate::api::{ApiError, ApiResult, ImportApi};
use crate::app::state::AppState;
use crate::domain::import::{ProductImportSummary, WarehouseImportSummary};
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::future::Future;
use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;
use tower_http::trace::TraceLayer;

/// 上传文件字段名
pub const UPLOAD_FIELD: &str = "file";

/// 上传文件大小上限
pub const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// 构建路由
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/csv/upload-product", post(upload_products))
        .route("/csv/upload-warehouses", post(upload_warehouses))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": crate::VERSION,
    }))
}

async fn upload_products(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<(StatusCode, Json<ProductImportSummary>)> {
    let upload = spool_upload(multipart).await?;
    let summary = run_import(&state, upload, |api, upload| async move {
        api.import_products(upload.file.path(), &upload.file_name).await
    })
    .await?;
    Ok((StatusCode::CREATED, Json(summary)))
}

async fn upload_warehouses(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<(StatusCode, Json<WarehouseImportSummary>)> {
    let upload = spool_upload(multipart).await?;
    let summary = run_import(&state, upload, |api, upload| async move {
        api.import_warehouses(upload.file.path(), &upload.file_name).await
    })
    .await?;
    Ok((StatusCode::CREATED, Json(summary)))
}

// ==========================================
// 上传落盘
// ==========================================

/// 已落盘的上传文件（任务结束时随 NamedTempFile 一起删除）
pub struct SpooledUpload {
    pub file_name: String,
    pub file: NamedTempFile,
}

async fn spool_upload(mut multipart: Multipart) -> ApiResult<SpooledUpload> {
    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::InvalidInput(format!("multipart 解析失败: {}", e)))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let file_name = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| ApiError::InvalidInput("上传文件缺少文件名".to_string()))?;

        let mut file = NamedTempFile::new()
            .map_err(|e| ApiError::InternalError(format!("创建临时文件失败: {}", e)))?;
        let mut size = 0usize;
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| ApiError::InvalidInput(format!("读取上传文件失败: {}", e)))?
        {
            size += chunk.len();
            file.write_all(&chunk)
                .map_err(|e| ApiError::InternalError(format!("写入临时文件失败: {}", e)))?;
        }
        file.flush()
            .map_err(|e| ApiError::InternalError(format!("写入临时文件失败: {}", e)))?;

        tracing::info!(file_name = %file_name, size, "上传文件已落盘");
        return Ok(SpooledUpload { file_name, file });
    }

    Err(ApiError::InvalidInput(format!(
        "缺少上传字段 {}",
        UPLOAD_FIELD
    )))
}

// ==========================================
// 导入任务
// ==========================================

/// 在独立任务中执行导入（受并发槽位限制）
async fn run_import<T, F, Fut>(state: &AppState, upload: SpooledUpload, job: F) -> ApiResult<T>
where
    T: Send + 'static,
    F: FnOnce(Arc<ImportApi>, SpooledUpload) -> Fut + Send + 'static,
    Fut: Future<Output = ApiResult<T>> + Send + 'static,
{
    let api = state.import_api.clone();
    let slots = state.import_slots.clone();

    let handle = tokio::spawn(async move {
        let _permit = slots
            .acquire_owned()
            .await
            .map_err(|e| ApiError::InternalError(format!("导入槽位不可用: {}", e)))?;
        job(api, upload).await
    });

    handle
        .await
        .map_err(|e| ApiError::InternalError(format!("导入任务异常终止: {}", e)))?
}
