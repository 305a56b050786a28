// ==========================================
// 库存对账引擎 - 应用状态
// ==========================================
// 职责: HTTP 处理器共享的 API 实例与并发导入槽位
// ==========================================

use crate::api::ImportApi;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// 应用状态
///
/// axum 按请求克隆，字段均为 Arc
#[derive(Clone)]
pub struct AppState {
    /// 导入 API
    pub import_api: Arc<ImportApi>,

    /// 进程级并发导入上限
    pub import_slots: Arc<Semaphore>,
}

impl AppState {
    pub fn new(import_api: ImportApi, max_concurrent_imports: usize) -> Self {
        Self {
            import_api: Arc::new(import_api),
            import_slots: Arc::new(Semaphore::new(max_concurrent_imports.max(1))),
        }
    }
}
