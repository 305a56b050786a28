// ==========================================
// 库存对账引擎 - 应用层
// ==========================================
// 职责: axum HTTP 集成，连接上传请求与导入 API
// ==========================================

pub mod routes;
pub mod state;

// 重导出
pub use routes::router;
pub use state::AppState;
