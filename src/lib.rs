// ==========================================
// 库存对账引擎 - 核心库
// ==========================================
// 技术栈: axum + Rust + SQLite
// 系统定位: 商品库存 / 仓库批量导入与对账服务
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 导入层 - 对账管线
pub mod importer;

// 外部服务 - 身份 / 通知
pub mod services;

// 配置层 - 进程配置与运行期参数
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// 应用层 - HTTP 集成
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{FileFormat, ImportStage, MovementType};

// 导入汇总
pub use domain::import::{ProductImportSummary, RowError, WarehouseImportSummary};

// 导入器
pub use importer::{ProductImporter, ProductImporterImpl, WarehouseImporter, WarehouseImporterImpl};

// API
pub use api::ImportApi;

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "库存对账引擎";
