// ==========================================
// 库存对账引擎 - 配置层
// ==========================================
// 职责:
// - 进程级配置: 环境变量（AppConfig）
// - 运行期配置: config_kv 表（ConfigManager）
// ==========================================

pub mod app_config;
pub mod config_manager;
pub mod import_config_trait;

// 重导出核心配置
pub use app_config::{get_default_db_path, AppConfig, ConfigError};
pub use config_manager::{config_keys, ConfigManager};
pub use import_config_trait::{ConfigResult, ImportConfigReader};
