// ==========================================
// 库存对账引擎 - 进程级配置（环境变量）
// ==========================================
// 职责: 启动时一次性读取的配置（绑定地址、DB 路径、外部服务地址）
// 说明: 运行期可调参数放在 config_kv（见 ConfigManager）
//
// 环境变量:
// - INVENTORY_DB_PATH               SQLite 路径（默认: 用户数据目录）
// - INVENTORY_LOG_DIR               单次导入日志目录（默认: <DB 目录>/import_logs）
// - INVENTORY_BIND                  监听地址（默认: 127.0.0.1:3000）
// - IDENTITY_SERVICE_URL            身份服务地址（必填）
// - NOTIFICATION_SERVICE_URL        通知服务地址（必填）
// - SERVICE_TOKEN                   服务间调用令牌（必填）
// - INVENTORY_MAX_CONCURRENT_IMPORTS 并发导入上限（默认: 2）
// ==========================================

use secrecy::SecretString;
use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;

pub const ENV_DB_PATH: &str = "INVENTORY_DB_PATH";
pub const ENV_LOG_DIR: &str = "INVENTORY_LOG_DIR";
pub const ENV_BIND: &str = "INVENTORY_BIND";
pub const ENV_IDENTITY_URL: &str = "IDENTITY_SERVICE_URL";
pub const ENV_NOTIFICATION_URL: &str = "NOTIFICATION_SERVICE_URL";
pub const ENV_SERVICE_TOKEN: &str = "SERVICE_TOKEN";
pub const ENV_MAX_CONCURRENT_IMPORTS: &str = "INVENTORY_MAX_CONCURRENT_IMPORTS";

const DEFAULT_BIND: &str = "127.0.0.1:3000";
const DEFAULT_MAX_CONCURRENT_IMPORTS: usize = 2;

/// 配置加载错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("缺少环境变量: {0}")]
    MissingEnvVar(String),

    #[error("环境变量 {0} 取值非法: {1}")]
    InvalidEnvVar(String, String),
}

/// 进程级配置
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: String,
    pub log_dir: PathBuf,
    pub bind_addr: SocketAddr,
    pub identity_service_url: String,
    pub notification_service_url: String,
    pub service_token: SecretString,
    pub max_concurrent_imports: usize,
}

impl AppConfig {
    /// 从环境变量加载（存在 .env 时先加载）
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let db_path = get_default_db_path();
        let log_dir = get_optional_env(ENV_LOG_DIR)
            .map(PathBuf::from)
            .unwrap_or_else(|| default_log_dir(&db_path));

        let bind_raw = get_optional_env(ENV_BIND).unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind_addr = bind_raw
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar(ENV_BIND.to_string(), e.to_string()))?;

        let max_concurrent_imports = match get_optional_env(ENV_MAX_CONCURRENT_IMPORTS) {
            Some(raw) => raw
                .parse::<usize>()
                .ok()
                .filter(|&n| n > 0)
                .ok_or_else(|| {
                    ConfigError::InvalidEnvVar(ENV_MAX_CONCURRENT_IMPORTS.to_string(), raw)
                })?,
            None => DEFAULT_MAX_CONCURRENT_IMPORTS,
        };

        Ok(Self {
            db_path,
            log_dir,
            bind_addr,
            identity_service_url: trim_base_url(&get_required_env(ENV_IDENTITY_URL)?),
            notification_service_url: trim_base_url(&get_required_env(ENV_NOTIFICATION_URL)?),
            service_token: SecretString::from(get_required_env(ENV_SERVICE_TOKEN)?),
            max_concurrent_imports,
        })
    }
}

/// 获取默认数据库路径
///
/// 优先级: INVENTORY_DB_PATH > 用户数据目录 > 当前目录
pub fn get_default_db_path() -> String {
    if let Some(path) = get_optional_env(ENV_DB_PATH) {
        return path;
    }

    let mut path = PathBuf::from("./inventory_import.db");

    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("inventory-import");
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("inventory_import.db");
        }
    }

    path.to_string_lossy().to_string()
}

fn default_log_dir(db_path: &str) -> PathBuf {
    PathBuf::from(db_path)
        .parent()
        .map(|p| p.join("import_logs"))
        .unwrap_or_else(|| PathBuf::from("./import_logs"))
}

fn trim_base_url(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

fn get_required_env(key: &str) -> Result<String, ConfigError> {
    get_optional_env(key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
