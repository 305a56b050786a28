// ==========================================
// 库存对账引擎 - 配置管理器
// ==========================================
// 职责: 运行期可调配置的读取与写入
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::import_config_trait::{ConfigResult, ImportConfigReader};
use crate::db::open_sqlite_connection;
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

/// 全局作用域
const GLOBAL_SCOPE: &str = "global";

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 批处理
    pub const BATCH_SIZE: &str = "import.batch_size";

    // 外部服务
    pub const EXTERNAL_TIMEOUT_MS: &str = "import.external_timeout_ms";
    pub const DISPATCHER_ROLE: &str = "import.dispatcher_role";
    pub const MANAGER_ROLE: &str = "import.manager_role";

    // 流水策略
    pub const RECORD_UNCHANGED_UPDATES: &str = "import.record_unchanged_updates";
}

/// 默认值
pub mod defaults {
    pub const BATCH_SIZE: usize = 500;
    pub const EXTERNAL_TIMEOUT_MS: u64 = 5_000;
    pub const DISPATCHER_ROLE: &str = "Dispatcher";
    pub const MANAGER_ROLE: &str = "Manager";
    pub const RECORD_UNCHANGED_UPDATES: bool = false;
}

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> ConfigResult<Self> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_global_config_value(&self, key: &str) -> ConfigResult<Option<String>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = ?1 AND key = ?2",
                params![GLOBAL_SCOPE, key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    /// 写入 global scope 配置（存在则覆盖）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> ConfigResult<()> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES (?1, ?2, ?3)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?3, updated_at = datetime('now')",
            params![GLOBAL_SCOPE, key, value],
        )?;
        Ok(())
    }

    fn get_config_or_default(&self, key: &str, default: &str) -> ConfigResult<String> {
        Ok(self
            .get_global_config_value(key)?
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| default.to_string()))
    }
}

#[async_trait]
impl ImportConfigReader for ConfigManager {
    async fn get_batch_size(&self) -> ConfigResult<usize> {
        let value = self.get_config_or_default(config_keys::BATCH_SIZE, "500")?;
        // 0 会导致无法分块，按非法值处理
        Ok(value
            .parse::<usize>()
            .ok()
            .filter(|&n| n > 0)
            .unwrap_or(defaults::BATCH_SIZE))
    }

    async fn get_external_timeout_ms(&self) -> ConfigResult<u64> {
        let value = self.get_config_or_default(config_keys::EXTERNAL_TIMEOUT_MS, "5000")?;
        Ok(value
            .parse::<u64>()
            .ok()
            .filter(|&n| n > 0)
            .unwrap_or(defaults::EXTERNAL_TIMEOUT_MS))
    }

    async fn get_dispatcher_role(&self) -> ConfigResult<String> {
        self.get_config_or_default(config_keys::DISPATCHER_ROLE, defaults::DISPATCHER_ROLE)
    }

    async fn get_manager_role(&self) -> ConfigResult<String> {
        self.get_config_or_default(config_keys::MANAGER_ROLE, defaults::MANAGER_ROLE)
    }

    async fn get_record_unchanged_updates(&self) -> ConfigResult<bool> {
        let value = self.get_config_or_default(config_keys::RECORD_UNCHANGED_UPDATES, "false")?;
        match value.to_lowercase().as_str() {
            "true" | "1" => Ok(true),
            "false" | "0" => Ok(false),
            _ => Ok(defaults::RECORD_UNCHANGED_UPDATES),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_schema;

    fn manager() -> ConfigManager {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        ConfigManager::from_connection(Arc::new(Mutex::new(conn)))
    }

    #[tokio::test]
    async fn test_defaults_when_missing() {
        let config = manager();
        assert_eq!(config.get_batch_size().await.unwrap(), 500);
        assert_eq!(config.get_external_timeout_ms().await.unwrap(), 5_000);
        assert_eq!(config.get_dispatcher_role().await.unwrap(), "Dispatcher");
        assert_eq!(config.get_manager_role().await.unwrap(), "Manager");
        assert!(!config.get_record_unchanged_updates().await.unwrap());
    }

    #[tokio::test]
    async fn test_overrides_and_invalid_values() {
        let config = manager();
        config.set_global_config_value(config_keys::BATCH_SIZE, "2").unwrap();
        config
            .set_global_config_value(config_keys::RECORD_UNCHANGED_UPDATES, "TRUE")
            .unwrap();
        config
            .set_global_config_value(config_keys::EXTERNAL_TIMEOUT_MS, "abc")
            .unwrap();

        assert_eq!(config.get_batch_size().await.unwrap(), 2);
        assert!(config.get_record_unchanged_updates().await.unwrap());
        assert_eq!(config.get_external_timeout_ms().await.unwrap(), 5_000);

        config.set_global_config_value(config_keys::BATCH_SIZE, "0").unwrap();
        assert_eq!(config.get_batch_size().await.unwrap(), 500);
    }
}
