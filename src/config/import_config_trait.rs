// ==========================================
// 库存对账引擎 - 导入配置读取 Trait
// ==========================================
// 职责: 定义导入管线所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use async_trait::async_trait;
use std::error::Error;

pub type ConfigResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

// ==========================================
// ImportConfigReader Trait
// ==========================================
// 用途: 导入管线所需的配置读取接口
// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait ImportConfigReader: Send + Sync {
    // ===== 批处理 =====

    /// 获取对账分块大小（行数）
    ///
    /// # 默认值
    /// - 500
    ///
    /// # 用途
    /// - 对账分块与流水分块共用同一大小
    async fn get_batch_size(&self) -> ConfigResult<usize>;

    // ===== 外部服务 =====

    /// 获取单次外部调用超时（毫秒）
    ///
    /// # 默认值
    /// - 5000
    async fn get_external_timeout_ms(&self) -> ConfigResult<u64>;

    /// 低库存告警接收人角色
    ///
    /// # 默认值
    /// - "Dispatcher"
    async fn get_dispatcher_role(&self) -> ConfigResult<String>;

    /// 新建仓库经理账号时使用的角色
    ///
    /// # 默认值
    /// - "Manager"
    async fn get_manager_role(&self) -> ConfigResult<String>;

    // ===== 流水策略 =====

    /// 数量未变化的更新是否也记录流水
    ///
    /// # 默认值
    /// - false（仅数量变化时记录 UPDATE 流水）
    async fn get_record_unchanged_updates(&self) -> ConfigResult<bool>;
}
