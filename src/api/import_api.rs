// ==========================================
// 库存对账引擎 - 导入 API
// ==========================================
// 职责: 组装两条导入管线，按上传文件名确定声明的扩展名，
//       统一错误转换（供 HTTP 层与集成测试使用）
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::config::ConfigManager;
use crate::domain::import::{ProductImportSummary, WarehouseImportSummary};
use crate::importer::{
    FieldMapperImpl, ProductImporter, ProductImporterImpl, WarehouseImporter,
    WarehouseImporterImpl,
};
use crate::repository::{SqliteCatalogRepository, SqliteWarehouseRepository};
use crate::services::{IdentityService, NotificationService};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// 导入 API
#[derive(Clone)]
pub struct ImportApi {
    products: Arc<dyn ProductImporter>,
    warehouses: Arc<dyn WarehouseImporter>,
}

impl ImportApi {
    /// 使用已构建的导入器创建
    pub fn new(products: Arc<dyn ProductImporter>, warehouses: Arc<dyn WarehouseImporter>) -> Self {
        Self {
            products,
            warehouses,
        }
    }

    /// 基于共享 SQLite 连接装配默认实现
    ///
    /// # 参数
    /// - conn: 已初始化 schema 的连接
    /// - identity / notifier: 外部服务客户端
    /// - log_dir: 单次导入日志目录（None 表示仅 tracing）
    pub fn from_connection(
        conn: Arc<Mutex<Connection>>,
        identity: Arc<dyn IdentityService>,
        notifier: Arc<dyn NotificationService>,
        log_dir: Option<PathBuf>,
    ) -> Self {
        let products = ProductImporterImpl::new(
            SqliteCatalogRepository::from_connection(conn.clone()),
            ConfigManager::from_connection(conn.clone()),
            identity.clone(),
            notifier.clone(),
            Box::new(FieldMapperImpl::new()),
            log_dir.clone(),
        );
        let warehouses = WarehouseImporterImpl::new(
            SqliteWarehouseRepository::from_connection(conn.clone()),
            ConfigManager::from_connection(conn),
            identity,
            notifier,
            Box::new(FieldMapperImpl::new()),
            log_dir,
        );
        Self::new(Arc::new(products), Arc::new(warehouses))
    }

    /// 导入商品库存文件
    ///
    /// # 参数
    /// - file_path: 落盘后的文件路径（可能无扩展名）
    /// - file_name: 上传时的原始文件名（决定解析格式）
    pub async fn import_products(
        &self,
        file_path: &Path,
        file_name: &str,
    ) -> ApiResult<ProductImportSummary> {
        let extension = declared_extension(file_name)?;
        Ok(self.products.import_file(file_path, extension).await?)
    }

    /// 导入仓库文件
    pub async fn import_warehouses(
        &self,
        file_path: &Path,
        file_name: &str,
    ) -> ApiResult<WarehouseImportSummary> {
        let extension = declared_extension(file_name)?;
        Ok(self.warehouses.import_file(file_path, extension).await?)
    }
}

/// 从原始文件名取扩展名
pub fn declared_extension(file_name: &str) -> ApiResult<&str> {
    Path::new(file_name.trim())
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty())
        .ok_or_else(|| ApiError::FileFormat(format!("无法从文件名确定格式: {}", file_name)))
}
