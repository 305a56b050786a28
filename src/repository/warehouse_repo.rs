// ==========================================
// 库存对账引擎 - 仓库 Repository Trait
// ==========================================
// 职责: 定义仓库导入所需的数据访问端口（不包含业务逻辑）
// ==========================================

use crate::domain::warehouse::{City, CityKey, NewCity, Warehouse};
use crate::repository::error::RepositoryResult;
use async_trait::async_trait;

// ==========================================
// WarehouseRepository Trait
// ==========================================
// 实现者: SqliteWarehouseRepository（使用 rusqlite）
#[async_trait]
pub trait WarehouseRepository: Send + Sync {
    // ===== 城市 =====

    async fn find_cities_by_keys(&self, keys: &[CityKey]) -> RepositoryResult<Vec<City>>;

    /// 批量创建城市，(name_key, state_key) 重复时忽略
    async fn create_cities(&self, cities: Vec<NewCity>) -> RepositoryResult<usize>;

    // ===== 仓库 =====

    async fn find_warehouses_by_ids(&self, ids: &[String]) -> RepositoryResult<Vec<Warehouse>>;

    async fn insert_warehouses(&self, warehouses: Vec<Warehouse>) -> RepositoryResult<usize>;

    async fn update_warehouses(&self, warehouses: Vec<Warehouse>) -> RepositoryResult<usize>;
}
