// ==========================================
// 库存对账引擎 - 商品目录 Repository Trait
// ==========================================
// 职责: 定义商品库存导入所需的数据访问端口（不包含业务逻辑）
// 红线: Repository 不含业务规则，只做批量查询/写入
// 约定:
// - find_*: 按自然键批量查询
// - create_*: 批量插入，重复键忽略（INSERT OR IGNORE），返回实际插入行数
// - update_*: 按键批量更新
// - 每次批量写入在单个事务内完成；不同调用之间不共享事务
// ==========================================

use crate::domain::catalog::{
    Category, NewCategory, Product, ProductSupplier, ProductWarehouseStock, StockKey,
    StockMovement, Supplier,
};
use crate::repository::error::RepositoryResult;
use async_trait::async_trait;

// ==========================================
// CatalogRepository Trait
// ==========================================
// 实现者: SqliteCatalogRepository（使用 rusqlite）
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    // ===== 供应商 =====

    async fn find_suppliers_by_ids(&self, ids: &[String]) -> RepositoryResult<Vec<Supplier>>;

    async fn create_suppliers(&self, suppliers: Vec<Supplier>) -> RepositoryResult<usize>;

    // ===== 分类 =====

    /// 按 name_key（TRIM + 小写）查询分类
    async fn find_categories_by_keys(&self, keys: &[String]) -> RepositoryResult<Vec<Category>>;

    async fn create_categories(&self, categories: Vec<NewCategory>) -> RepositoryResult<usize>;

    // ===== 仓库（只读）=====

    /// 返回已存在的仓库 id
    async fn find_warehouse_ids(&self, ids: &[String]) -> RepositoryResult<Vec<String>>;

    // ===== 商品 =====

    /// 返回已存在的商品 id
    async fn find_product_ids(&self, ids: &[String]) -> RepositoryResult<Vec<String>>;

    async fn create_products(&self, products: Vec<Product>) -> RepositoryResult<usize>;

    // ===== 商品-供应商关联 =====

    async fn find_product_suppliers(
        &self,
        product_ids: &[String],
    ) -> RepositoryResult<Vec<ProductSupplier>>;

    async fn create_product_suppliers(
        &self,
        links: Vec<ProductSupplier>,
    ) -> RepositoryResult<usize>;

    // ===== 库存 =====

    /// 查询指定商品在所有仓库的库存记录
    async fn find_stocks_by_products(
        &self,
        product_ids: &[String],
    ) -> RepositoryResult<Vec<ProductWarehouseStock>>;

    /// 按 (product_id, warehouse_id) 查询库存记录（用于回读生成的 id）
    async fn find_stocks_by_keys(
        &self,
        keys: &[StockKey],
    ) -> RepositoryResult<Vec<ProductWarehouseStock>>;

    async fn insert_stocks(&self, stocks: Vec<ProductWarehouseStock>) -> RepositoryResult<usize>;

    /// 按 (product_id, warehouse_id) 更新数量/补货点/日期/状态
    async fn update_stocks(&self, stocks: Vec<ProductWarehouseStock>) -> RepositoryResult<usize>;

    // ===== 库存流水（仅追加）=====

    async fn insert_movements(&self, movements: Vec<StockMovement>) -> RepositoryResult<usize>;
}
