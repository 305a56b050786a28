// ==========================================
// 库存对账引擎 - 领域层
// ==========================================
// 职责: 实体、值对象、导入汇总
// 红线: 领域层不依赖数据库与外部服务
// ==========================================

pub mod catalog;
pub mod import;
pub mod types;
pub mod warehouse;

// 重导出核心类型
pub use catalog::{
    Category, LowStockAlert, NewCategory, Product, ProductSupplier, ProductWarehouseStock,
    StockKey, StockMovement, Supplier,
};
pub use import::{
    FieldValue, ImportRow, ProductFeedRow, ProductImportSummary, RowError, WarehouseFeedRow,
    WarehouseImportSummary,
};
pub use types::{FileFormat, ImportStage, MovementType};
pub use warehouse::{City, CityKey, ManagerUser, NewCity, NewUser, Warehouse};
