// ==========================================
// 库存对账引擎 - 导入 Trait
// ==========================================
// 职责: 定义导入管线各阶段接口（不包含实现）
// ==========================================

use crate::domain::import::{
    ImportRow, ProductFeedRow, ProductImportSummary, WarehouseFeedRow, WarehouseImportSummary,
};
use crate::importer::error::ImportResult;
use async_trait::async_trait;
use std::path::Path;

// ==========================================
// ProductImporter Trait
// ==========================================
// 用途: 商品库存导入主接口
// 实现者: ProductImporterImpl
#[async_trait]
pub trait ProductImporter: Send + Sync {
    /// 导入商品库存文件
    ///
    /// # 参数
    /// - file_path: 文件路径
    /// - declared_extension: 声明的扩展名（csv/xlsx/xls）
    ///
    /// # 返回
    /// - Ok(ProductImportSummary): 汇总（含行级错误明细）
    /// - Err: 格式错误 / 持久化错误（致命）
    ///
    /// # 导入流程
    /// 1. 文件读取与解析
    /// 2. 字段规范化
    /// 3. 引用解析（供应商/分类/仓库/商品/库存缓存）
    /// 4. 分批对账并落库
    /// 5. 库存流水落库
    /// 6. 低库存告警（尽力而为）
    async fn import_file(
        &self,
        file_path: &Path,
        declared_extension: &str,
    ) -> ImportResult<ProductImportSummary>;
}

// ==========================================
// WarehouseImporter Trait
// ==========================================
// 用途: 仓库导入主接口（城市解析 + 经理账号开通 + 仓库 upsert）
// 实现者: WarehouseImporterImpl
#[async_trait]
pub trait WarehouseImporter: Send + Sync {
    async fn import_file(
        &self,
        file_path: &Path,
        declared_extension: &str,
    ) -> ImportResult<WarehouseImportSummary>;
}

// ==========================================
// FileParser Trait
// ==========================================
// 用途: 文件解析接口（阶段 0）
// 实现者: CsvParser, ExcelParser
pub trait FileParser: Send + Sync {
    /// 解析文件为原始行记录
    ///
    /// # 返回
    /// - Ok(Vec<ImportRow>): 行记录列表（已跳过空白行）
    /// - Err: 文件读取错误、格式错误
    fn parse_to_rows(&self, file_path: &Path) -> ImportResult<Vec<ImportRow>>;
}

// ==========================================
// FieldMapper Trait
// ==========================================
// 用途: 字段映射接口（阶段 1），映射本身不失败，
//       必填校验在对账阶段按行报错
// 实现者: FieldMapperImpl
pub trait FieldMapper: Send + Sync {
    fn map_product_row(&self, row: &ImportRow) -> ProductFeedRow;

    fn map_warehouse_row(&self, row: &ImportRow) -> WarehouseFeedRow;
}
