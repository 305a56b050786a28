// ==========================================
// 库存对账引擎 - 导入层
// ==========================================
// 职责: 外部数据文件 → 对账 → 落库 → 流水/告警/账号开通
// 支持: CSV（';' 分隔）, Excel（第一个工作表）
// ==========================================

// 模块声明
pub mod alert_dispatcher;
pub mod batch_reconciler;
pub mod error;
pub mod field_mapper;
pub mod field_normalizer;
pub mod file_parser;
pub mod importer_trait;
pub mod ledger_recorder;
pub mod product_importer_impl;
pub mod reference_resolver;
pub mod user_provisioner;
pub mod warehouse_importer_impl;

// 重导出核心类型
pub use alert_dispatcher::AlertDispatcher;
pub use batch_reconciler::BatchReconciler;
pub use error::{ImportError, ImportResult};
pub use field_mapper::FieldMapperImpl;
pub use field_normalizer::FieldNormalizer;
pub use file_parser::{CsvParser, ExcelParser, UniversalFileParser};
pub use ledger_recorder::{LedgerPolicy, LedgerRecorder};
pub use product_importer_impl::ProductImporterImpl;
pub use reference_resolver::{ProductResolutionContext, ReferenceResolver, WarehouseResolutionContext};
pub use user_provisioner::{ProvisionOutcome, UserProvisioner};
pub use warehouse_importer_impl::WarehouseImporterImpl;

// 重导出 Trait 接口
pub use importer_trait::{FieldMapper, FileParser, ProductImporter, WarehouseImporter};
