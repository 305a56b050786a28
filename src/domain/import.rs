// ==========================================
// 库存对账引擎 - 导入领域模型
// ==========================================
// 职责: 原始行、映射后的强类型行、行级错误、导入汇总
// ==========================================

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;

// ==========================================
// ImportRow - 原始行记录
// ==========================================
// 一行源数据一条，值在规范化前均为字符串
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ImportRow {
    pub row_number: usize, // 数据行号（从 1 开始，不含表头）
    pub values: HashMap<String, String>,
}

impl ImportRow {
    pub fn new(row_number: usize, values: HashMap<String, String>) -> Self {
        Self { row_number, values }
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.values.get(column).map(String::as_str)
    }

    /// 所有值均为空白
    pub fn is_blank(&self) -> bool {
        self.values.values().all(|v| v.trim().is_empty())
    }
}

// ==========================================
// FieldValue - 必填数值字段的解析结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue<T> {
    Missing,         // 空值
    Invalid(String), // 有值但无法解析（保留原文便于报错）
    Value(T),
}

impl<T> FieldValue<T> {
    pub fn value(self) -> Option<T> {
        match self {
            FieldValue::Value(v) => Some(v),
            _ => None,
        }
    }
}

// ==========================================
// ProductFeedRow - 商品库存文件映射结果
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct ProductFeedRow {
    pub row_number: usize,

    // 引用
    pub product_id: Option<String>,
    pub warehouse_id: Option<String>,
    pub supplier_id: Option<String>,
    pub category: Option<String>,

    // 商品属性
    pub name: Option<String>,
    pub description: Option<String>,
    pub sku: Option<String>,
    pub barcode: Option<String>,
    pub unit_price: FieldValue<Decimal>,
    pub weight_kg: FieldValue<Decimal>,
    pub dimensions_cm: Option<String>,
    pub is_fragile: bool,
    pub requires_refrigeration: bool,

    // 库存属性（数量缺失/非法时为 0）
    pub stock_quantity: i64,
    pub reorder_level: i64,
    pub last_restock: Option<NaiveDate>,
    pub expiration_date: Option<NaiveDate>,
    pub status: Option<String>,
}

// ==========================================
// WarehouseFeedRow - 仓库文件映射结果
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct WarehouseFeedRow {
    pub row_number: usize,
    pub warehouse_id: Option<String>,
    pub name: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub address: Option<String>,
    pub postal_code: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub capacity_m2: Option<f64>,
    pub status: Option<String>,
    pub manager_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

// ==========================================
// RowError - 行级错误
// ==========================================
// 只使当前行失效，不中断批次或整次导入
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowError {
    pub row: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    pub message: String,
}

impl RowError {
    pub fn new(row: usize, reference: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            row,
            reference: reference.map(str::to_string),
            message: message.into(),
        }
    }
}

// ==========================================
// ProductImportSummary - 商品库存导入汇总
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductImportSummary {
    pub run_id: String,
    pub total_rows: usize,
    pub products_created: usize,
    pub stocks_created: usize,
    pub stocks_updated: usize,
    pub suppliers_created: usize,
    pub categories_created: usize,
    pub associations_created: usize,
    pub movements_recorded: usize,
    pub low_stock_alerts: usize,
    pub alerts_notified: bool,
    pub errors: usize,
    pub error_details: Vec<RowError>,
    pub elapsed_ms: u64,
}

// ==========================================
// WarehouseImportSummary - 仓库导入汇总
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WarehouseImportSummary {
    pub run_id: String,
    pub total_rows: usize,
    pub warehouses_created: usize,
    pub warehouses_updated: usize,
    pub cities_created: usize,
    pub managers_created: usize,
    pub managers_reused: usize,
    pub errors: usize,
    pub error_details: Vec<RowError>,
    pub elapsed_ms: u64,
}
