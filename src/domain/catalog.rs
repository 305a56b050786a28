// ==========================================
// 库存对账引擎 - 商品目录领域模型
// ==========================================
// 对齐: schema product / supplier / category /
//       product_warehouse_stock / stock_movement 表
// ==========================================

use crate::domain::types::MovementType;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ==========================================
// Supplier - 供应商
// ==========================================
// 自然键: 文件中显式给出的 id_proveedor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Supplier {
    pub id: String,
    pub name: String,
}

// ==========================================
// Category - 商品分类
// ==========================================
// 自然键: 名称 TRIM + 小写（name_key）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub name_key: String,
}

/// 待创建的分类（id 由数据库生成）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCategory {
    pub name: String,
    pub name_key: String,
}

// ==========================================
// Product - 商品主数据
// ==========================================
// 主键: 业务 id（id_producto），只创建一次
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub category_id: Option<i64>,
    pub sku: Option<String>,
    pub barcode: Option<String>,
    pub unit_price: Decimal,
    pub weight_kg: Decimal,
    pub dimensions_cm: Option<String>,
    pub is_fragile: bool,
    pub requires_refrigeration: bool,
    pub created_at: DateTime<Utc>,
}

// ==========================================
// ProductSupplier - 商品-供应商关联
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProductSupplier {
    pub product_id: String,
    pub supplier_id: String,
}

// ==========================================
// ProductWarehouseStock - 商品仓库库存
// ==========================================
// 不变式: (product_id, warehouse_id) 至多一条记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductWarehouseStock {
    pub id: Option<i64>, // 入库后由数据库生成
    pub product_id: String,
    pub warehouse_id: String,
    pub stock_quantity: i64,
    pub reorder_level: i64,
    pub last_restock: NaiveDate,
    pub expiration_date: NaiveDate,
    pub status: String,
}

impl ProductWarehouseStock {
    pub fn key(&self) -> StockKey {
        StockKey::new(&self.product_id, &self.warehouse_id)
    }

    /// 是否满足低库存条件（reorder_level 为 0 表示不监控）
    pub fn is_low_stock(&self) -> bool {
        self.reorder_level != 0 && self.stock_quantity <= self.reorder_level
    }
}

/// 库存记录复合键 (product_id, warehouse_id)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StockKey {
    pub product_id: String,
    pub warehouse_id: String,
}

impl StockKey {
    pub fn new(product_id: &str, warehouse_id: &str) -> Self {
        Self {
            product_id: product_id.to_string(),
            warehouse_id: warehouse_id.to_string(),
        }
    }
}

// ==========================================
// StockMovement - 库存流水（仅追加）
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockMovement {
    pub id: String,
    pub stock_id: i64,
    pub product_id: String,
    pub warehouse_id: String,
    pub movement_type: MovementType,
    pub quantity: i64,        // 变化量（UPDATE 可为负）
    pub resulting_stock: i64, // 变更后库存
    pub note: String,
    pub created_at: DateTime<Utc>,
}

// ==========================================
// LowStockAlert - 低库存告警（仅内存）
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LowStockAlert {
    pub product_id: String,
    pub warehouse_id: String,
    pub stock_quantity: i64,
    pub reorder_level: i64,
}
