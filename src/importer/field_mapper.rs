// ==========================================
// 库存对账引擎 - 字段映射器实现
// ==========================================
// 职责: 源列名 → 强类型字段（借助 FieldNormalizer）
// ==========================================

use crate::domain::import::{ImportRow, ProductFeedRow, WarehouseFeedRow};
use crate::importer::field_normalizer::FieldNormalizer;
use crate::importer::importer_trait::FieldMapper as FieldMapperTrait;

// ==========================================
// 源文件列名
// ==========================================
pub mod columns {
    // ===== 商品库存文件 =====
    pub const PRODUCT_ID: &str = "id_producto";
    pub const WAREHOUSE_ID: &str = "id_almacen";
    pub const SUPPLIER_ID: &str = "id_proveedor";
    pub const CATEGORY: &str = "categoria";
    pub const PRODUCT_NAME: &str = "nombre_producto";
    pub const DESCRIPTION: &str = "descripcion";
    pub const SKU: &str = "sku";
    pub const BARCODE: &str = "codigo_barras";
    pub const UNIT_PRICE: &str = "precio_unitario";
    pub const WEIGHT_KG: &str = "peso_kg";
    pub const DIMENSIONS_CM: &str = "dimensiones_cm";
    pub const IS_FRAGILE: &str = "es_fragil";
    pub const REQUIRES_REFRIGERATION: &str = "requiere_refrigeracion";
    pub const STOCK_QUANTITY: &str = "cantidad_stock";
    pub const REORDER_LEVEL: &str = "nivel_reorden";
    pub const LAST_RESTOCK: &str = "ultima_reposicion";
    pub const EXPIRATION_DATE: &str = "fecha_vencimiento";
    pub const STATUS: &str = "estado";

    // ===== 仓库文件 =====
    pub const WAREHOUSE_NAME: &str = "nombre_almacen";
    pub const CITY: &str = "ciudad";
    pub const STATE: &str = "departamento";
    pub const ADDRESS: &str = "direccion";
    pub const POSTAL_CODE: &str = "codigo_postal";
    pub const LATITUDE: &str = "latitud";
    pub const LONGITUDE: &str = "longitud";
    pub const CAPACITY_M2: &str = "capacidad_m2";
    pub const MANAGER: &str = "gerente";
    pub const EMAIL: &str = "email";
    pub const PHONE: &str = "telefono";
}

pub struct FieldMapperImpl {
    normalizer: FieldNormalizer,
}

impl FieldMapperImpl {
    pub fn new() -> Self {
        Self {
            normalizer: FieldNormalizer,
        }
    }

    /// 提取字符串字段（空白 → None）
    fn get_string(&self, row: &ImportRow, key: &str) -> Option<String> {
        self.normalizer.normalize_null(row.get(key))
    }
}

impl Default for FieldMapperImpl {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldMapperTrait for FieldMapperImpl {
    fn map_product_row(&self, row: &ImportRow) -> ProductFeedRow {
        let n = &self.normalizer;
        ProductFeedRow {
            row_number: row.row_number,

            // 引用
            product_id: self.get_string(row, columns::PRODUCT_ID),
            warehouse_id: self.get_string(row, columns::WAREHOUSE_ID),
            supplier_id: self.get_string(row, columns::SUPPLIER_ID),
            category: self.get_string(row, columns::CATEGORY),

            // 商品属性
            name: self.get_string(row, columns::PRODUCT_NAME),
            description: self.get_string(row, columns::DESCRIPTION),
            sku: self.get_string(row, columns::SKU),
            barcode: self.get_string(row, columns::BARCODE),
            unit_price: n.parse_required_decimal(row.get(columns::UNIT_PRICE)),
            weight_kg: n.parse_required_decimal(row.get(columns::WEIGHT_KG)),
            dimensions_cm: self.get_string(row, columns::DIMENSIONS_CM),
            is_fragile: n.parse_bool(row.get(columns::IS_FRAGILE)),
            requires_refrigeration: n.parse_bool(row.get(columns::REQUIRES_REFRIGERATION)),

            // 库存属性
            stock_quantity: n.parse_integer(row.get(columns::STOCK_QUANTITY)),
            reorder_level: n.parse_integer(row.get(columns::REORDER_LEVEL)),
            last_restock: n.parse_date(row.get(columns::LAST_RESTOCK)),
            expiration_date: n.parse_date(row.get(columns::EXPIRATION_DATE)),
            status: self.get_string(row, columns::STATUS),
        }
    }

    fn map_warehouse_row(&self, row: &ImportRow) -> WarehouseFeedRow {
        let n = &self.normalizer;
        WarehouseFeedRow {
            row_number: row.row_number,
            warehouse_id: self.get_string(row, columns::WAREHOUSE_ID),
            name: self.get_string(row, columns::WAREHOUSE_NAME),
            city: self.get_string(row, columns::CITY),
            state: self.get_string(row, columns::STATE),
            address: self.get_string(row, columns::ADDRESS),
            postal_code: self.get_string(row, columns::POSTAL_CODE),
            latitude: n.parse_optional_f64(row.get(columns::LATITUDE)),
            longitude: n.parse_optional_f64(row.get(columns::LONGITUDE)),
            capacity_m2: n.parse_optional_f64(row.get(columns::CAPACITY_M2)),
            status: self.get_string(row, columns::STATUS),
            manager_name: self.get_string(row, columns::MANAGER),
            // 邮箱作为身份服务查询键，统一小写
            email: self.get_string(row, columns::EMAIL).map(|e| e.to_lowercase()),
            phone: self.get_string(row, columns::PHONE),
        }
    }
}
