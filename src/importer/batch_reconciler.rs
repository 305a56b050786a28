// ==========================================
// 库存对账引擎 - 分批对账
// ==========================================
// 阶段: Reconciling(i/N)
// 职责: 每个分块内逐行（文件顺序）
//   1. 校验仓库引用
//   2. 校验供应商 / 分类引用（有值时）
//   3. 新商品 → 暂存创建（必填: 名称、单价、重量）
//   4. 已有库存 → 暂存更新（记录原数量）；否则暂存创建
//   5. 声明了供应商且关联不存在 → 暂存关联（整次导入去重）
// 红线: 行级问题只产生 RowError，不返回 Err
// ==========================================

use crate::domain::catalog::{Product, ProductSupplier, ProductWarehouseStock, StockKey};
use crate::domain::import::{FieldValue, ProductFeedRow, RowError, WarehouseFeedRow};
use crate::domain::warehouse::{CityKey, Warehouse};
use crate::importer::field_mapper::columns;
use crate::importer::field_normalizer::far_future_date;
use crate::importer::reference_resolver::{
    category_key, ProductResolutionContext, WarehouseResolutionContext,
};
use crate::repository::{CatalogRepository, RepositoryResult, WarehouseRepository};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;

/// 新建库存记录的默认状态
pub const DEFAULT_STOCK_STATUS: &str = "activo";

// ==========================================
// 商品管线暂存结果
// ==========================================

/// 暂存的库存更新（保留原数量用于计算流水变化量）
#[derive(Debug, Clone, PartialEq)]
pub struct StagedStockUpdate {
    pub stock: ProductWarehouseStock,
    pub previous_quantity: i64,
}

#[derive(Debug, Default)]
pub struct StagedBatch {
    pub products: Vec<Product>,
    pub stock_creates: Vec<ProductWarehouseStock>,
    pub stock_updates: Vec<StagedStockUpdate>,
    pub associations: Vec<ProductSupplier>,
    pub errors: Vec<RowError>,
}

/// 单个分块落库后的计数
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PersistedCounts {
    pub products_created: usize,
    pub stocks_created: usize,
    pub stocks_updated: usize,
    pub associations_created: usize,
}

// ==========================================
// 仓库管线暂存结果
// ==========================================

/// 仓库行的静态校验结果（经理开通之前）
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedWarehouseRow {
    pub row_number: usize,
    pub warehouse_id: String,
    pub name: String,
    pub city_id: Option<i64>,
    pub manager_email: Option<String>,
}

#[derive(Debug, Default)]
pub struct StagedWarehouseBatch {
    pub creates: Vec<Warehouse>,
    pub updates: Vec<Warehouse>,
}

// ==========================================
// BatchReconciler
// ==========================================
pub struct BatchReconciler;

impl BatchReconciler {
    // ===== 商品管线 =====

    /// 对一个分块逐行对账，暂存全部变更并同步更新上下文
    pub fn stage_products(
        ctx: &mut ProductResolutionContext,
        rows: &[ProductFeedRow],
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> StagedBatch {
        let mut batch = StagedBatch::default();
        for row in rows {
            if let Err(e) = Self::stage_product_row(ctx, row, today, now, &mut batch) {
                batch.errors.push(e);
            }
        }
        batch
    }

    fn stage_product_row(
        ctx: &mut ProductResolutionContext,
        row: &ProductFeedRow,
        today: NaiveDate,
        now: DateTime<Utc>,
        batch: &mut StagedBatch,
    ) -> Result<(), RowError> {
        let line = row.row_number;

        // 1. 仓库
        let warehouse_id = row.warehouse_id.as_deref().ok_or_else(|| {
            RowError::new(line, row.product_id.as_deref(), "缺少仓库编号")
        })?;
        if !ctx.warehouses.contains(warehouse_id) {
            return Err(RowError::new(
                line,
                Some(warehouse_id),
                format!("仓库 {} 不存在", warehouse_id),
            ));
        }

        let product_id = row
            .product_id
            .as_deref()
            .ok_or_else(|| RowError::new(line, None, "缺少商品编号"))?;

        // 2. 供应商 / 分类
        if let Some(supplier_id) = row.supplier_id.as_deref() {
            if !ctx.suppliers.contains(supplier_id) {
                return Err(RowError::new(
                    line,
                    Some(supplier_id),
                    format!("供应商 {} 无法解析", supplier_id),
                ));
            }
        }
        let category_id = match row.category.as_deref() {
            Some(name) => match ctx.categories.get(&category_key(name)) {
                Some(id) => Some(*id),
                None => {
                    return Err(RowError::new(
                        line,
                        Some(name),
                        format!("分类 {} 无法解析", name),
                    ))
                }
            },
            None => None,
        };

        // 3. 新商品（先校验必填，全部通过后再写上下文）
        let new_product = if ctx.products.contains(product_id) {
            None
        } else {
            Some(Self::build_product(row, product_id, category_id, now)?)
        };
        if let Some(product) = new_product {
            ctx.products.insert(product.id.clone());
            batch.products.push(product);
        }

        // 4. 库存
        let key = StockKey::new(product_id, warehouse_id);
        match ctx.stocks.get(&key) {
            Some(existing) => {
                let previous_quantity = existing.stock_quantity;
                let updated = ProductWarehouseStock {
                    id: existing.id,
                    product_id: key.product_id.clone(),
                    warehouse_id: key.warehouse_id.clone(),
                    stock_quantity: row.stock_quantity,
                    reorder_level: row.reorder_level,
                    last_restock: row.last_restock.unwrap_or(existing.last_restock),
                    expiration_date: row.expiration_date.unwrap_or(existing.expiration_date),
                    status: row.status.clone().unwrap_or_else(|| existing.status.clone()),
                };
                ctx.stocks.insert(key.clone(), updated.clone());
                batch.stock_updates.push(StagedStockUpdate {
                    stock: updated,
                    previous_quantity,
                });
            }
            None => {
                let created = ProductWarehouseStock {
                    id: None,
                    product_id: key.product_id.clone(),
                    warehouse_id: key.warehouse_id.clone(),
                    stock_quantity: row.stock_quantity,
                    reorder_level: row.reorder_level,
                    last_restock: row.last_restock.unwrap_or(today),
                    expiration_date: row.expiration_date.unwrap_or_else(far_future_date),
                    status: row
                        .status
                        .clone()
                        .unwrap_or_else(|| DEFAULT_STOCK_STATUS.to_string()),
                };
                ctx.stocks.insert(key.clone(), created.clone());
                batch.stock_creates.push(created);
            }
        }
        ctx.touched_stocks.insert(key);

        // 5. 商品-供应商关联
        if let Some(supplier_id) = row.supplier_id.as_deref() {
            let link = ProductSupplier {
                product_id: product_id.to_string(),
                supplier_id: supplier_id.to_string(),
            };
            if ctx.associations.insert(link.clone()) {
                batch.associations.push(link);
            }
        }

        Ok(())
    }

    fn build_product(
        row: &ProductFeedRow,
        product_id: &str,
        category_id: Option<i64>,
        now: DateTime<Utc>,
    ) -> Result<Product, RowError> {
        let line = row.row_number;
        let name = row.name.clone().ok_or_else(|| {
            RowError::new(
                line,
                Some(product_id),
                format!("新商品缺少必填字段 {}", columns::PRODUCT_NAME),
            )
        })?;
        let unit_price = required_decimal(&row.unit_price, columns::UNIT_PRICE, line, product_id)?;
        let weight_kg = required_decimal(&row.weight_kg, columns::WEIGHT_KG, line, product_id)?;

        Ok(Product {
            id: product_id.to_string(),
            name,
            description: row.description.clone(),
            category_id,
            sku: row.sku.clone(),
            barcode: row.barcode.clone(),
            unit_price,
            weight_kg,
            dimensions_cm: row.dimensions_cm.clone(),
            is_fragile: row.is_fragile,
            requires_refrigeration: row.requires_refrigeration,
            created_at: now,
        })
    }

    /// 分块落库: 商品 → 新库存 → 库存更新 → 关联
    ///
    /// 新库存写入后回读 id 并写回上下文，供流水引用
    pub async fn persist_products<R>(
        repo: &R,
        ctx: &mut ProductResolutionContext,
        batch: &StagedBatch,
    ) -> RepositoryResult<PersistedCounts>
    where
        R: CatalogRepository + ?Sized,
    {
        let mut counts = PersistedCounts::default();

        if !batch.products.is_empty() {
            counts.products_created = repo.create_products(batch.products.clone()).await?;
        }

        if !batch.stock_creates.is_empty() {
            repo.insert_stocks(batch.stock_creates.clone()).await?;
            counts.stocks_created = batch.stock_creates.len();

            let keys: Vec<StockKey> = batch.stock_creates.iter().map(|s| s.key()).collect();
            let persisted: HashMap<StockKey, Option<i64>> = repo
                .find_stocks_by_keys(&keys)
                .await?
                .into_iter()
                .map(|s| (s.key(), s.id))
                .collect();
            for (key, id) in persisted {
                if let Some(entry) = ctx.stocks.get_mut(&key) {
                    if entry.id.is_none() {
                        entry.id = id;
                    }
                }
            }
        }

        if !batch.stock_updates.is_empty() {
            let updates = batch.stock_updates.iter().map(|u| u.stock.clone()).collect();
            repo.update_stocks(updates).await?;
            counts.stocks_updated = batch.stock_updates.len();
        }

        if !batch.associations.is_empty() {
            counts.associations_created =
                repo.create_product_suppliers(batch.associations.clone()).await?;
        }

        Ok(counts)
    }

    // ===== 仓库管线 =====

    /// 仓库行静态校验（编号、名称、城市）
    ///
    /// 经理开通放在校验之后，避免为无效行开通账号
    pub fn validate_warehouse_row(
        ctx: &WarehouseResolutionContext,
        row: &WarehouseFeedRow,
    ) -> Result<ValidatedWarehouseRow, RowError> {
        let line = row.row_number;
        let warehouse_id = row
            .warehouse_id
            .clone()
            .ok_or_else(|| RowError::new(line, None, "缺少仓库编号"))?;
        let existing = ctx.warehouses.get(&warehouse_id);

        let name = match (&row.name, existing) {
            (Some(name), _) => name.clone(),
            (None, Some(w)) => w.name.clone(),
            (None, None) => {
                return Err(RowError::new(
                    line,
                    Some(warehouse_id.as_str()),
                    format!("新仓库缺少必填字段 {}", columns::WAREHOUSE_NAME),
                ))
            }
        };

        let city_id = match (&row.city, &row.state) {
            (Some(city), Some(state)) => match ctx.cities.get(&CityKey::new(city, state)) {
                Some(id) => Some(*id),
                None => {
                    return Err(RowError::new(
                        line,
                        Some(warehouse_id.as_str()),
                        format!("城市 {} / {} 无法解析", city, state),
                    ))
                }
            },
            (None, None) => existing.and_then(|w| w.city_id),
            (Some(_), None) | (None, Some(_)) => {
                return Err(RowError::new(
                    line,
                    Some(warehouse_id.as_str()),
                    format!(
                        "{} 与 {} 须同时填写",
                        columns::CITY,
                        columns::STATE
                    ),
                ))
            }
        };

        Ok(ValidatedWarehouseRow {
            row_number: line,
            warehouse_id,
            name,
            city_id,
            manager_email: row.email.clone(),
        })
    }

    /// 暂存仓库创建/更新并同步更新上下文
    ///
    /// manager_id 为 None 时更新保留原经理
    pub fn stage_warehouse(
        ctx: &mut WarehouseResolutionContext,
        batch: &mut StagedWarehouseBatch,
        row: &WarehouseFeedRow,
        validated: ValidatedWarehouseRow,
        manager_id: Option<String>,
        now: DateTime<Utc>,
    ) {
        match ctx.warehouses.get(&validated.warehouse_id) {
            Some(existing) => {
                let updated = Warehouse {
                    id: validated.warehouse_id.clone(),
                    name: validated.name,
                    city_id: validated.city_id,
                    address: row.address.clone().or_else(|| existing.address.clone()),
                    postal_code: row.postal_code.clone().or_else(|| existing.postal_code.clone()),
                    latitude: row.latitude.or(existing.latitude),
                    longitude: row.longitude.or(existing.longitude),
                    capacity_m2: row.capacity_m2.or(existing.capacity_m2),
                    status: row.status.clone().or_else(|| existing.status.clone()),
                    manager_id: manager_id.or_else(|| existing.manager_id.clone()),
                    phone: row.phone.clone().or_else(|| existing.phone.clone()),
                    updated_at: now,
                };
                ctx.warehouses.insert(updated.id.clone(), updated.clone());
                batch.updates.push(updated);
            }
            None => {
                let created = Warehouse {
                    id: validated.warehouse_id.clone(),
                    name: validated.name,
                    city_id: validated.city_id,
                    address: row.address.clone(),
                    postal_code: row.postal_code.clone(),
                    latitude: row.latitude,
                    longitude: row.longitude,
                    capacity_m2: row.capacity_m2,
                    status: row.status.clone(),
                    manager_id,
                    phone: row.phone.clone(),
                    updated_at: now,
                };
                ctx.warehouses.insert(created.id.clone(), created.clone());
                batch.creates.push(created);
            }
        }
    }

    /// 仓库分块落库: 先创建后更新（同一分块内先建后改的行依赖此顺序）
    ///
    /// # 返回
    /// - (创建数, 更新数)
    pub async fn persist_warehouses<R>(
        repo: &R,
        batch: StagedWarehouseBatch,
    ) -> RepositoryResult<(usize, usize)>
    where
        R: WarehouseRepository + ?Sized,
    {
        let mut created = 0;
        let mut updated = 0;
        if !batch.creates.is_empty() {
            created = repo.insert_warehouses(batch.creates).await?;
        }
        if !batch.updates.is_empty() {
            updated = batch.updates.len();
            repo.update_warehouses(batch.updates).await?;
        }
        Ok((created, updated))
    }
}

fn required_decimal(
    value: &FieldValue<Decimal>,
    column: &str,
    line: usize,
    product_id: &str,
) -> Result<Decimal, RowError> {
    match value {
        FieldValue::Value(v) => Ok(*v),
        FieldValue::Missing => Err(RowError::new(
            line,
            Some(product_id),
            format!("新商品缺少必填字段 {}", column),
        )),
        FieldValue::Invalid(raw) => Err(RowError::new(
            line,
            Some(product_id),
            format!("字段 {} 不是有效数值: {}", column, raw),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 20).unwrap()
    }

    fn feed_row(line: usize, product: &str, warehouse: &str, qty: i64, reorder: i64) -> ProductFeedRow {
        ProductFeedRow {
            row_number: line,
            product_id: Some(product.to_string()),
            warehouse_id: Some(warehouse.to_string()),
            supplier_id: None,
            category: None,
            name: Some(format!("Producto {}", product)),
            description: None,
            sku: None,
            barcode: None,
            unit_price: FieldValue::Value(Decimal::from_str("10.5").unwrap()),
            weight_kg: FieldValue::Value(Decimal::ONE),
            dimensions_cm: None,
            is_fragile: false,
            requires_refrigeration: false,
            stock_quantity: qty,
            reorder_level: reorder,
            last_restock: None,
            expiration_date: None,
            status: None,
        }
    }

    fn context() -> ProductResolutionContext {
        let mut ctx = ProductResolutionContext::default();
        ctx.warehouses.insert("W1".to_string());
        ctx.suppliers.insert("S1".to_string());
        ctx.categories.insert("lácteos".to_string(), 4);
        ctx
    }

    fn existing_stock(qty: i64) -> ProductWarehouseStock {
        ProductWarehouseStock {
            id: Some(11),
            product_id: "P1".to_string(),
            warehouse_id: "W1".to_string(),
            stock_quantity: qty,
            reorder_level: 10,
            last_restock: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            expiration_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            status: "activo".to_string(),
        }
    }

    #[test]
    fn test_unknown_warehouse_is_row_error() {
        let mut ctx = context();
        let batch = BatchReconciler::stage_products(
            &mut ctx,
            &[feed_row(1, "P1", "WH-X", 5, 0)],
            today(),
            Utc::now(),
        );
        assert!(batch.products.is_empty());
        assert!(batch.stock_creates.is_empty());
        assert_eq!(batch.errors.len(), 1);
        assert_eq!(batch.errors[0].reference.as_deref(), Some("WH-X"));
        assert!(ctx.touched_stocks.is_empty());
    }

    #[test]
    fn test_new_product_and_stock_creation_defaults() {
        let mut ctx = context();
        let batch = BatchReconciler::stage_products(
            &mut ctx,
            &[feed_row(1, "P1", "W1", 30, 5)],
            today(),
            Utc::now(),
        );
        assert_eq!(batch.products.len(), 1);
        assert_eq!(batch.stock_creates.len(), 1);
        let stock = &batch.stock_creates[0];
        assert_eq!(stock.last_restock, today());
        assert_eq!(stock.expiration_date, far_future_date());
        assert_eq!(stock.status, DEFAULT_STOCK_STATUS);
        assert!(ctx.products.contains("P1"));
    }

    #[test]
    fn test_repeated_product_is_created_once() {
        let mut ctx = context();
        ctx.warehouses.insert("W2".to_string());
        let batch = BatchReconciler::stage_products(
            &mut ctx,
            &[feed_row(1, "P1", "W1", 3, 0), feed_row(2, "P1", "W2", 4, 0)],
            today(),
            Utc::now(),
        );
        assert_eq!(batch.products.len(), 1);
        assert_eq!(batch.stock_creates.len(), 2);
    }

    #[test]
    fn test_existing_stock_is_updated_with_previous_quantity() {
        let mut ctx = context();
        ctx.products.insert("P1".to_string());
        ctx.stocks.insert(StockKey::new("P1", "W1"), existing_stock(50));

        let batch = BatchReconciler::stage_products(
            &mut ctx,
            &[feed_row(1, "P1", "W1", 3, 10)],
            today(),
            Utc::now(),
        );
        assert!(batch.products.is_empty());
        assert_eq!(batch.stock_updates.len(), 1);
        let update = &batch.stock_updates[0];
        assert_eq!(update.previous_quantity, 50);
        assert_eq!(update.stock.stock_quantity, 3);
        // 源文件未给出的日期/状态沿用原值
        assert_eq!(update.stock.expiration_date, NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        assert_eq!(update.stock.id, Some(11));
    }

    #[test]
    fn test_missing_required_fields_skip_row_without_side_effects() {
        let mut ctx = context();
        let mut row = feed_row(4, "P9", "W1", 1, 0);
        row.unit_price = FieldValue::Invalid("abc".to_string());
        let mut no_name = feed_row(5, "P8", "W1", 1, 0);
        no_name.name = None;

        let batch =
            BatchReconciler::stage_products(&mut ctx, &[row, no_name], today(), Utc::now());
        assert_eq!(batch.errors.len(), 2);
        assert!(batch.errors[0].message.contains("precio_unitario"));
        assert!(batch.errors[1].message.contains("nombre_producto"));
        assert!(batch.stock_creates.is_empty());
        assert!(!ctx.products.contains("P9"));
    }

    #[test]
    fn test_unresolved_supplier_and_category() {
        let mut ctx = context();
        let mut bad_supplier = feed_row(1, "P1", "W1", 1, 0);
        bad_supplier.supplier_id = Some("S-404".to_string());
        let mut bad_category = feed_row(2, "P2", "W1", 1, 0);
        bad_category.category = Some("Desconocida".to_string());

        let batch = BatchReconciler::stage_products(
            &mut ctx,
            &[bad_supplier, bad_category],
            today(),
            Utc::now(),
        );
        assert_eq!(batch.errors.len(), 2);
        assert_eq!(batch.errors[0].reference.as_deref(), Some("S-404"));
        assert_eq!(batch.errors[1].reference.as_deref(), Some("Desconocida"));
    }

    #[test]
    fn test_association_staged_once_across_batches() {
        let mut ctx = context();
        let mut first = feed_row(1, "P1", "W1", 1, 0);
        first.supplier_id = Some("S1".to_string());
        first.category = Some(" LÁCTEOS".to_string());
        let second = ProductFeedRow {
            row_number: 2,
            ..first.clone()
        };

        let b1 = BatchReconciler::stage_products(&mut ctx, &[first], today(), Utc::now());
        let b2 = BatchReconciler::stage_products(&mut ctx, &[second], today(), Utc::now());
        assert_eq!(b1.associations.len(), 1);
        assert_eq!(b1.products[0].category_id, Some(4));
        assert!(b2.associations.is_empty());
        assert_eq!(b2.stock_updates.len(), 1);
    }

    #[test]
    fn test_warehouse_validation() {
        let mut ctx = WarehouseResolutionContext::default();
        ctx.cities.insert(CityKey::new("Medellín", "Antioquia"), 3);

        let row = WarehouseFeedRow {
            row_number: 1,
            warehouse_id: Some("WH-1".to_string()),
            name: Some("Bodega Norte".to_string()),
            city: Some("MEDELLÍN".to_string()),
            state: Some("antioquia".to_string()),
            address: None,
            postal_code: None,
            latitude: None,
            longitude: None,
            capacity_m2: None,
            status: None,
            manager_name: None,
            email: None,
            phone: None,
        };
        let ok = BatchReconciler::validate_warehouse_row(&ctx, &row).unwrap();
        assert_eq!(ok.city_id, Some(3));

        let unknown_city = WarehouseFeedRow {
            city: Some("Cali".to_string()),
            ..row.clone()
        };
        assert!(BatchReconciler::validate_warehouse_row(&ctx, &unknown_city).is_err());

        let city_only = WarehouseFeedRow {
            state: None,
            ..row.clone()
        };
        let err = BatchReconciler::validate_warehouse_row(&ctx, &city_only).unwrap_err();
        assert!(err.message.contains("departamento"));

        ctx.warehouses.insert(
            "WH-1".to_string(),
            Warehouse {
                id: "WH-1".to_string(),
                name: "Bodega Norte".to_string(),
                city_id: Some(3),
                address: None,
                postal_code: None,
                latitude: None,
                longitude: None,
                capacity_m2: None,
                status: None,
                manager_id: None,
                phone: None,
                updated_at: Utc::now(),
            },
        );
        let no_city = WarehouseFeedRow {
            city: None,
            state: None,
            ..row.clone()
        };
        let kept = BatchReconciler::validate_warehouse_row(&ctx, &no_city).unwrap();
        assert_eq!(kept.city_id, Some(3));
        ctx.warehouses.clear();

        let nameless = WarehouseFeedRow {
            name: None,
            ..row
        };
        let err = BatchReconciler::validate_warehouse_row(&ctx, &nameless).unwrap_err();
        assert_eq!(err.reference.as_deref(), Some("WH-1"));
    }
}
