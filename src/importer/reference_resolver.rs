// ==========================================
// 库存对账引擎 - 引用解析
// ==========================================
// 阶段: ResolvingReferences
// 职责: 自然键 → 已持久化实体
// 流程: 收集全部行中出现的自然键（去重）
//       → 每类实体一次批量查询
//       → 未命中的一次批量创建（重复键忽略）
//       → 回读获取生成的 id，并入解析上下文
// 保证: 本阶段结束后，可解析的键在整次导入期间都有稳定 id；
//       不可解析的键（如未声明的仓库）保持缺失，引用它的行按行报错
// ==========================================

use crate::domain::catalog::{
    NewCategory, ProductSupplier, ProductWarehouseStock, StockKey, Supplier,
};
use crate::domain::import::{ProductFeedRow, WarehouseFeedRow};
use crate::domain::warehouse::{CityKey, NewCity, Warehouse};
use crate::repository::{CatalogRepository, RepositoryResult, WarehouseRepository};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use tracing::debug;

/// 分类自然键: TRIM + 小写
pub fn category_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// 自动创建供应商时使用的名称（源文件只给出供应商编号）
pub fn placeholder_supplier_name(id: &str) -> String {
    format!("Proveedor {}", id)
}

// ==========================================
// ProductResolutionContext - 商品管线解析上下文
// ==========================================
// 整次导入只有这一份可变缓存，按阶段显式传递
#[derive(Debug, Default)]
pub struct ProductResolutionContext {
    /// 已存在的供应商 id
    pub suppliers: HashSet<String>,
    /// 分类 name_key → id
    pub categories: HashMap<String, i64>,
    /// 已存在的仓库 id（商品管线从不创建仓库）
    pub warehouses: HashSet<String>,
    /// 已存在或本次已暂存创建的商品 id
    pub products: HashSet<String>,
    /// (product, warehouse) → 当前库存状态（含本次暂存的变更）
    pub stocks: HashMap<StockKey, ProductWarehouseStock>,
    /// 已存在或本次已暂存的商品-供应商关联
    pub associations: HashSet<ProductSupplier>,
    /// 本次导入对账过的库存键（告警评估范围）
    pub touched_stocks: BTreeSet<StockKey>,

    pub suppliers_created: usize,
    pub categories_created: usize,
}

// ==========================================
// WarehouseResolutionContext - 仓库管线解析上下文
// ==========================================
#[derive(Debug, Default)]
pub struct WarehouseResolutionContext {
    /// 城市自然键 → id
    pub cities: HashMap<CityKey, i64>,
    /// 仓库 id → 当前状态（含本次暂存的变更）
    pub warehouses: HashMap<String, Warehouse>,
    /// 经理邮箱 → 身份服务用户 id（本次导入内缓存）
    pub managers: HashMap<String, String>,

    pub cities_created: usize,
}

// ==========================================
// ReferenceResolver
// ==========================================
pub struct ReferenceResolver;

impl ReferenceResolver {
    /// 解析商品管线的全部引用
    ///
    /// # 预加载
    /// - 供应商 / 分类（缺失则批量创建）
    /// - 仓库（只读）
    /// - 商品 / 库存 / 商品-供应商关联（按文件中出现的商品 id）
    pub async fn resolve_catalog<R>(
        repo: &R,
        rows: &[ProductFeedRow],
    ) -> RepositoryResult<ProductResolutionContext>
    where
        R: CatalogRepository + ?Sized,
    {
        let mut ctx = ProductResolutionContext::default();

        // ===== 收集自然键 =====
        let mut supplier_ids = BTreeSet::new();
        let mut category_names: BTreeMap<String, String> = BTreeMap::new();
        let mut warehouse_ids = BTreeSet::new();
        let mut product_ids = BTreeSet::new();

        for row in rows {
            if let Some(id) = &row.supplier_id {
                supplier_ids.insert(id.clone());
            }
            if let Some(name) = &row.category {
                // 同一 key 保留首次出现时的写法
                category_names
                    .entry(category_key(name))
                    .or_insert_with(|| name.trim().to_string());
            }
            if let Some(id) = &row.warehouse_id {
                warehouse_ids.insert(id.clone());
            }
            if let Some(id) = &row.product_id {
                product_ids.insert(id.clone());
            }
        }

        let supplier_ids: Vec<String> = supplier_ids.into_iter().collect();
        let warehouse_ids: Vec<String> = warehouse_ids.into_iter().collect();
        let product_ids: Vec<String> = product_ids.into_iter().collect();

        // ===== 供应商 =====
        if !supplier_ids.is_empty() {
            ctx.suppliers
                .extend(repo.find_suppliers_by_ids(&supplier_ids).await?.into_iter().map(|s| s.id));

            let missing: Vec<String> = supplier_ids
                .iter()
                .filter(|id| !ctx.suppliers.contains(*id))
                .cloned()
                .collect();
            if !missing.is_empty() {
                let new_suppliers = missing
                    .iter()
                    .map(|id| Supplier {
                        id: id.clone(),
                        name: placeholder_supplier_name(id),
                    })
                    .collect();
                ctx.suppliers_created = repo.create_suppliers(new_suppliers).await?;
                ctx.suppliers
                    .extend(repo.find_suppliers_by_ids(&missing).await?.into_iter().map(|s| s.id));
            }
        }

        // ===== 分类 =====
        if !category_names.is_empty() {
            let keys: Vec<String> = category_names.keys().cloned().collect();
            for category in repo.find_categories_by_keys(&keys).await? {
                ctx.categories.insert(category.name_key, category.id);
            }

            let missing: Vec<String> = keys
                .into_iter()
                .filter(|k| !ctx.categories.contains_key(k))
                .collect();
            if !missing.is_empty() {
                let new_categories = missing
                    .iter()
                    .map(|k| NewCategory {
                        name: category_names.get(k).cloned().unwrap_or_else(|| k.clone()),
                        name_key: k.clone(),
                    })
                    .collect();
                ctx.categories_created = repo.create_categories(new_categories).await?;
                for category in repo.find_categories_by_keys(&missing).await? {
                    ctx.categories.insert(category.name_key, category.id);
                }
            }
        }

        // ===== 仓库（只读）=====
        if !warehouse_ids.is_empty() {
            ctx.warehouses
                .extend(repo.find_warehouse_ids(&warehouse_ids).await?);
        }

        // ===== 商品 / 库存 / 关联 =====
        if !product_ids.is_empty() {
            ctx.products.extend(repo.find_product_ids(&product_ids).await?);
            for stock in repo.find_stocks_by_products(&product_ids).await? {
                ctx.stocks.insert(stock.key(), stock);
            }
            ctx.associations
                .extend(repo.find_product_suppliers(&product_ids).await?);
        }

        debug!(
            suppliers = ctx.suppliers.len(),
            suppliers_created = ctx.suppliers_created,
            categories = ctx.categories.len(),
            categories_created = ctx.categories_created,
            warehouses = ctx.warehouses.len(),
            products = ctx.products.len(),
            stocks = ctx.stocks.len(),
            "商品管线引用解析完成"
        );

        Ok(ctx)
    }

    /// 解析仓库管线的全部引用
    ///
    /// # 预加载
    /// - 城市（缺失则批量创建，城市+省份均有值才参与）
    /// - 仓库（按文件中出现的仓库 id）
    pub async fn resolve_warehouses<R>(
        repo: &R,
        rows: &[WarehouseFeedRow],
    ) -> RepositoryResult<WarehouseResolutionContext>
    where
        R: WarehouseRepository + ?Sized,
    {
        let mut ctx = WarehouseResolutionContext::default();

        let mut cities: BTreeMap<CityKey, NewCity> = BTreeMap::new();
        let mut warehouse_ids = BTreeSet::new();

        for row in rows {
            if let (Some(city), Some(state)) = (&row.city, &row.state) {
                let new_city = NewCity {
                    name: city.trim().to_string(),
                    state: state.trim().to_string(),
                };
                cities.entry(new_city.key()).or_insert(new_city);
            }
            if let Some(id) = &row.warehouse_id {
                warehouse_ids.insert(id.clone());
            }
        }

        // ===== 城市 =====
        if !cities.is_empty() {
            let keys: Vec<CityKey> = cities.keys().cloned().collect();
            for city in repo.find_cities_by_keys(&keys).await? {
                ctx.cities.insert(CityKey::new(&city.name, &city.state), city.id);
            }

            let missing: Vec<CityKey> = keys
                .into_iter()
                .filter(|k| !ctx.cities.contains_key(k))
                .collect();
            if !missing.is_empty() {
                let new_cities = missing
                    .iter()
                    .filter_map(|k| cities.get(k).cloned())
                    .collect();
                ctx.cities_created = repo.create_cities(new_cities).await?;
                for city in repo.find_cities_by_keys(&missing).await? {
                    ctx.cities.insert(CityKey::new(&city.name, &city.state), city.id);
                }
            }
        }

        // ===== 仓库 =====
        if !warehouse_ids.is_empty() {
            let ids: Vec<String> = warehouse_ids.into_iter().collect();
            for warehouse in repo.find_warehouses_by_ids(&ids).await? {
                ctx.warehouses.insert(warehouse.id.clone(), warehouse);
            }
        }

        debug!(
            cities = ctx.cities.len(),
            cities_created = ctx.cities_created,
            warehouses = ctx.warehouses.len(),
            "仓库管线引用解析完成"
        );

        Ok(ctx)
    }
}
