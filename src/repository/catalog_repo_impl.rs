// ==========================================
// 库存对账引擎 - 商品目录 Repository 实现
// ==========================================
// 职责: 实现 CatalogRepository（使用 rusqlite）
// 红线: Repository 不含业务规则，只做数据 CRUD
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::catalog::{
    Category, NewCategory, Product, ProductSupplier, ProductWarehouseStock, StockKey,
    StockMovement, Supplier,
};
use crate::repository::catalog_repo::CatalogRepository;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::sql_builder::{placeholders, row_value_placeholders, IN_CHUNK_SIZE};
use async_trait::async_trait;
use rusqlite::{params, params_from_iter, Connection, Row, Transaction};
use std::sync::{Arc, Mutex, MutexGuard};

const STOCK_COLUMNS: &str = "id, product_id, warehouse_id, stock_quantity, reorder_level, \
                             last_restock, expiration_date, status";

fn map_stock_row(row: &Row) -> rusqlite::Result<ProductWarehouseStock> {
    Ok(ProductWarehouseStock {
        id: row.get(0)?,
        product_id: row.get(1)?,
        warehouse_id: row.get(2)?,
        stock_quantity: row.get(3)?,
        reorder_level: row.get(4)?,
        last_restock: row.get(5)?,
        expiration_date: row.get(6)?,
        status: row.get(7)?,
    })
}

// ==========================================
// SqliteCatalogRepository
// ==========================================
pub struct SqliteCatalogRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteCatalogRepository {
    /// 创建新的 Repository 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 按单列主键分块查询，返回映射后的结果
    fn query_by_ids<T, F>(
        conn: &Connection,
        sql_prefix: &str,
        ids: &[String],
        mut map: F,
    ) -> RepositoryResult<Vec<T>>
    where
        F: FnMut(&Row) -> rusqlite::Result<T>,
    {
        let mut out = Vec::new();
        for chunk in ids.chunks(IN_CHUNK_SIZE) {
            let sql = format!("{} ({})", sql_prefix, placeholders(chunk.len()));
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(chunk.iter()), |row| map(row))?;
            for row in rows {
                out.push(row?);
            }
        }
        Ok(out)
    }

    fn insert_stocks_tx(
        tx: &Transaction,
        stocks: &[ProductWarehouseStock],
    ) -> RepositoryResult<usize> {
        let mut stmt = tx.prepare(
            r#"
            INSERT OR IGNORE INTO product_warehouse_stock (
                product_id, warehouse_id, stock_quantity, reorder_level,
                last_restock, expiration_date, status
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )?;

        let mut count = 0;
        for stock in stocks {
            count += stmt.execute(params![
                stock.product_id,
                stock.warehouse_id,
                stock.stock_quantity,
                stock.reorder_level,
                stock.last_restock.to_string(),
                stock.expiration_date.to_string(),
                stock.status,
            ])?;
        }
        Ok(count)
    }

    fn update_stocks_tx(
        tx: &Transaction,
        stocks: &[ProductWarehouseStock],
    ) -> RepositoryResult<usize> {
        let mut stmt = tx.prepare(
            r#"
            UPDATE product_warehouse_stock
               SET stock_quantity = ?1,
                   reorder_level = ?2,
                   last_restock = ?3,
                   expiration_date = ?4,
                   status = ?5,
                   updated_at = datetime('now')
             WHERE product_id = ?6 AND warehouse_id = ?7
            "#,
        )?;

        let mut count = 0;
        for stock in stocks {
            count += stmt.execute(params![
                stock.stock_quantity,
                stock.reorder_level,
                stock.last_restock.to_string(),
                stock.expiration_date.to_string(),
                stock.status,
                stock.product_id,
                stock.warehouse_id,
            ])?;
        }
        Ok(count)
    }
}

#[async_trait]
impl CatalogRepository for SqliteCatalogRepository {
    async fn find_suppliers_by_ids(&self, ids: &[String]) -> RepositoryResult<Vec<Supplier>> {
        let conn = self.get_conn()?;
        Self::query_by_ids(
            &conn,
            "SELECT id, name FROM supplier WHERE id IN",
            ids,
            |row| {
                Ok(Supplier {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            },
        )
    }

    async fn create_suppliers(&self, suppliers: Vec<Supplier>) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;
        let mut count = 0;
        {
            let mut stmt = tx.prepare("INSERT OR IGNORE INTO supplier (id, name) VALUES (?1, ?2)")?;
            for supplier in &suppliers {
                count += stmt.execute(params![supplier.id, supplier.name])?;
            }
        }
        tx.commit()?;
        Ok(count)
    }

    async fn find_categories_by_keys(&self, keys: &[String]) -> RepositoryResult<Vec<Category>> {
        let conn = self.get_conn()?;
        Self::query_by_ids(
            &conn,
            "SELECT id, name, name_key FROM category WHERE name_key IN",
            keys,
            |row| {
                Ok(Category {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    name_key: row.get(2)?,
                })
            },
        )
    }

    async fn create_categories(&self, categories: Vec<NewCategory>) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;
        let mut count = 0;
        {
            let mut stmt =
                tx.prepare("INSERT OR IGNORE INTO category (name, name_key) VALUES (?1, ?2)")?;
            for category in &categories {
                count += stmt.execute(params![category.name, category.name_key])?;
            }
        }
        tx.commit()?;
        Ok(count)
    }

    async fn find_warehouse_ids(&self, ids: &[String]) -> RepositoryResult<Vec<String>> {
        let conn = self.get_conn()?;
        Self::query_by_ids(&conn, "SELECT id FROM warehouse WHERE id IN", ids, |row| {
            row.get(0)
        })
    }

    async fn find_product_ids(&self, ids: &[String]) -> RepositoryResult<Vec<String>> {
        let conn = self.get_conn()?;
        Self::query_by_ids(&conn, "SELECT id FROM product WHERE id IN", ids, |row| {
            row.get(0)
        })
    }

    async fn create_products(&self, products: Vec<Product>) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;
        let mut count = 0;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT OR IGNORE INTO product (
                    id, name, description, category_id, sku, barcode,
                    unit_price, weight_kg, dimensions_cm,
                    is_fragile, requires_refrigeration, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
                "#,
            )?;
            for product in &products {
                count += stmt.execute(params![
                    product.id,
                    product.name,
                    product.description,
                    product.category_id,
                    product.sku,
                    product.barcode,
                    product.unit_price.to_string(),
                    product.weight_kg.to_string(),
                    product.dimensions_cm,
                    product.is_fragile as i32,
                    product.requires_refrigeration as i32,
                    product.created_at.to_rfc3339(),
                ])?;
            }
        }
        tx.commit()?;
        Ok(count)
    }

    async fn find_product_suppliers(
        &self,
        product_ids: &[String],
    ) -> RepositoryResult<Vec<ProductSupplier>> {
        let conn = self.get_conn()?;
        Self::query_by_ids(
            &conn,
            "SELECT product_id, supplier_id FROM product_supplier WHERE product_id IN",
            product_ids,
            |row| {
                Ok(ProductSupplier {
                    product_id: row.get(0)?,
                    supplier_id: row.get(1)?,
                })
            },
        )
    }

    async fn create_product_suppliers(
        &self,
        links: Vec<ProductSupplier>,
    ) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;
        let mut count = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO product_supplier (product_id, supplier_id) VALUES (?1, ?2)",
            )?;
            for link in &links {
                count += stmt.execute(params![link.product_id, link.supplier_id])?;
            }
        }
        tx.commit()?;
        Ok(count)
    }

    async fn find_stocks_by_products(
        &self,
        product_ids: &[String],
    ) -> RepositoryResult<Vec<ProductWarehouseStock>> {
        let conn = self.get_conn()?;
        let prefix = format!(
            "SELECT {} FROM product_warehouse_stock WHERE product_id IN",
            STOCK_COLUMNS
        );
        Self::query_by_ids(&conn, &prefix, product_ids, map_stock_row)
    }

    async fn find_stocks_by_keys(
        &self,
        keys: &[StockKey],
    ) -> RepositoryResult<Vec<ProductWarehouseStock>> {
        let conn = self.get_conn()?;
        let mut out = Vec::new();
        for chunk in keys.chunks(IN_CHUNK_SIZE) {
            let sql = format!(
                "SELECT {} FROM product_warehouse_stock \
                 WHERE (product_id, warehouse_id) IN (VALUES {})",
                STOCK_COLUMNS,
                row_value_placeholders(chunk.len(), 2)
            );
            let values = chunk
                .iter()
                .flat_map(|k| [k.product_id.as_str(), k.warehouse_id.as_str()]);
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(values), map_stock_row)?;
            for row in rows {
                out.push(row?);
            }
        }
        Ok(out)
    }

    async fn insert_stocks(&self, stocks: Vec<ProductWarehouseStock>) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;
        let count = Self::insert_stocks_tx(&tx, &stocks)?;
        tx.commit()?;
        Ok(count)
    }

    async fn update_stocks(&self, stocks: Vec<ProductWarehouseStock>) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;
        let count = Self::update_stocks_tx(&tx, &stocks)?;
        tx.commit()?;
        Ok(count)
    }

    async fn insert_movements(&self, movements: Vec<StockMovement>) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;
        let mut count = 0;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO stock_movement (
                    id, stock_id, product_id, warehouse_id, movement_type,
                    quantity, resulting_stock, note, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                "#,
            )?;
            for movement in &movements {
                count += stmt.execute(params![
                    movement.id,
                    movement.stock_id,
                    movement.product_id,
                    movement.warehouse_id,
                    movement.movement_type.as_str(),
                    movement.quantity,
                    movement.resulting_stock,
                    movement.note,
                    movement.created_at.to_rfc3339(),
                ])?;
            }
        }
        tx.commit()?;
        Ok(count)
    }
}
