// ==========================================
// 库存对账引擎 - 仓库 Repository 实现
// ==========================================
// 职责: 实现 WarehouseRepository（使用 rusqlite）
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::warehouse::{City, CityKey, NewCity, Warehouse};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::sql_builder::{placeholders, row_value_placeholders, IN_CHUNK_SIZE};
use crate::repository::warehouse_repo::WarehouseRepository;
use async_trait::async_trait;
use rusqlite::{params, params_from_iter, Connection};
use std::sync::{Arc, Mutex, MutexGuard};

// ==========================================
// SqliteWarehouseRepository
// ==========================================
pub struct SqliteWarehouseRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteWarehouseRepository {
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }
}

#[async_trait]
impl WarehouseRepository for SqliteWarehouseRepository {
    async fn find_cities_by_keys(&self, keys: &[CityKey]) -> RepositoryResult<Vec<City>> {
        let conn = self.get_conn()?;
        let mut out = Vec::new();
        for chunk in keys.chunks(IN_CHUNK_SIZE) {
            let sql = format!(
                "SELECT id, name, state FROM city WHERE (name_key, state_key) IN (VALUES {})",
                row_value_placeholders(chunk.len(), 2)
            );
            let values = chunk
                .iter()
                .flat_map(|k| [k.name_key.as_str(), k.state_key.as_str()]);
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(values), |row| {
                Ok(City {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    state: row.get(2)?,
                })
            })?;
            for row in rows {
                out.push(row?);
            }
        }
        Ok(out)
    }

    async fn create_cities(&self, cities: Vec<NewCity>) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;
        let mut count = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO city (name, state, name_key, state_key) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for city in &cities {
                let key = city.key();
                count += stmt.execute(params![
                    city.name.trim(),
                    city.state.trim(),
                    key.name_key,
                    key.state_key
                ])?;
            }
        }
        tx.commit()?;
        Ok(count)
    }

    async fn find_warehouses_by_ids(&self, ids: &[String]) -> RepositoryResult<Vec<Warehouse>> {
        let conn = self.get_conn()?;
        let mut out = Vec::new();
        for chunk in ids.chunks(IN_CHUNK_SIZE) {
            let sql = format!(
                r#"
                SELECT id, name, city_id, address, postal_code, latitude, longitude,
                       capacity_m2, status, manager_id, phone, updated_at
                  FROM warehouse
                 WHERE id IN ({})
                "#,
                placeholders(chunk.len())
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(chunk.iter()), |row| {
                Ok(Warehouse {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    city_id: row.get(2)?,
                    address: row.get(3)?,
                    postal_code: row.get(4)?,
                    latitude: row.get(5)?,
                    longitude: row.get(6)?,
                    capacity_m2: row.get(7)?,
                    status: row.get(8)?,
                    manager_id: row.get(9)?,
                    phone: row.get(10)?,
                    updated_at: row.get(11)?,
                })
            })?;
            for row in rows {
                out.push(row?);
            }
        }
        Ok(out)
    }

    async fn insert_warehouses(&self, warehouses: Vec<Warehouse>) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;
        let mut count = 0;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT OR IGNORE INTO warehouse (
                    id, name, city_id, address, postal_code, latitude, longitude,
                    capacity_m2, status, manager_id, phone, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
                "#,
            )?;
            for w in &warehouses {
                count += stmt.execute(params![
                    w.id,
                    w.name,
                    w.city_id,
                    w.address,
                    w.postal_code,
                    w.latitude,
                    w.longitude,
                    w.capacity_m2,
                    w.status,
                    w.manager_id,
                    w.phone,
                    w.updated_at.to_rfc3339(),
                ])?;
            }
        }
        tx.commit()?;
        Ok(count)
    }

    async fn update_warehouses(&self, warehouses: Vec<Warehouse>) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;
        let mut count = 0;
        {
            let mut stmt = tx.prepare(
                r#"
                UPDATE warehouse
                   SET name = ?2, city_id = ?3, address = ?4, postal_code = ?5,
                       latitude = ?6, longitude = ?7, capacity_m2 = ?8, status = ?9,
                       manager_id = ?10, phone = ?11, updated_at = ?12
                 WHERE id = ?1
                "#,
            )?;
            for w in &warehouses {
                count += stmt.execute(params![
                    w.id,
                    w.name,
                    w.city_id,
                    w.address,
                    w.postal_code,
                    w.latitude,
                    w.longitude,
                    w.capacity_m2,
                    w.status,
                    w.manager_id,
                    w.phone,
                    w.updated_at.to_rfc3339(),
                ])?;
            }
        }
        tx.commit()?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{configure_sqlite_connection, init_schema};
    use chrono::Utc;

    fn setup() -> SqliteWarehouseRepository {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();
        init_schema(&conn).unwrap();
        SqliteWarehouseRepository::from_connection(Arc::new(Mutex::new(conn)))
    }

    fn warehouse(id: &str, city_id: Option<i64>) -> Warehouse {
        Warehouse {
            id: id.to_string(),
            name: "Bodega Norte".to_string(),
            city_id,
            address: Some("Calle 10 # 5-20".to_string()),
            postal_code: None,
            latitude: Some(6.2442),
            longitude: Some(-75.5812),
            capacity_m2: Some(1200.0),
            status: Some("activo".to_string()),
            manager_id: None,
            phone: None,
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_city_natural_key_is_case_insensitive() {
        let repo = setup();
        let created = repo
            .create_cities(vec![
                NewCity {
                    name: "Medellín".to_string(),
                    state: "Antioquia".to_string(),
                },
                NewCity {
                    name: " MEDELLÍN ".to_string(),
                    state: "antioquia".to_string(),
                },
            ])
            .await
            .unwrap();
        assert_eq!(created, 1);

        let found = repo
            .find_cities_by_keys(&[CityKey::new("medellín", "ANTIOQUIA")])
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Medellín");
    }

    #[tokio::test]
    async fn test_warehouse_insert_then_update() {
        let repo = setup();
        assert_eq!(
            repo.insert_warehouses(vec![warehouse("WH-1", None)]).await.unwrap(),
            1
        );

        let mut changed = warehouse("WH-1", None);
        changed.manager_id = Some("user-7".to_string());
        changed.name = "Bodega Norte II".to_string();
        assert_eq!(repo.update_warehouses(vec![changed]).await.unwrap(), 1);

        let found = repo
            .find_warehouses_by_ids(&["WH-1".to_string()])
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].manager_id.as_deref(), Some("user-7"));
        assert_eq!(found[0].name, "Bodega Norte II");
    }
}
