// ==========================================
// 库存对账引擎 - 仓库领域模型
// ==========================================
// 对齐: schema city / warehouse 表
// 经理账号归身份服务所有，本系统只保存其 id
// ==========================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// City - 城市
// ==========================================
// 自然键: (name_key, state_key)，均为 TRIM + 小写
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct City {
    pub id: i64,
    pub name: String,
    pub state: String,
}

/// 城市自然键
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CityKey {
    pub name_key: String,
    pub state_key: String,
}

impl CityKey {
    pub fn new(name: &str, state: &str) -> Self {
        Self {
            name_key: name.trim().to_lowercase(),
            state_key: state.trim().to_lowercase(),
        }
    }
}

/// 待创建的城市（保留首次出现时的原始写法）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCity {
    pub name: String,
    pub state: String,
}

impl NewCity {
    pub fn key(&self) -> CityKey {
        CityKey::new(&self.name, &self.state)
    }
}

// ==========================================
// Warehouse - 仓库
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Warehouse {
    pub id: String,
    pub name: String,
    pub city_id: Option<i64>,
    pub address: Option<String>,
    pub postal_code: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub capacity_m2: Option<f64>,
    pub status: Option<String>,
    pub manager_id: Option<String>,
    pub phone: Option<String>,
    pub updated_at: DateTime<Utc>,
}

// ==========================================
// 身份服务用户
// ==========================================

/// 身份服务中的用户（经理/调度员）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagerUser {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub email: String,
}

/// 创建用户请求
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub password: String,
    pub role: String,
}
