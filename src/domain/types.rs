// ==========================================
// 库存对账引擎 - 领域类型定义
// ==========================================
// 职责: 流水类型、导入阶段、文件格式等枚举
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 库存流水类型 (Movement Type)
// ==========================================
// 序列化格式: SCREAMING_SNAKE_CASE (与数据库一致)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementType {
    Creation, // 新建库存记录
    Update,   // 更新已有库存记录
}

impl MovementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementType::Creation => "CREATION",
            MovementType::Update => "UPDATE",
        }
    }

    pub fn from_db(raw: &str) -> Option<Self> {
        match raw.trim() {
            "CREATION" => Some(MovementType::Creation),
            "UPDATE" => Some(MovementType::Update),
            _ => None,
        }
    }
}

impl fmt::Display for MovementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ==========================================
// 导入文件格式
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Csv,   // ';' 分隔，单字节编码
    Excel, // 仅读取第一个工作表
}

impl FileFormat {
    /// 根据声明的扩展名判断格式（大小写不敏感，允许带前导 '.'）
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim().trim_start_matches('.').to_lowercase().as_str() {
            "csv" => Some(FileFormat::Csv),
            "xlsx" | "xls" => Some(FileFormat::Excel),
            _ => None,
        }
    }
}

// ==========================================
// 导入运行阶段
// ==========================================
// 状态机:
// Ingesting → ResolvingReferences → Reconciling(i/N)
//   → PersistingLedger → DispatchingAlerts → Summarizing
// 仓库管线: Ingesting → ResolvingReferences
//   → [ProvisioningUsers → Reconciling(i/N)]×N → Summarizing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportStage {
    Ingesting,
    ResolvingReferences,
    Reconciling { batch: usize, total: usize },
    ProvisioningUsers,
    PersistingLedger,
    DispatchingAlerts,
    Summarizing,
}

impl fmt::Display for ImportStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportStage::Ingesting => write!(f, "Ingesting"),
            ImportStage::ResolvingReferences => write!(f, "ResolvingReferences"),
            ImportStage::Reconciling { batch, total } => {
                write!(f, "Reconciling({}/{})", batch, total)
            }
            ImportStage::ProvisioningUsers => write!(f, "ProvisioningUsers"),
            ImportStage::PersistingLedger => write!(f, "PersistingLedger"),
            ImportStage::DispatchingAlerts => write!(f, "DispatchingAlerts"),
            ImportStage::Summarizing => write!(f, "Summarizing"),
        }
    }
}
