// ==========================================
// 库存对账引擎 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// 说明: 这里只放致命错误（中止整次导入）；
//       行级问题以 RowError 数据形式累积，不走 Err
// ==========================================

use crate::domain::types::ImportStage;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 文件相关错误 =====
    #[error("文件不存在: {0}")]
    FileNotFound(String),

    #[error("文件格式不支持: {0}（仅支持 .csv/.xlsx/.xls）")]
    UnsupportedFormat(String),

    #[error("文件读取失败: {0}")]
    FileReadError(String),

    #[error("Excel 解析失败: {0}")]
    ExcelParseError(String),

    #[error("CSV 解析失败: {0}")]
    CsvParseError(String),

    // ===== 持久化错误 =====
    // 已提交的批次保持已提交，不做补偿回滚
    #[error("阶段 {stage} 持久化失败: {source}")]
    Persistence {
        stage: ImportStage,
        #[source]
        source: RepositoryError,
    },

    // ===== 配置错误 =====
    #[error("配置读取失败: {0}")]
    ConfigReadError(String),

    // ===== 通用错误 =====
    #[error("内部错误: {0}")]
    InternalError(String),
}

impl ImportError {
    /// 将仓储错误包装为指定阶段的持久化错误
    pub fn persistence(stage: ImportStage) -> impl FnOnce(RepositoryError) -> ImportError {
        move |source| ImportError::Persistence { stage, source }
    }

    /// 是否属于文件格式类错误（对外映射为 400）
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            ImportError::FileNotFound(_)
                | ImportError::UnsupportedFormat(_)
                | ImportError::FileReadError(_)
                | ImportError::ExcelParseError(_)
                | ImportError::CsvParseError(_)
        )
    }
}

// 实现 From<std::io::Error>
impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::FileReadError(err.to_string())
    }
}

// 实现 From<csv::Error>
impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::CsvParseError(err.to_string())
    }
}

// 实现 From<calamine::Error>
impl From<calamine::Error> for ImportError {
    fn from(err: calamine::Error) -> Self {
        ImportError::ExcelParseError(err.to_string())
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;
