// ==========================================
// 库存对账引擎 - SQL 构建工具
// ==========================================
// 职责: 批量 IN 查询的占位符拼接与分块
// 约束: 只拼接占位符，值一律走参数绑定
// ==========================================

/// 单条 IN 查询允许的最大键数
pub const IN_CHUNK_SIZE: usize = 500;

/// 生成 `?, ?, ?` 形式的占位符
///
/// # 示例
/// ```
/// use inventory_import::repository::sql_builder::placeholders;
/// assert_eq!(placeholders(3), "?, ?, ?");
/// ```
pub fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

/// 生成 `(?, ?), (?, ?)` 形式的行值占位符（复合键 IN 查询）
///
/// # 示例
/// ```
/// use inventory_import::repository::sql_builder::row_value_placeholders;
/// assert_eq!(row_value_placeholders(2, 2), "(?, ?), (?, ?)");
/// ```
pub fn row_value_placeholders(rows: usize, arity: usize) -> String {
    let tuple = format!("({})", placeholders(arity));
    vec![tuple; rows].join(", ")
}
