// ==========================================
// 库存对账引擎 - 字段规范化
// ==========================================
// 职责: 原始字符串 → 强类型值（纯函数，无 I/O）
// 规则:
// - 小数: ',' 替换为 '.' 后解析，非法 → NaN
// - 日期: 去除零宽/BOM 字符，格式 dd/mm/yyyy，非法/缺失 → 调用方默认值
// - 布尔: 仅字面量 "true" 为真
// ==========================================

use crate::domain::import::FieldValue;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::str::FromStr;

/// 需要剔除的不可见字符
const INVISIBLE_CHARS: [char; 5] = ['\u{200B}', '\u{200C}', '\u{200D}', '\u{2060}', '\u{FEFF}'];

/// 以 Latin-1 解码 UTF-8 BOM 时得到的前缀
const LATIN1_BOM: &str = "\u{EF}\u{BB}\u{BF}";

/// 日期格式
pub const DATE_FORMAT: &str = "%d/%m/%Y";

pub struct FieldNormalizer;

impl FieldNormalizer {
    /// 去除零宽/BOM 字符并 TRIM
    pub fn strip_invisible(&self, value: &str) -> String {
        let without_bom = value.trim_start().trim_start_matches(LATIN1_BOM);
        without_bom
            .chars()
            .filter(|c| !INVISIBLE_CHARS.contains(c))
            .collect::<String>()
            .trim()
            .to_string()
    }

    /// 标准化 NULL 值（空字符串/空白 → None）
    pub fn normalize_null(&self, value: Option<&str>) -> Option<String> {
        value.and_then(|v| {
            let cleaned = self.strip_invisible(v);
            if cleaned.is_empty() {
                None
            } else {
                Some(cleaned)
            }
        })
    }

    /// 解析小数（本地化逗号），非法输入返回 NaN
    pub fn parse_decimal(&self, value: &str) -> f64 {
        let normalized = self.strip_invisible(value).replace(',', ".");
        normalized.parse::<f64>().unwrap_or(f64::NAN)
    }

    /// 解析必填小数字段（价格/重量）
    ///
    /// # 返回
    /// - Missing: 空值
    /// - Invalid: NaN / 无穷
    /// - Value: 精确十进制
    pub fn parse_required_decimal(&self, value: Option<&str>) -> FieldValue<Decimal> {
        let raw = match self.normalize_null(value) {
            Some(v) => v,
            None => return FieldValue::Missing,
        };

        let as_float = self.parse_decimal(&raw);
        if !as_float.is_finite() {
            return FieldValue::Invalid(raw);
        }

        let normalized = raw.replace(',', ".");
        let decimal = Decimal::from_str(&normalized)
            .or_else(|_| Decimal::from_scientific(&normalized))
            .ok()
            .or_else(|| Decimal::try_from(as_float).ok());

        match decimal {
            Some(d) => FieldValue::Value(d),
            None => FieldValue::Invalid(raw),
        }
    }

    /// 解析可选浮点字段（坐标、面积），NaN → None
    pub fn parse_optional_f64(&self, value: Option<&str>) -> Option<f64> {
        self.normalize_null(value)
            .map(|v| self.parse_decimal(&v))
            .filter(|f| f.is_finite())
    }

    /// 解析整数字段（库存数量、补货点），缺失/非法 → 0
    ///
    /// 允许无小数部分的小数写法（"12,0" / 表格中的 12.0）
    pub fn parse_integer(&self, value: Option<&str>) -> i64 {
        let raw = match self.normalize_null(value) {
            Some(v) => v,
            None => return 0,
        };

        if let Ok(n) = raw.parse::<i64>() {
            return n;
        }

        let f = self.parse_decimal(&raw);
        if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
            f as i64
        } else {
            0
        }
    }

    /// 解析 dd/mm/yyyy 日期，非法/缺失 → None
    pub fn parse_date(&self, value: Option<&str>) -> Option<NaiveDate> {
        self.normalize_null(value)
            .and_then(|v| NaiveDate::parse_from_str(&v, DATE_FORMAT).ok())
    }

    /// 解析日期，非法/缺失时使用调用方提供的默认值
    pub fn parse_date_or(&self, value: Option<&str>, default: NaiveDate) -> NaiveDate {
        self.parse_date(value).unwrap_or(default)
    }

    /// 解析布尔值：仅区分大小写的 "true" 为真
    pub fn parse_bool(&self, value: Option<&str>) -> bool {
        matches!(self.normalize_null(value).as_deref(), Some("true"))
    }
}

/// 未提供有效期时使用的远期哨兵日期
pub fn far_future_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(9999, 12, 31).unwrap_or(NaiveDate::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_invisible() {
        let n = FieldNormalizer;
        assert_eq!(n.strip_invisible("\u{FEFF}  15/03/2024\u{200B} "), "15/03/2024");
        assert_eq!(n.strip_invisible("\u{EF}\u{BB}\u{BF}id_producto"), "id_producto");
        assert_eq!(n.strip_invisible("  abc  "), "abc");
    }

    #[test]
    fn test_parse_decimal_locale_comma() {
        let n = FieldNormalizer;
        assert_eq!(n.parse_decimal("12,50"), 12.5);
        assert_eq!(n.parse_decimal(" 3.25 "), 3.25);
        assert!(n.parse_decimal("abc").is_nan());
        assert!(n.parse_decimal("").is_nan());
    }

    #[test]
    fn test_parse_required_decimal() {
        let n = FieldNormalizer;
        assert_eq!(
            n.parse_required_decimal(Some("1250,75")),
            FieldValue::Value(Decimal::from_str("1250.75").unwrap())
        );
        assert_eq!(n.parse_required_decimal(Some("  ")), FieldValue::Missing);
        assert_eq!(n.parse_required_decimal(None), FieldValue::Missing);
        assert_eq!(
            n.parse_required_decimal(Some("doce")),
            FieldValue::Invalid("doce".to_string())
        );
        assert_eq!(
            n.parse_required_decimal(Some("inf")),
            FieldValue::Invalid("inf".to_string())
        );
    }

    #[test]
    fn test_parse_integer_defaults_to_zero() {
        let n = FieldNormalizer;
        assert_eq!(n.parse_integer(Some("42")), 42);
        assert_eq!(n.parse_integer(Some("-5")), -5);
        assert_eq!(n.parse_integer(Some("12,0")), 12);
        assert_eq!(n.parse_integer(Some("12.0")), 12);
        assert_eq!(n.parse_integer(Some("12,5")), 0);
        assert_eq!(n.parse_integer(Some("muchos")), 0);
        assert_eq!(n.parse_integer(None), 0);
    }

    #[test]
    fn test_parse_date_ddmmyyyy() {
        let n = FieldNormalizer;
        assert_eq!(
            n.parse_date(Some("\u{FEFF}05/02/2024")),
            NaiveDate::from_ymd_opt(2024, 2, 5)
        );
        assert_eq!(n.parse_date(Some("2024-02-05")), None);
        assert_eq!(n.parse_date(Some("31/02/2024")), None);
        assert_eq!(n.parse_date(None), None);
    }

    #[test]
    fn test_parse_date_or_default() {
        let n = FieldNormalizer;
        let default = NaiveDate::from_ymd_opt(2030, 1, 1).unwrap();
        assert_eq!(n.parse_date_or(Some("garbage"), default), default);
        assert_eq!(n.parse_date_or(None, default), default);
        assert_eq!(
            n.parse_date_or(Some("01/12/2025"), default),
            NaiveDate::from_ymd_opt(2025, 12, 1).unwrap()
        );
    }

    #[test]
    fn test_parse_bool_literal_true_only() {
        let n = FieldNormalizer;
        assert!(n.parse_bool(Some("true")));
        assert!(n.parse_bool(Some(" true\u{200B}")));
        assert!(!n.parse_bool(Some("TRUE")));
        assert!(!n.parse_bool(Some("True")));
        assert!(!n.parse_bool(Some("1")));
        assert!(!n.parse_bool(Some("si")));
        assert!(!n.parse_bool(None));
    }

    #[test]
    fn test_far_future_date() {
        assert_eq!(far_future_date(), NaiveDate::from_ymd_opt(9999, 12, 31).unwrap());
    }
}
