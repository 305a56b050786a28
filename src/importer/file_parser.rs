// ==========================================
// 库存对账引擎 - 文件解析器实现
// ==========================================
// 阶段 0: 文件读取与解析
// 支持: CSV（';' 分隔，单字节 Latin-1 编码）/ Excel（.xlsx/.xls，仅第一个工作表）
// 输出: 有序的原始行记录，值在规范化前均为字符串
// ==========================================

use crate::domain::import::ImportRow;
use crate::domain::types::FileFormat;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::field_normalizer::{FieldNormalizer, DATE_FORMAT};
use crate::importer::importer_trait::FileParser;
use calamine::{open_workbook_auto, Data, Reader};
use csv::ReaderBuilder;
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;
use tracing::debug;

/// CSV 分隔符
const CSV_DELIMITER: u8 = b';';

/// Latin-1 解码：每个字节直接映射到 U+0000..U+00FF
fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// 表头清洗（去 BOM / 零宽字符 / 空白）
fn clean_headers<I: IntoIterator<Item = String>>(raw: I) -> Vec<String> {
    let normalizer = FieldNormalizer;
    raw.into_iter()
        .map(|h| normalizer.strip_invisible(&h))
        .collect()
}

fn ensure_exists(path: &Path) -> ImportResult<()> {
    if !path.exists() {
        return Err(ImportError::FileNotFound(path.display().to_string()));
    }
    Ok(())
}

// ==========================================
// CSV Parser 实现
// ==========================================
pub struct CsvParser;

impl FileParser for CsvParser {
    fn parse_to_rows(&self, file_path: &Path) -> ImportResult<Vec<ImportRow>> {
        ensure_exists(file_path)?;

        let file = File::open(file_path)?;
        let mut reader = ReaderBuilder::new()
            .delimiter(CSV_DELIMITER)
            .has_headers(true)
            .flexible(true) // 允许行长度不一致
            .from_reader(file);

        // 读取表头（按字节读取，避免非 UTF-8 内容报错）
        let headers = clean_headers(reader.byte_headers()?.iter().map(decode_latin1));

        let mut rows = Vec::new();
        for (idx, result) in reader.byte_records().enumerate() {
            let record = result?;
            let mut values = HashMap::new();

            for (col_idx, value) in record.iter().enumerate() {
                if let Some(header) = headers.get(col_idx) {
                    values.insert(header.clone(), decode_latin1(value).trim().to_string());
                }
            }

            let row = ImportRow::new(idx + 1, values);

            // 跳过完全空白的行
            if row.is_blank() {
                continue;
            }

            rows.push(row);
        }

        debug!(file = %file_path.display(), rows = rows.len(), "CSV 解析完成");
        Ok(rows)
    }
}

// ==========================================
// Excel Parser 实现
// ==========================================
pub struct ExcelParser;

impl ExcelParser {
    /// 单元格转字符串（日期单元格转为 dd/mm/yyyy，与 CSV 口径一致）
    fn cell_to_string(cell: &Data) -> String {
        match cell {
            Data::Empty => String::new(),
            Data::DateTime(dt) => dt
                .as_datetime()
                .map(|d| d.format(DATE_FORMAT).to_string())
                .unwrap_or_else(|| cell.to_string()),
            other => other.to_string().trim().to_string(),
        }
    }
}

impl FileParser for ExcelParser {
    fn parse_to_rows(&self, file_path: &Path) -> ImportResult<Vec<ImportRow>> {
        ensure_exists(file_path)?;

        // 自动识别 xlsx/xls
        let mut workbook = open_workbook_auto(file_path)?;

        // 仅读取第一个 sheet
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| ImportError::ExcelParseError("Excel 文件无工作表".to_string()))??;

        // 提取表头（第一行）
        let mut sheet_rows = range.rows();
        let header_row = sheet_rows
            .next()
            .ok_or_else(|| ImportError::ExcelParseError("Excel 文件无数据行".to_string()))?;

        let headers = clean_headers(header_row.iter().map(Self::cell_to_string));

        let mut rows = Vec::new();
        for (idx, data_row) in sheet_rows.enumerate() {
            let mut values = HashMap::new();

            for (col_idx, cell) in data_row.iter().enumerate() {
                if let Some(header) = headers.get(col_idx) {
                    values.insert(header.clone(), Self::cell_to_string(cell));
                }
            }

            let row = ImportRow::new(idx + 1, values);

            // 跳过完全空白的行
            if row.is_blank() {
                continue;
            }

            rows.push(row);
        }

        debug!(file = %file_path.display(), rows = rows.len(), "Excel 解析完成");
        Ok(rows)
    }
}

// ==========================================
// 通用文件解析器（根据声明的扩展名选择）
// ==========================================
pub struct UniversalFileParser;

impl UniversalFileParser {
    /// 解析文件
    ///
    /// # 参数
    /// - file_path: 文件路径（上传文件可能是无扩展名的临时文件）
    /// - declared_extension: 调用方声明的扩展名
    ///
    /// # 返回
    /// - Err(UnsupportedFormat): 扩展名不受支持（致命错误）
    pub fn parse(&self, file_path: &Path, declared_extension: &str) -> ImportResult<Vec<ImportRow>> {
        match FileFormat::from_extension(declared_extension) {
            Some(FileFormat::Csv) => CsvParser.parse_to_rows(file_path),
            Some(FileFormat::Excel) => ExcelParser.parse_to_rows(file_path),
            None => Err(ImportError::UnsupportedFormat(
                declared_extension.trim().to_string(),
            )),
        }
    }
}
