// ==========================================
// 影评平台 - CSV 文件解析器
// ==========================================
// 约定: 逗号分隔、UTF-8、首行为表头
// 输出: DataFile（表头 + 按位置对齐的原始行）
// ==========================================

use crate::domain::record::{DataFile, RawRow};
use crate::importer::error::{ImportError, ImportResult};
use csv::ReaderBuilder;
use std::fs::File;
use std::path::Path;
use tracing::debug;

/// 数据文件扩展名
pub const FILE_EXT: &str = "csv";

pub struct CsvParser;

impl CsvParser {
    /// 读取整个数据文件
    ///
    /// - 表头与值均 trim
    /// - 完全空白的行跳过
    /// - 列数不足的行按空值补齐（flexible）
    pub fn parse_data_file(&self, file_path: &Path) -> ImportResult<DataFile> {
        let path = file_path;

        if !path.exists() {
            return Err(ImportError::FileNotFound(path.display().to_string()));
        }

        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case(FILE_EXT) => {}
            other => {
                return Err(ImportError::UnsupportedFormat(
                    other.unwrap_or("").to_string(),
                ))
            }
        }

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();
        let entity = entity_name_of(path).unwrap_or_default();

        let file = File::open(path)?;
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .delimiter(b',')
            .flexible(true) // 允许行长度不一致
            .from_reader(file);

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
            .collect();

        if headers.iter().all(|h| h.is_empty()) {
            return Err(ImportError::MissingHeader(file_name));
        }

        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result?;
            // 表头为第 1 行；带引号换行时以 csv 记录的起始行为准
            let line = record
                .position()
                .map(|p| p.line() as usize)
                .unwrap_or(rows.len() + 2);

            let values: Vec<String> = record.iter().map(|v| v.trim().to_string()).collect();

            // 跳过完全空白的行
            if values.iter().all(|v| v.is_empty()) {
                continue;
            }

            if values.len() > headers.len() {
                debug!(file = %file_name, line, "行的列数多于表头，多余的列被忽略");
            }

            rows.push(RawRow { line, values });
        }

        debug!(file = %file_name, rows = rows.len(), "CSV 解析完成");

        Ok(DataFile {
            file_name,
            entity,
            path: path.to_path_buf(),
            headers,
            rows,
        })
    }
}

/// 文件名（去扩展名、小写）即实体名
pub fn entity_name_of(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(|s| s.trim().to_lowercase())
}
