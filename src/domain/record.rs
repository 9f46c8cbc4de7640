// ==========================================
// 影评平台 - 导入记录模型
// ==========================================
// 数据文件 / 原始行 / 绑定行 / 行结果 / 导入报告
// ==========================================

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::path::PathBuf;

// ==========================================
// DataFile - 一个 CSV 数据文件
// ==========================================
#[derive(Debug, Clone)]
pub struct DataFile {
    /// 文件名（含扩展名）
    pub file_name: String,
    /// 目标实体名（= 文件名去掉扩展名，小写）
    pub entity: String,
    pub path: PathBuf,
    /// 表头（已 trim）
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
}

impl DataFile {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

// ==========================================
// RawRow - 原始行（与表头按位置对齐）
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    /// 文件中的行号（表头为第 1 行）
    pub line: usize,
    pub values: Vec<String>,
}

impl RawRow {
    /// 按表头取值；列数不足时视为空
    pub fn get(&self, column_idx: usize) -> &str {
        self.values.get(column_idx).map(String::as_str).unwrap_or("")
    }

    /// 表头 → 原始值，用于失败日志
    pub fn to_json(&self, headers: &[String]) -> Value {
        let mut map = Map::new();
        for (idx, header) in headers.iter().enumerate() {
            map.insert(header.clone(), Value::String(self.get(idx).to_string()));
        }
        Value::Object(map)
    }
}

// ==========================================
// FieldValue / BoundRow - 类型转换后的行
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Null,
    Integer(i64),
    Text(String),
}

impl FieldValue {
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => write!(f, "NULL"),
            FieldValue::Integer(v) => write!(f, "{}", v),
            FieldValue::Text(v) => write!(f, "{}", v),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundValue {
    pub field: &'static str,
    pub column: String,
    pub value: FieldValue,
    /// 外键目标实体
    pub references: Option<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundRow {
    pub line: usize,
    pub values: Vec<BoundValue>,
}

impl BoundRow {
    /// 需要解析的外键: (字段, 目标实体, id)
    pub fn references(&self) -> impl Iterator<Item = (&'static str, &'static str, i64)> + '_ {
        self.values.iter().filter_map(|v| match (v.references, &v.value) {
            (Some(target), FieldValue::Integer(id)) => Some((v.field, target, *id)),
            _ => None,
        })
    }

    pub fn value_of(&self, field: &str) -> Option<&FieldValue> {
        self.values.iter().find(|v| v.field == field).map(|v| &v.value)
    }
}

// ==========================================
// RowOutcome - 单行导入结果
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RowOutcome {
    /// 已写入
    Persisted,
    /// 值无法转换/校验不通过，跳过
    Malformed,
    /// 外键目标尚不存在，下一轮重试
    Unresolved,
    /// 数据库拒绝（唯一约束等），不重试
    Rejected,
}

impl RowOutcome {
    /// 是否已终结（不再重试）
    pub fn is_settled(&self) -> bool {
        !matches!(self, RowOutcome::Unresolved)
    }
}

impl fmt::Display for RowOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowOutcome::Persisted => write!(f, "PERSISTED"),
            RowOutcome::Malformed => write!(f, "MALFORMED"),
            RowOutcome::Unresolved => write!(f, "UNRESOLVED"),
            RowOutcome::Rejected => write!(f, "REJECTED"),
        }
    }
}

/// 失败行明细（不含 Persisted）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowFailure {
    pub line: usize,
    pub outcome: RowOutcome,
    pub message: String,
    pub raw: Value,
}

// ==========================================
// FileImportResult - 单文件单次导入结果
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct FileImportResult {
    pub entity: String,
    /// (行号, 结果)，按行号顺序
    pub outcomes: Vec<(usize, RowOutcome)>,
    pub failures: Vec<RowFailure>,
}

impl FileImportResult {
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            ..Default::default()
        }
    }

    pub fn record(&mut self, line: usize, outcome: RowOutcome) {
        self.outcomes.push((line, outcome));
    }

    pub fn record_failure(&mut self, failure: RowFailure) {
        self.outcomes.push((failure.line, failure.outcome));
        self.failures.push(failure);
    }

    /// 每行是否写入成功
    pub fn success_flags(&self) -> Vec<bool> {
        self.outcomes
            .iter()
            .map(|(_, o)| *o == RowOutcome::Persisted)
            .collect()
    }

    pub fn count(&self, outcome: RowOutcome) -> usize {
        self.outcomes.iter().filter(|(_, o)| *o == outcome).count()
    }

    pub fn persisted(&self) -> usize {
        self.count(RowOutcome::Persisted)
    }

    /// 仍待下一轮重试的行号
    pub fn unresolved_lines(&self) -> Vec<usize> {
        self.outcomes
            .iter()
            .filter(|(_, o)| !o.is_settled())
            .map(|(line, _)| *line)
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.outcomes.iter().all(|(_, o)| o.is_settled())
    }
}

// ==========================================
// FileSummary / ImportReport - 汇总
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSummary {
    pub entity: String,
    pub total_rows: usize,
    pub persisted: usize,
    pub malformed: usize,
    pub rejected: usize,
    /// 终止时仍未解析的行数（仅失败时非零）
    pub unresolved: usize,
    /// 参与的轮次（独立表为 1）
    pub passes: usize,
}

impl FileSummary {
    pub fn new(entity: impl Into<String>, total_rows: usize) -> Self {
        Self {
            entity: entity.into(),
            total_rows,
            ..Default::default()
        }
    }

    /// 累加一次导入的结果；unresolved 取最近一次
    pub fn absorb(&mut self, result: &FileImportResult) {
        self.persisted += result.count(RowOutcome::Persisted);
        self.malformed += result.count(RowOutcome::Malformed);
        self.rejected += result.count(RowOutcome::Rejected);
        self.unresolved = result.count(RowOutcome::Unresolved);
        self.passes += 1;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportReport {
    pub run_id: String,
    pub files: Vec<FileSummary>,
    pub dependent_passes: usize,
    pub elapsed_ms: u128,
}

impl ImportReport {
    pub fn total_persisted(&self) -> usize {
        self.files.iter().map(|f| f.persisted).sum()
    }

    pub fn file(&self, entity: &str) -> Option<&FileSummary> {
        self.files.iter().find(|f| f.entity == entity)
    }
}
