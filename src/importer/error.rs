// ==========================================
// 影评平台 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// 分级: 致命（中止整次导入） / 行级（跳过或下一轮重试，不走这里）
// ==========================================

use crate::repository::RepositoryError;
use thiserror::Error;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 文件相关错误 =====
    #[error("文件不存在: {0}")]
    FileNotFound(String),

    #[error("文件格式不支持: {0}（仅支持 .csv）")]
    UnsupportedFormat(String),

    #[error("文件读取失败: {0}")]
    FileReadError(String),

    #[error("CSV 解析失败: {0}")]
    CsvParseError(String),

    #[error("文件 {0} 没有表头")]
    MissingHeader(String),

    // ===== 发现阶段错误 =====
    #[error("目录 {dir} 中没有可导入的文件")]
    NoDataFiles { dir: String },

    #[error(
        "目录 {dir} 中的文件 [{}] 没有对应的表，可用名称: [{}]",
        .files.join(", "),
        .known.join(", ")
    )]
    UnknownFiles {
        dir: String,
        files: Vec<String>,
        known: Vec<String>,
    },

    #[error("目录 {dir} 中的文件 [{}] 都对应表 {entity}，每张表只能有一个数据文件", .files.join(", "))]
    DuplicateDataFile {
        dir: String,
        entity: String,
        files: Vec<String>,
    },

    #[error("实体 {entity} 的字段 {field} 指向未注册的实体 {target}")]
    InvalidRegistry {
        entity: String,
        field: String,
        target: String,
    },

    // ===== 表头映射错误 =====
    #[error("表 {entity} 的列名 {column} 不匹配，可用字段: [{}]", .fields.join(", "))]
    SchemaMismatch {
        entity: String,
        column: String,
        fields: Vec<String>,
    },

    #[error("表 {entity} 的列 {column} 与前面的列映射到同一字段 {field}")]
    DuplicateColumn {
        entity: String,
        column: String,
        field: String,
    },

    // ===== 依赖导入错误 =====
    #[error(
        "第 {pass} 轮没有任何进展，表 [{}] 中仍有 {pending_rows} 行数据引用不存在的记录，请检查 CSV",
        .files.join(", ")
    )]
    StalledImport {
        pass: usize,
        files: Vec<String>,
        pending_rows: usize,
    },

    // ===== 行级错误（仅用于构造失败描述） =====
    #[error("类型转换失败 (行 {row}, 字段 {field}): {message}")]
    TypeConversionError {
        row: usize,
        field: String,
        message: String,
    },

    // ===== 数据库错误 =====
    #[error("数据库操作失败: {0}")]
    Repository(#[from] RepositoryError),

    // ===== 通用错误 =====
    #[error("内部错误: {0}")]
    InternalError(String),
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

// 实现 From<rusqlite::Error>
impl From<rusqlite::Error> for ImportError {
    fn from(err: rusqlite::Error) -> Self {
        ImportError::Repository(err.into())
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_offenders() {
        let err = ImportError::StalledImport {
            pass: 2,
            files: vec!["comment".to_string(), "review".to_string()],
            pending_rows: 5,
        };
        let msg = err.to_string();
        assert!(msg.contains("comment, review"));
        assert!(msg.contains("第 2 轮"));

        let err = ImportError::SchemaMismatch {
            entity: "genre".to_string(),
            column: "title".to_string(),
            fields: vec!["id".to_string(), "name".to_string(), "slug".to_string()],
        };
        assert!(err.to_string().contains("id, name, slug"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert!(matches!(ImportError::from(io), ImportError::FileReadError(_)));
    }
}
