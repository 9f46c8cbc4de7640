// ==========================================
// 影评平台 - 通用记录仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 约束: 表名/列名来自静态实体描述，值一律参数化
// ==========================================

use crate::domain::record::{BoundRow, FieldValue};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection};
use std::sync::{Arc, Mutex};
use tracing::trace;

// ==========================================
// RecordStore Trait
// ==========================================
// 用途: 导入器写入/查询的唯一出口
// 实现者: RecordRepository（SQLite）
pub trait RecordStore {
    /// id 为 `id` 的记录是否存在于实体表
    fn exists(&self, entity: &str, id: i64) -> RepositoryResult<bool>;

    /// 写入一行，返回 rowid；每次调用单独提交
    fn insert(&self, entity: &str, row: &BoundRow) -> RepositoryResult<i64>;

    /// 实体表行数
    fn count(&self, entity: &str) -> RepositoryResult<i64>;
}

// ==========================================
// RecordRepository - SQLite 实现
// ==========================================
pub struct RecordRepository {
    conn: Arc<Mutex<Connection>>,
}

impl RecordRepository {
    /// 打开数据库并应用统一 PRAGMA
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = crate::db::open_sqlite_connection(db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }
}

impl RecordStore for RecordRepository {
    fn exists(&self, entity: &str, id: i64) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT EXISTS(SELECT 1 FROM {} WHERE id = ?1)", quote_ident(entity));
        let found: i64 = conn.query_row(&sql, params![id], |row| row.get(0))?;
        Ok(found != 0)
    }

    fn insert(&self, entity: &str, row: &BoundRow) -> RepositoryResult<i64> {
        if row.values.is_empty() {
            return Err(RepositoryError::InternalError(format!(
                "空行无法写入 {} (行 {})",
                entity, row.line
            )));
        }

        let columns: Vec<String> = row.values.iter().map(|v| quote_ident(&v.column)).collect();
        let placeholders: Vec<String> = (1..=row.values.len()).map(|i| format!("?{}", i)).collect();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_ident(entity),
            columns.join(", "),
            placeholders.join(", ")
        );
        trace!(sql = %sql, line = row.line, "写入记录");

        let values: Vec<Value> = row.values.iter().map(|v| to_sql_value(&v.value)).collect();

        let conn = self.get_conn()?;
        conn.execute(&sql, params_from_iter(values))?;
        Ok(conn.last_insert_rowid())
    }

    fn count(&self, entity: &str) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT COUNT(*) FROM {}", quote_ident(entity));
        let n: i64 = conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(n)
    }
}

/// SQLite 标识符加引号（"user" 等关键字表名）
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn to_sql_value(value: &FieldValue) -> Value {
    match value {
        FieldValue::Null => Value::Null,
        FieldValue::Integer(v) => Value::Integer(*v),
        FieldValue::Text(v) => Value::Text(v.clone()),
    }
}
