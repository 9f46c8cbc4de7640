// ==========================================
// 影评平台 - 导入层
// ==========================================
// 职责: CSV 数据文件 → 实体表
// 流程: 解析 → 表头绑定 → 清洗/校验 → 外键解析 → 落库
// ==========================================

// 模块声明
pub mod data_cleaner;
pub mod dq_validator;
pub mod error;
pub mod field_mapper;
pub mod file_parser;
pub mod record_importer;

// 重导出核心类型
pub use data_cleaner::DataCleaner;
pub use dq_validator::DqValidator;
pub use error::{ImportError, ImportResult};
pub use field_mapper::{FieldMapper, HeaderBinding};
pub use file_parser::CsvParser;
pub use record_importer::RecordImporter;
