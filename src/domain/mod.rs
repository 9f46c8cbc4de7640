// ==========================================
// 影评平台 - 领域模型层
// ==========================================
// 职责: 实体描述、字段类型、导入记录与报告
// 红线: 不含数据访问逻辑,不含导入流程
// ==========================================

pub mod entity;
pub mod record;
pub mod types;

// 重导出核心类型
pub use entity::{EntityDescriptor, EntityRegistry, FieldDescriptor};
pub use record::{
    BoundRow, BoundValue, DataFile, FieldValue, FileImportResult, FileSummary, ImportReport,
    RawRow, RowFailure, RowOutcome,
};
pub use types::{FieldKind, Role, WhenEmpty};
