// ==========================================
// 影评平台 (YaMDb) - 数据导入核心库
// ==========================================
// 职责: 将 CSV 数据文件批量导入关系库
// 技术栈: Rust + SQLite
// 组成: 记录导入器 + 依赖调度器
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "zh-CN");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体描述与导入记录
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 导入层 - 解析/映射/写入
pub mod importer;

// 引擎层 - 依赖调度
pub mod engine;

// 配置层 - 运行参数
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA/建表）
pub mod db;

// 日志系统
pub mod logging;

// 国际化
pub mod i18n;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{FieldKind, Role, WhenEmpty};

// 领域实体
pub use domain::{
    EntityDescriptor, EntityRegistry, FieldDescriptor, FileImportResult, FileSummary,
    ImportReport, RowOutcome,
};

// 导入与调度
pub use engine::{DependencyScheduler, SchedulerState};
pub use importer::{ImportError, ImportResult, RecordImporter};

// 仓储
pub use repository::{RecordRepository, RecordStore, RepositoryError};

// 配置
pub use config::LoaderConfig;

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "YaMDb 数据导入";
