// ==========================================
// 影评平台 - 配置层
// ==========================================
// 职责: 导入工具运行参数（数据目录 / 数据库 / 语言）
// ==========================================

pub mod loader_config;

// 重导出核心配置
pub use loader_config::{get_default_db_path, LoaderConfig};
