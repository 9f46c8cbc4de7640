// ==========================================
// 影评平台 - 引擎层
// ==========================================
// 职责: 数据文件发现、分类与按依赖顺序调度导入
// ==========================================

pub mod scheduler;

// 重导出核心调度器
pub use scheduler::{DependencyScheduler, SchedulerState};
