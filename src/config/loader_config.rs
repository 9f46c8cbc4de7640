// ==========================================
// 影评平台 - 导入工具配置
// ==========================================
// 来源: 环境变量（命令行不接受参数）
// - MEDIA_REVIEWS_DATA_DIR: 数据目录（默认 static/data）
// - MEDIA_REVIEWS_DB_PATH:  数据库文件（默认用户数据目录）
// - MEDIA_REVIEWS_LOCALE:   输出语言（zh-CN / en）
// - MEDIA_REVIEWS_LOG_FORMAT: stderr 日志格式（text / json）
// 空白值视为未设置
// ==========================================

use crate::logging::LogFormat;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const ENV_DATA_DIR: &str = "MEDIA_REVIEWS_DATA_DIR";
pub const ENV_DB_PATH: &str = "MEDIA_REVIEWS_DB_PATH";
pub const ENV_LOCALE: &str = "MEDIA_REVIEWS_LOCALE";
pub const ENV_LOG_FORMAT: &str = "MEDIA_REVIEWS_LOG_FORMAT";

pub const DEFAULT_DATA_DIR: &str = "static/data";
pub const DEFAULT_DB_FILE: &str = "media_reviews.db";
pub const DEFAULT_LOCALE: &str = "zh-CN";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoaderConfig {
    pub data_dir: PathBuf,
    pub db_path: String,
    pub locale: String,
    pub log_format: LogFormat,
}

impl LoaderConfig {
    /// 从进程环境变量读取
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 从任意键值来源读取（便于测试）
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        Self {
            data_dir: get(ENV_DATA_DIR)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
            db_path: get(ENV_DB_PATH).unwrap_or_else(get_default_db_path),
            locale: get(ENV_LOCALE).unwrap_or_else(|| DEFAULT_LOCALE.to_string()),
            log_format: get(ENV_LOG_FORMAT)
                .map(|v| LogFormat::parse(&v))
                .unwrap_or_default(),
        }
    }
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

/// 默认数据库路径
///
/// 优先用户数据目录（开发构建使用独立目录，避免污染正式数据），
/// 拿不到时回退到当前目录
pub fn get_default_db_path() -> String {
    let app_dir = dirs::data_dir().map(|d| app_dir_in(&d));

    // 目录创建失败时保持当前目录回退值
    let usable = app_dir.filter(|dir| std::fs::create_dir_all(dir).is_ok());
    db_path_in(usable.as_deref()).to_string_lossy().to_string()
}

/// 用户数据目录下的应用目录
fn app_dir_in(data_dir: &Path) -> PathBuf {
    if cfg!(debug_assertions) {
        data_dir.join("media-reviews-dev")
    } else {
        data_dir.join("media-reviews")
    }
}

/// 数据库文件路径；没有应用目录时落在当前目录
fn db_path_in(app_dir: Option<&Path>) -> PathBuf {
    match app_dir {
        Some(dir) => dir.join(DEFAULT_DB_FILE),
        None => PathBuf::from(".").join(DEFAULT_DB_FILE),
    }
}
