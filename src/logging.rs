// ==========================================
// 影评平台 - 导入工具日志
// ==========================================
// 输出分工: stdout 只打印逐文件结果与汇总（给操作员看），
//           诊断日志全部写 stderr，便于重定向或交给日志采集
// 级别: RUST_LOG（默认 info）
// 格式: MEDIA_REVIEWS_LOG_FORMAT = text | json
// ==========================================

use serde::{Deserialize, Serialize};
use tracing_subscriber::{fmt, EnvFilter};

/// stderr 日志格式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// 人读文本
    #[default]
    Text,
    /// 每行一个 JSON 对象（含 import_run span 的 run_id）
    Json,
}

impl LogFormat {
    /// 未知取值回退为文本格式
    pub fn parse(value: &str) -> LogFormat {
        if value.trim().eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Text
        }
    }
}

/// 初始化导入工具日志
///
/// # 示例
/// ```no_run
/// use media_reviews::logging::{self, LogFormat};
/// logging::init(LogFormat::Text);
/// ```
pub fn init(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_line_number(true)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().with_current_span(true).init(),
    }
}

/// 测试用日志: debug 级别，写入测试输出；可重复调用
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}
