// ==========================================
// 影评平台 - 字段值校验与类型转换
// ==========================================
// 职责: 原始字符串 → 存储值（按 FieldKind）
// 规则: 用户名 / slug / 年份 / 评分 与 Web 层的模型校验保持一致
// 失败: 返回原因字符串，由调用方记为行级 Malformed
// ==========================================

use crate::domain::record::FieldValue;
use crate::domain::types::{FieldKind, Role};
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

static USERNAME_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\w.@+-]+$").unwrap());
static SLUG_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[-a-zA-Z0-9_]+$").unwrap());
static EMAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap());

pub const USERNAME_MAX_LEN: usize = 150;
pub const SLUG_MAX_LEN: usize = 50;
pub const EMAIL_MAX_LEN: usize = 254;
pub const SCORE_MIN: i64 = 1;
pub const SCORE_MAX: i64 = 10;

/// 保留用户名（与个人资料路由冲突）
const RESERVED_USERNAMES: [&str; 1] = ["me"];

pub struct DqValidator {
    current_year: i32,
}

impl DqValidator {
    pub fn new(current_year: i32) -> Self {
        Self { current_year }
    }

    /// 转换单个非空值
    pub fn coerce(&self, kind: FieldKind, value: &str) -> Result<FieldValue, String> {
        match kind {
            FieldKind::Id | FieldKind::Reference => {
                let id = parse_integer(value)?;
                if id <= 0 {
                    return Err(format!("标识符必须为正整数: {}", value));
                }
                Ok(FieldValue::Integer(id))
            }
            FieldKind::Flag => parse_flag(value).map(|b| FieldValue::Integer(b as i64)),
            FieldKind::Text { max_len } => {
                if let Some(max) = max_len {
                    check_len(value, max)?;
                }
                Ok(FieldValue::Text(value.to_string()))
            }
            FieldKind::Slug => {
                check_len(value, SLUG_MAX_LEN)?;
                if !SLUG_PATTERN.is_match(value) {
                    return Err(format!("slug 只能包含字母、数字、- 和 _: {}", value));
                }
                Ok(FieldValue::Text(value.to_string()))
            }
            FieldKind::Email => {
                check_len(value, EMAIL_MAX_LEN)?;
                if !EMAIL_PATTERN.is_match(value) {
                    return Err(format!("邮箱格式错误: {}", value));
                }
                Ok(FieldValue::Text(value.to_lowercase()))
            }
            FieldKind::Username => {
                validate_username(value)?;
                Ok(FieldValue::Text(value.to_string()))
            }
            FieldKind::Role => Role::parse(value)
                .map(|r| FieldValue::Text(r.as_str().to_string()))
                .ok_or_else(|| format!("未知角色: {}", value)),
            FieldKind::Year => {
                let year = parse_integer(value)?;
                if year > self.current_year as i64 {
                    return Err(format!(
                        "年份 {} 不能晚于当前年份 {}",
                        year, self.current_year
                    ));
                }
                Ok(FieldValue::Integer(year))
            }
            FieldKind::Score => {
                let score = parse_integer(value)?;
                if !(SCORE_MIN..=SCORE_MAX).contains(&score) {
                    return Err(format!(
                        "评分 {} 超出范围 [{}, {}]",
                        score, SCORE_MIN, SCORE_MAX
                    ));
                }
                Ok(FieldValue::Integer(score))
            }
            FieldKind::Timestamp => parse_timestamp(value).map(FieldValue::Text),
        }
    }
}

impl Default for DqValidator {
    fn default() -> Self {
        Self::new(chrono::Local::now().year())
    }
}

/// 用户名校验：字符集、长度、保留字
pub fn validate_username(value: &str) -> Result<(), String> {
    check_len(value, USERNAME_MAX_LEN)?;
    // 区分大小写："ME" 可用
    if RESERVED_USERNAMES.contains(&value) {
        return Err(format!("用户名 {} 为保留名称", value));
    }
    if !USERNAME_PATTERN.is_match(value) {
        return Err(format!("用户名只能包含字母、数字和 @/./+/-/_: {}", value));
    }
    Ok(())
}

/// 当前时间（存储格式）
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn parse_integer(value: &str) -> Result<i64, String> {
    value
        .parse::<i64>()
        .map_err(|_| format!("无法解析为整数: {}", value))
}

fn parse_flag(value: &str) -> Result<bool, String> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "t" | "yes" | "y" => Ok(true),
        "0" | "false" | "f" | "no" | "n" => Ok(false),
        _ => Err(format!("无法解析为布尔值: {}", value)),
    }
}

fn check_len(value: &str, max: usize) -> Result<(), String> {
    let len = value.chars().count();
    if len > max {
        return Err(format!("长度 {} 超过上限 {}", len, max));
    }
    Ok(())
}

/// 统一为 UTC RFC3339
fn parse_timestamp(value: &str) -> Result<String, String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt
            .with_timezone(&Utc)
            .to_rfc3339_opts(SecondsFormat::Secs, true));
    }

    let naive = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f"))
        .or_else(|_| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .map(|d| d.and_time(NaiveTime::default()))
        })
        .map_err(|_| format!("日期时间格式错误: {}", value))?;

    Ok(DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc)
        .to_rfc3339_opts(SecondsFormat::Secs, true))
}
