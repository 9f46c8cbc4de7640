// ==========================================
// 影评平台 - 领域类型定义
// ==========================================
// 用户角色 / 字段类型 / 空值策略
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 用户角色 (Role)
// ==========================================
// 权限递增: User < Moderator < Admin
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Moderator,
    Admin,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::User, Role::Moderator, Role::Admin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Moderator => "moderator",
            Role::Admin => "admin",
        }
    }

    /// 从数据库/CSV 字符串解析（大小写不敏感）
    pub fn parse(value: &str) -> Option<Role> {
        let value = value.trim();
        Role::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(value))
    }
}

impl Default for Role {
    fn default() -> Self {
        Role::User
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 字段类型 (FieldKind)
// ==========================================
// 决定 CSV 原始字符串如何转换为存储值
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// 整数主键
    Id,
    /// 布尔标记，存为 0/1
    Flag,
    Text { max_len: Option<usize> },
    /// [-a-zA-Z0-9_]，最长 50
    Slug,
    Email,
    /// [\w.@+-]，最长 150，禁止 "me"
    Username,
    Role,
    /// 不晚于当前年份
    Year,
    /// 1..=10
    Score,
    /// RFC3339 / "YYYY-MM-DD HH:MM:SS" / "YYYY-MM-DD"
    Timestamp,
    /// 指向另一实体的 id
    Reference,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::Id => write!(f, "id"),
            FieldKind::Flag => write!(f, "flag"),
            FieldKind::Text { max_len: Some(n) } => write!(f, "text({})", n),
            FieldKind::Text { max_len: None } => write!(f, "text"),
            FieldKind::Slug => write!(f, "slug"),
            FieldKind::Email => write!(f, "email"),
            FieldKind::Username => write!(f, "username"),
            FieldKind::Role => write!(f, "role"),
            FieldKind::Year => write!(f, "year"),
            FieldKind::Score => write!(f, "score"),
            FieldKind::Timestamp => write!(f, "timestamp"),
            FieldKind::Reference => write!(f, "reference"),
        }
    }
}

// ==========================================
// 空值策略 (WhenEmpty)
// ==========================================
// 单元格为空或整列缺失时的处理
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WhenEmpty {
    /// 行不合法，跳过
    Reject,
    /// 写入 NULL
    Null,
    /// 按字段类型转换此默认值
    Default(&'static str),
    /// 写入当前时间
    Now,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_ordering() {
        assert!(Role::User < Role::Moderator);
        assert!(Role::Moderator < Role::Admin);
    }

    #[test]
    fn test_role_parse_and_display() {
        assert_eq!(Role::parse(" Moderator "), Some(Role::Moderator));
        assert_eq!(Role::parse("root"), None);
        assert_eq!(Role::Admin.to_string(), "admin");
        assert_eq!(Role::default(), Role::User);
    }
}
