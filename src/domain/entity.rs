// ==========================================
// 影评平台 - 实体描述与注册表
// ==========================================
// 职责: 静态声明每张表的字段、外键字段、表头别名
// 约束: 注册表启动时构建一次，之后只读，显式传给导入器和调度器
// ==========================================

use crate::domain::types::{FieldKind, WhenEmpty};
use std::fmt;

// ==========================================
// FieldDescriptor - 字段描述
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub kind: FieldKind,
    pub when_empty: WhenEmpty,
    /// 外键目标实体名
    pub references: Option<&'static str>,
    /// 除字段名外可接受的表头
    pub aliases: Vec<&'static str>,
}

impl FieldDescriptor {
    /// 必填字段
    pub fn new(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            when_empty: WhenEmpty::Reject,
            references: None,
            aliases: Vec::new(),
        }
    }

    /// 整数主键；为空时由数据库分配
    pub fn id() -> Self {
        Self::new("id", FieldKind::Id).when_empty(WhenEmpty::Null)
    }

    /// 外键字段，自动接受 `<name>_id` 表头
    pub fn reference(name: &'static str, target: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Reference,
            when_empty: WhenEmpty::Reject,
            references: Some(target),
            aliases: Vec::new(),
        }
    }

    pub fn when_empty(mut self, policy: WhenEmpty) -> Self {
        self.when_empty = policy;
        self
    }

    pub fn optional(self) -> Self {
        self.when_empty(WhenEmpty::Null)
    }

    pub fn alias(mut self, header: &'static str) -> Self {
        self.aliases.push(header);
        self
    }

    pub fn is_reference(&self) -> bool {
        self.references.is_some()
    }

    /// 数据库列名（外键列为 `<name>_id`）
    pub fn column(&self) -> String {
        if self.is_reference() {
            format!("{}_id", self.name)
        } else {
            self.name.to_string()
        }
    }

    /// 表头是否指向本字段（大小写不敏感）
    pub fn matches_header(&self, header: &str) -> bool {
        let header = header.trim();
        if self.name.eq_ignore_ascii_case(header) {
            return true;
        }
        if self.is_reference() && self.column().eq_ignore_ascii_case(header) {
            return true;
        }
        self.aliases.iter().any(|a| a.eq_ignore_ascii_case(header))
    }
}

// ==========================================
// EntityDescriptor - 实体描述
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityDescriptor {
    /// 实体名 = 表名 = 数据文件名（不含扩展名）
    pub name: &'static str,
    pub fields: Vec<FieldDescriptor>,
}

impl EntityDescriptor {
    pub fn new(name: &'static str, fields: Vec<FieldDescriptor>) -> Self {
        Self { name, fields }
    }

    pub fn field_names(&self) -> Vec<&'static str> {
        self.fields.iter().map(|f| f.name).collect()
    }

    pub fn reference_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|f| f.is_reference())
    }

    /// 是否含外键（依赖表）
    pub fn is_dependent(&self) -> bool {
        self.reference_fields().next().is_some()
    }

    /// 按表头查找字段（字段名优先于别名）
    pub fn field_for_header(&self, header: &str) -> Option<&FieldDescriptor> {
        let header = header.trim();
        self.fields
            .iter()
            .find(|f| f.name.eq_ignore_ascii_case(header))
            .or_else(|| self.fields.iter().find(|f| f.matches_header(header)))
    }
}

impl fmt::Display for EntityDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

// ==========================================
// EntityRegistry - 实体注册表
// ==========================================
#[derive(Debug, Clone)]
pub struct EntityRegistry {
    // 声明顺序即导入顺序
    entities: Vec<EntityDescriptor>,
}

impl EntityRegistry {
    pub fn new(entities: Vec<EntityDescriptor>) -> Self {
        Self { entities }
    }

    /// 影评平台的标准实体集
    pub fn standard() -> Self {
        Self::new(vec![
            EntityDescriptor::new(
                "user",
                vec![
                    FieldDescriptor::id(),
                    FieldDescriptor::new("username", FieldKind::Username),
                    FieldDescriptor::new("email", FieldKind::Email),
                    FieldDescriptor::new("role", FieldKind::Role)
                        .when_empty(WhenEmpty::Default("user")),
                    FieldDescriptor::new("bio", FieldKind::Text { max_len: None })
                        .when_empty(WhenEmpty::Default("")),
                    FieldDescriptor::new("first_name", FieldKind::Text { max_len: Some(150) })
                        .when_empty(WhenEmpty::Default("")),
                    FieldDescriptor::new("last_name", FieldKind::Text { max_len: Some(150) })
                        .when_empty(WhenEmpty::Default("")),
                    FieldDescriptor::new("is_staff", FieldKind::Flag)
                        .when_empty(WhenEmpty::Default("false")),
                ],
            ),
            EntityDescriptor::new(
                "category",
                vec![
                    FieldDescriptor::id(),
                    FieldDescriptor::new("name", FieldKind::Text { max_len: Some(256) }),
                    FieldDescriptor::new("slug", FieldKind::Slug),
                ],
            ),
            EntityDescriptor::new(
                "genre",
                vec![
                    FieldDescriptor::id(),
                    FieldDescriptor::new("name", FieldKind::Text { max_len: Some(256) }),
                    FieldDescriptor::new("slug", FieldKind::Slug),
                ],
            ),
            EntityDescriptor::new(
                "title",
                vec![
                    FieldDescriptor::id(),
                    FieldDescriptor::new("name", FieldKind::Text { max_len: Some(256) }),
                    FieldDescriptor::new("year", FieldKind::Year),
                    FieldDescriptor::reference("category", "category").optional(),
                    FieldDescriptor::new("description", FieldKind::Text { max_len: None })
                        .optional(),
                ],
            ),
            EntityDescriptor::new(
                "title_genre",
                vec![
                    FieldDescriptor::id(),
                    FieldDescriptor::reference("title", "title"),
                    FieldDescriptor::reference("genre", "genre"),
                ],
            ),
            EntityDescriptor::new(
                "review",
                vec![
                    FieldDescriptor::id(),
                    FieldDescriptor::reference("title", "title"),
                    FieldDescriptor::new("text", FieldKind::Text { max_len: None }),
                    FieldDescriptor::reference("author", "user").alias("user"),
                    FieldDescriptor::new("score", FieldKind::Score),
                    FieldDescriptor::new("pub_date", FieldKind::Timestamp)
                        .when_empty(WhenEmpty::Now),
                ],
            ),
            EntityDescriptor::new(
                "comment",
                vec![
                    FieldDescriptor::id(),
                    FieldDescriptor::reference("review", "review"),
                    FieldDescriptor::new("text", FieldKind::Text { max_len: None }),
                    FieldDescriptor::reference("author", "user").alias("user"),
                    FieldDescriptor::new("pub_date", FieldKind::Timestamp)
                        .when_empty(WhenEmpty::Now),
                ],
            ),
        ])
    }

    /// 按名称查找（大小写不敏感）
    pub fn get(&self, name: &str) -> Option<&EntityDescriptor> {
        let name = name.trim();
        self.entities
            .iter()
            .find(|e| e.name.eq_ignore_ascii_case(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.entities.iter().map(|e| e.name).collect()
    }

    /// 声明顺序中的位置，用于稳定排序
    pub fn position(&self, name: &str) -> Option<usize> {
        self.entities
            .iter()
            .position(|e| e.name.eq_ignore_ascii_case(name.trim()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &EntityDescriptor> {
        self.entities.iter()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// 外键指向未注册实体的字段: (实体, 字段, 目标)
    pub fn dangling_references(&self) -> Vec<(&'static str, &'static str, &'static str)> {
        let mut dangling = Vec::new();
        for entity in &self.entities {
            for field in entity.reference_fields() {
                if let Some(target) = field.references {
                    if !self.contains(target) {
                        dangling.push((entity.name, field.name, target));
                    }
                }
            }
        }
        dangling
    }
}
