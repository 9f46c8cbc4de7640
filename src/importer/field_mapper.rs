// ==========================================
// 影评平台 - 字段映射器
// ==========================================
// 职责: 表头 → 实体字段（含别名）绑定 + 行级类型转换
// 约束: 表头绑定在写入任何一行之前完成，未知列直接中止整次导入
// ==========================================

use crate::domain::entity::{EntityDescriptor, FieldDescriptor};
use crate::domain::record::{BoundRow, BoundValue, FieldValue, RawRow};
use crate::domain::types::WhenEmpty;
use crate::importer::data_cleaner::DataCleaner;
use crate::importer::dq_validator::{now_timestamp, DqValidator};
use crate::importer::error::{ImportError, ImportResult};

// ==========================================
// HeaderBinding - 表头与字段的对应关系
// ==========================================
#[derive(Debug)]
pub struct HeaderBinding<'a> {
    entity: &'a EntityDescriptor,
    // 与表头按位置对齐
    columns: Vec<&'a FieldDescriptor>,
}

impl<'a> HeaderBinding<'a> {
    /// 字段对应的列下标
    pub fn column_of(&self, field: &str) -> Option<usize> {
        self.columns.iter().position(|f| f.name == field)
    }

    /// 各列绑定到的字段名
    pub fn field_names(&self) -> Vec<&'static str> {
        self.columns.iter().map(|f| f.name).collect()
    }
}

pub struct FieldMapper {
    cleaner: DataCleaner,
    validator: DqValidator,
}

impl FieldMapper {
    pub fn new(validator: DqValidator) -> Self {
        Self {
            cleaner: DataCleaner,
            validator,
        }
    }

    /// 绑定表头
    ///
    /// # 错误
    /// - SchemaMismatch: 列名既不是字段名也不是别名
    /// - DuplicateColumn: 两列指向同一字段
    pub fn bind_headers<'a>(
        &self,
        entity: &'a EntityDescriptor,
        headers: &[String],
    ) -> ImportResult<HeaderBinding<'a>> {
        let mut columns: Vec<&'a FieldDescriptor> = Vec::with_capacity(headers.len());

        for header in headers {
            let field = entity
                .field_for_header(header)
                .ok_or_else(|| ImportError::SchemaMismatch {
                    entity: entity.name.to_string(),
                    column: header.clone(),
                    fields: entity.field_names().iter().map(|f| f.to_string()).collect(),
                })?;

            if columns.iter().any(|f| f.name == field.name) {
                return Err(ImportError::DuplicateColumn {
                    entity: entity.name.to_string(),
                    column: header.clone(),
                    field: field.name.to_string(),
                });
            }
            columns.push(field);
        }

        Ok(HeaderBinding { entity, columns })
    }

    /// 行 → 绑定行
    ///
    /// 表头中缺失的字段按空值处理；任一字段转换失败则整行不合法
    pub fn map_row(&self, binding: &HeaderBinding<'_>, row: &RawRow) -> ImportResult<BoundRow> {
        let mut values = Vec::with_capacity(binding.entity.fields.len());

        for field in &binding.entity.fields {
            let raw = binding.column_of(field.name).map(|idx| row.get(idx));
            let value = self.convert(field, raw).map_err(|message| {
                ImportError::TypeConversionError {
                    row: row.line,
                    field: field.name.to_string(),
                    message,
                }
            })?;

            values.push(BoundValue {
                field: field.name,
                column: field.column(),
                value,
                references: field.references,
            });
        }

        Ok(BoundRow {
            line: row.line,
            values,
        })
    }

    fn convert(&self, field: &FieldDescriptor, raw: Option<&str>) -> Result<FieldValue, String> {
        match self.cleaner.normalize_null(raw) {
            Some(value) => self.validator.coerce(field.kind, &value),
            None => match field.when_empty {
                WhenEmpty::Reject => Err("必填字段为空".to_string()),
                WhenEmpty::Null => Ok(FieldValue::Null),
                WhenEmpty::Default(default) => self.validator.coerce(field.kind, default),
                WhenEmpty::Now => Ok(FieldValue::Text(now_timestamp())),
            },
        }
    }
}

impl Default for FieldMapper {
    fn default() -> Self {
        Self::new(DqValidator::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::EntityRegistry;

    fn headers(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn row(line: usize, items: &[&str]) -> RawRow {
        RawRow {
            line,
            values: items.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn mapper() -> FieldMapper {
        FieldMapper::new(DqValidator::new(2024))
    }

    #[test]
    fn test_unknown_header_is_schema_mismatch() {
        let registry = EntityRegistry::standard();
        let genre = registry.get("genre").unwrap();
        let err = mapper()
            .bind_headers(genre, &headers(&["id", "name", "slugg"]))
            .unwrap_err();
        match err {
            ImportError::SchemaMismatch { entity, column, .. } => {
                assert_eq!(entity, "genre");
                assert_eq!(column, "slugg");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_alias_and_canonical_name_for_same_field_conflict() {
        let registry = EntityRegistry::standard();
        let review = registry.get("review").unwrap();
        let err = mapper()
            .bind_headers(review, &headers(&["author", "user"]))
            .unwrap_err();
        assert!(matches!(err, ImportError::DuplicateColumn { .. }));
    }

    #[test]
    fn test_map_review_row_with_alias_and_defaults() {
        let registry = EntityRegistry::standard();
        let review = registry.get("review").unwrap();
        let m = mapper();
        let binding = m
            .bind_headers(review, &headers(&["id", "title_id", "text", "user", "score"]))
            .unwrap();
        assert_eq!(binding.field_names(), vec!["id", "title", "text", "author", "score"]);

        let bound = m.map_row(&binding, &row(2, &["1", "3", "Отлично", "100", "9"])).unwrap();
        assert_eq!(bound.value_of("author"), Some(&FieldValue::Integer(100)));
        assert!(matches!(bound.value_of("pub_date"), Some(FieldValue::Text(_))));

        let refs: Vec<_> = bound.references().collect();
        assert_eq!(refs, vec![("title", "title", 3), ("author", "user", 100)]);
        assert_eq!(bound.values[1].column, "title_id");
    }

    #[test]
    fn test_empty_required_value_is_rejected() {
        let registry = EntityRegistry::standard();
        let category = registry.get("category").unwrap();
        let m = mapper();
        let binding = m.bind_headers(category, &headers(&["id", "name", "slug"])).unwrap();

        let err = m.map_row(&binding, &row(3, &["1", "Фильм", ""])).unwrap_err();
        assert!(matches!(
            err,
            ImportError::TypeConversionError { row: 3, ref field, .. } if field == "slug"
        ));
    }

    #[test]
    fn test_optional_reference_and_missing_columns() {
        let registry = EntityRegistry::standard();
        let title = registry.get("title").unwrap();
        let m = mapper();
        let binding = m.bind_headers(title, &headers(&["name", "year", "category"])).unwrap();

        let bound = m.map_row(&binding, &row(2, &["Побег", "1994", ""])).unwrap();
        assert_eq!(bound.value_of("id"), Some(&FieldValue::Null));
        assert_eq!(bound.value_of("category"), Some(&FieldValue::Null));
        assert_eq!(bound.value_of("description"), Some(&FieldValue::Null));
        assert_eq!(bound.references().count(), 0);
    }

    #[test]
    fn test_user_defaults() {
        let registry = EntityRegistry::standard();
        let user = registry.get("user").unwrap();
        let m = mapper();
        let binding = m.bind_headers(user, &headers(&["id", "username", "email"])).unwrap();

        let bound = m.map_row(&binding, &row(2, &["5", "bingobongo", "bingo@yamdb.fake"])).unwrap();
        assert_eq!(bound.value_of("role"), Some(&FieldValue::Text("user".to_string())));
        assert_eq!(bound.value_of("bio"), Some(&FieldValue::Text(String::new())));
        assert_eq!(bound.value_of("is_staff"), Some(&FieldValue::Integer(0)));
    }
}
