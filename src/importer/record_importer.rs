// ==========================================
// 影评平台 - 记录导入器
// ==========================================
// 职责: 单个数据文件 → 实体表
// 流程: 表头绑定 → 逐行映射 → 外键解析（依赖表） → 逐行写入
// ==========================================
// 约束:
// - 表头不匹配时在写入任何一行之前中止
// - 每行单独提交，同一文件内允许部分成功
// - 外键缺失(Unresolved) 与其他写入失败(Rejected) 分开记录
// ==========================================

use crate::domain::entity::{EntityDescriptor, EntityRegistry};
use crate::domain::record::{BoundRow, DataFile, FileImportResult, RawRow, RowFailure, RowOutcome};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::field_mapper::FieldMapper;
use crate::repository::RecordStore;
use std::collections::BTreeSet;
use tracing::{debug, info, instrument, warn};

pub struct RecordImporter<'r, S>
where
    S: RecordStore,
{
    registry: &'r EntityRegistry,
    store: S,
    mapper: FieldMapper,
}

impl<'r, S> RecordImporter<'r, S>
where
    S: RecordStore,
{
    pub fn new(registry: &'r EntityRegistry, store: S, mapper: FieldMapper) -> Self {
        Self {
            registry,
            store,
            mapper,
        }
    }

    pub fn registry(&self) -> &'r EntityRegistry {
        self.registry
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// 导入独立表（无外键）
    ///
    /// 不合法的行跳过；被数据库约束拒绝的行记为 Rejected
    #[instrument(skip(self, file), fields(entity = %file.entity))]
    pub fn import_independent(&self, file: &DataFile) -> ImportResult<FileImportResult> {
        let entity = self.entity_of(file)?;
        if entity.is_dependent() {
            return Err(ImportError::InternalError(format!(
                "表 {} 含外键，不能按独立表导入",
                entity.name
            )));
        }

        let result = self.import_rows(entity, file, None, false)?;
        info!(
            total = file.row_count(),
            persisted = result.persisted(),
            malformed = result.count(RowOutcome::Malformed),
            rejected = result.count(RowOutcome::Rejected),
            "独立表导入完成"
        );
        Ok(result)
    }

    /// 导入依赖表（有外键）
    ///
    /// # 参数
    /// - pending: 仅尝试这些行号；None 表示整份文件
    ///
    /// # 返回
    /// - 每行结果；外键目标不存在的行为 Unresolved，留给下一轮
    #[instrument(skip(self, file, pending), fields(entity = %file.entity))]
    pub fn import_dependent(
        &self,
        file: &DataFile,
        pending: Option<&BTreeSet<usize>>,
    ) -> ImportResult<FileImportResult> {
        let entity = self.entity_of(file)?;

        let result = self.import_rows(entity, file, pending, true)?;
        info!(
            attempted = result.outcomes.len(),
            persisted = result.persisted(),
            unresolved = result.count(RowOutcome::Unresolved),
            malformed = result.count(RowOutcome::Malformed),
            rejected = result.count(RowOutcome::Rejected),
            "依赖表导入完成"
        );
        Ok(result)
    }

    fn entity_of(&self, file: &DataFile) -> ImportResult<&'r EntityDescriptor> {
        self.registry
            .get(&file.entity)
            .ok_or_else(|| ImportError::UnknownFiles {
                dir: file
                    .path
                    .parent()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default(),
                files: vec![file.file_name.clone()],
                known: self.registry.names().iter().map(|n| n.to_string()).collect(),
            })
    }

    fn import_rows(
        &self,
        entity: &EntityDescriptor,
        file: &DataFile,
        pending: Option<&BTreeSet<usize>>,
        resolve_references: bool,
    ) -> ImportResult<FileImportResult> {
        // 表头先于任何写入校验
        let binding = self.mapper.bind_headers(entity, &file.headers)?;
        let mut result = FileImportResult::new(entity.name);

        for row in &file.rows {
            if let Some(pending) = pending {
                if !pending.contains(&row.line) {
                    continue;
                }
            }

            let bound = match self.mapper.map_row(&binding, row) {
                Ok(bound) => bound,
                Err(e) => {
                    self.fail(&mut result, file, row, RowOutcome::Malformed, e.to_string());
                    continue;
                }
            };

            if resolve_references {
                if let Some(message) = self.find_missing_reference(&bound)? {
                    self.fail(&mut result, file, row, RowOutcome::Unresolved, message);
                    continue;
                }
            }

            match self.store.insert(entity.name, &bound) {
                Ok(rowid) => {
                    debug!(line = row.line, rowid, "写入成功");
                    result.record(row.line, RowOutcome::Persisted);
                }
                Err(e) if e.is_missing_reference() && resolve_references => {
                    self.fail(&mut result, file, row, RowOutcome::Unresolved, e.to_string());
                }
                Err(e) if e.is_constraint_violation() => {
                    self.fail(&mut result, file, row, RowOutcome::Rejected, e.to_string());
                }
                Err(e) => return Err(e.into()),
            }
        }

        Ok(result)
    }

    /// 第一个指向不存在记录的外键描述
    fn find_missing_reference(&self, row: &BoundRow) -> ImportResult<Option<String>> {
        for (field, target, id) in row.references() {
            if !self.store.exists(target, id)? {
                return Ok(Some(format!(
                    "字段 {} 引用的 {} id={} 不存在",
                    field, target, id
                )));
            }
        }
        Ok(None)
    }

    fn fail(
        &self,
        result: &mut FileImportResult,
        file: &DataFile,
        row: &RawRow,
        outcome: RowOutcome,
        message: String,
    ) {
        let raw = row.to_json(&file.headers);
        match outcome {
            // 外键暂缺是预期内的延迟，不告警
            RowOutcome::Unresolved => {
                debug!(line = row.line, reason = %message, "外键未解析，留待下一轮")
            }
            _ => warn!(line = row.line, outcome = %outcome, reason = %message, raw = %raw, "行被跳过"),
        }
        result.record_failure(RowFailure {
            line: row.line,
            outcome,
            message,
            raw,
        });
    }
}
