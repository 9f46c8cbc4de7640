// ==========================================
// 影评平台 - 依赖调度器
// ==========================================
// 职责: 决定数据文件的导入顺序，保证外键目标先于引用方写入
// 状态: Discovering → Classifying → ImportingIndependent
//       → ImportingDependent(pass N) → Done | Fatal
// ==========================================
// 约束:
// - 每轮只重试上一轮仍未解析的行，已写入的行不再重复写入
// - 某一轮没有任何文件的待处理行减少 → StalledImport
// - 待处理行总数每轮严格递减，循环必然终止
// ==========================================

use crate::domain::record::{DataFile, FileSummary, ImportReport};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::{entity_name_of, CsvParser, FILE_EXT};
use crate::importer::record_importer::RecordImporter;
use crate::repository::RecordStore;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info, info_span, warn};
use uuid::Uuid;

// ==========================================
// SchedulerState - 调度状态
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Discovering,
    Classifying,
    ImportingIndependent,
    ImportingDependent { pass: usize },
    Done,
    Fatal,
}

impl fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulerState::Discovering => write!(f, "DISCOVERING"),
            SchedulerState::Classifying => write!(f, "CLASSIFYING"),
            SchedulerState::ImportingIndependent => write!(f, "IMPORTING_INDEPENDENT"),
            SchedulerState::ImportingDependent { pass } => {
                write!(f, "IMPORTING_DEPENDENT(pass {})", pass)
            }
            SchedulerState::Done => write!(f, "DONE"),
            SchedulerState::Fatal => write!(f, "FATAL"),
        }
    }
}

/// 一个依赖文件在轮次间的进度
struct PendingFile {
    file: DataFile,
    summary: FileSummary,
    // None = 尚未尝试（整份文件待处理）
    pending: Option<BTreeSet<usize>>,
}

impl PendingFile {
    fn pending_len(&self) -> usize {
        self.pending
            .as_ref()
            .map(BTreeSet::len)
            .unwrap_or_else(|| self.file.row_count())
    }
}

// ==========================================
// DependencyScheduler
// ==========================================
pub struct DependencyScheduler<'r, S>
where
    S: RecordStore,
{
    importer: RecordImporter<'r, S>,
    parser: CsvParser,
    state: std::cell::Cell<SchedulerState>,
}

impl<'r, S> DependencyScheduler<'r, S>
where
    S: RecordStore,
{
    pub fn new(importer: RecordImporter<'r, S>) -> Self {
        Self {
            importer,
            parser: CsvParser,
            state: std::cell::Cell::new(SchedulerState::Discovering),
        }
    }

    pub fn importer(&self) -> &RecordImporter<'r, S> {
        &self.importer
    }

    /// 最近一次运行停留的状态
    pub fn state(&self) -> SchedulerState {
        self.state.get()
    }

    /// 导入目录下全部数据文件
    pub fn run(&self, data_dir: &Path) -> ImportResult<ImportReport> {
        self.run_with(data_dir, |_| {})
    }

    /// 导入目录下全部数据文件；每个文件完成时回调一次
    pub fn run_with<F>(&self, data_dir: &Path, mut on_file_done: F) -> ImportResult<ImportReport>
    where
        F: FnMut(&FileSummary),
    {
        let run_id = Uuid::new_v4().to_string();
        let span = info_span!("import_run", run_id = %run_id);
        let _guard = span.enter();
        let started = Instant::now();

        let outcome = self.execute(data_dir, &mut on_file_done);
        match outcome {
            Ok((files, dependent_passes)) => {
                self.transition(SchedulerState::Done);
                let report = ImportReport {
                    run_id,
                    files,
                    dependent_passes,
                    elapsed_ms: started.elapsed().as_millis(),
                };
                info!(
                    files = report.files.len(),
                    persisted = report.total_persisted(),
                    dependent_passes,
                    elapsed_ms = report.elapsed_ms,
                    "导入完成"
                );
                Ok(report)
            }
            Err(e) => {
                self.transition(SchedulerState::Fatal);
                error!(error = %e, "导入中止");
                Err(e)
            }
        }
    }

    fn execute<F>(
        &self,
        data_dir: &Path,
        on_file_done: &mut F,
    ) -> ImportResult<(Vec<FileSummary>, usize)>
    where
        F: FnMut(&FileSummary),
    {
        // === Discovering ===
        self.transition(SchedulerState::Discovering);
        self.check_registry()?;
        let paths = self.discover(data_dir)?;

        let mut files = Vec::with_capacity(paths.len());
        for path in &paths {
            files.push(self.parser.parse_data_file(path)?);
        }

        // === Classifying ===
        self.transition(SchedulerState::Classifying);
        let (independent, dependent) = self.classify(files);
        info!(
            independent = independent.len(),
            dependent = dependent.len(),
            "数据文件分类完成"
        );

        let mut summaries = Vec::new();

        // === ImportingIndependent ===
        self.transition(SchedulerState::ImportingIndependent);
        for file in &independent {
            let result = self.importer.import_independent(file)?;
            let mut summary = FileSummary::new(file.entity.clone(), file.row_count());
            summary.absorb(&result);
            on_file_done(&summary);
            summaries.push(summary);
        }

        // === ImportingDependent ===
        let (dependent_summaries, passes) = self.import_dependent_files(dependent, on_file_done)?;
        summaries.extend(dependent_summaries);

        Ok((summaries, passes))
    }

    /// 逐轮导入依赖文件，直到全部落定或停滞
    fn import_dependent_files<F>(
        &self,
        files: Vec<DataFile>,
        on_file_done: &mut F,
    ) -> ImportResult<(Vec<FileSummary>, usize)>
    where
        F: FnMut(&FileSummary),
    {
        let mut waiting: Vec<PendingFile> = files
            .into_iter()
            .map(|file| PendingFile {
                summary: FileSummary::new(file.entity.clone(), file.row_count()),
                file,
                pending: None,
            })
            .collect();
        let mut finished = Vec::new();
        let mut pass = 0;

        while !waiting.is_empty() {
            pass += 1;
            self.transition(SchedulerState::ImportingDependent { pass });

            let mut progressed = false;
            let mut retry = Vec::new();

            for mut item in waiting {
                let before = item.pending_len();
                let result = self
                    .importer
                    .import_dependent(&item.file, item.pending.as_ref())?;
                item.summary.absorb(&result);

                let unresolved: BTreeSet<usize> = result.unresolved_lines().into_iter().collect();
                if unresolved.len() < before {
                    progressed = true;
                }

                if result.is_complete() {
                    on_file_done(&item.summary);
                    finished.push(item.summary);
                } else {
                    debug!(
                        entity = %item.file.entity,
                        pass,
                        unresolved = unresolved.len(),
                        "文件仍有未解析的行"
                    );
                    item.pending = Some(unresolved);
                    retry.push(item);
                }
            }

            if !retry.is_empty() && !progressed {
                let files: Vec<String> = retry.iter().map(|p| p.file.entity.clone()).collect();
                let pending_rows = retry.iter().map(PendingFile::pending_len).sum();
                warn!(pass, files = ?files, pending_rows, "依赖导入停滞");
                return Err(ImportError::StalledImport {
                    pass,
                    files,
                    pending_rows,
                });
            }

            waiting = retry;
        }

        Ok((finished, pass))
    }

    /// 列出目录下的数据文件并校验文件名
    ///
    /// # 错误
    /// - NoDataFiles: 目录不存在或没有 .csv 文件
    /// - UnknownFiles: 文件名没有对应的实体
    /// - DuplicateDataFile: 多个文件对应同一实体
    pub fn discover(&self, data_dir: &Path) -> ImportResult<Vec<PathBuf>> {
        let dir_display = data_dir.display().to_string();

        let entries = match std::fs::read_dir(data_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ImportError::NoDataFiles { dir: dir_display })
            }
            Err(e) => return Err(e.into()),
        };

        let mut paths = Vec::new();
        for entry in entries {
            let path = entry?.path();
            let is_data_file = path.is_file()
                && path
                    .extension()
                    .and_then(|e| e.to_str())
                    .map(|e| e.eq_ignore_ascii_case(FILE_EXT))
                    .unwrap_or(false);
            if is_data_file {
                paths.push(path);
            }
        }

        if paths.is_empty() {
            return Err(ImportError::NoDataFiles { dir: dir_display });
        }

        let registry = self.importer.registry();
        let mut unknown: Vec<String> = paths
            .iter()
            .filter_map(|p| entity_name_of(p))
            .filter(|name| !registry.contains(name))
            .collect();
        if !unknown.is_empty() {
            unknown.sort();
            return Err(ImportError::UnknownFiles {
                dir: dir_display,
                files: unknown,
                known: registry.names().iter().map(|n| n.to_string()).collect(),
            });
        }

        // 文件名大小写不同也视为同一张表
        let mut by_entity: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for path in &paths {
            if let Some(name) = entity_name_of(path) {
                let file_name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default();
                by_entity.entry(name).or_default().push(file_name);
            }
        }
        if let Some((entity, mut files)) = by_entity.into_iter().find(|(_, f)| f.len() > 1) {
            files.sort();
            return Err(ImportError::DuplicateDataFile {
                dir: dir_display,
                entity,
                files,
            });
        }

        // 注册表声明顺序，保证每次运行顺序一致
        paths.sort_by_key(|p| {
            entity_name_of(p)
                .and_then(|name| registry.position(&name))
                .unwrap_or(usize::MAX)
        });
        info!(dir = %dir_display, files = paths.len(), "发现数据文件");
        Ok(paths)
    }

    /// 按实体是否含外键分为 (独立, 依赖)
    pub fn classify(&self, files: Vec<DataFile>) -> (Vec<DataFile>, Vec<DataFile>) {
        let registry = self.importer.registry();
        files.into_iter().partition(|file| {
            registry
                .get(&file.entity)
                .map(|e| !e.is_dependent())
                .unwrap_or(false)
        })
    }

    fn check_registry(&self) -> ImportResult<()> {
        if let Some((entity, field, target)) =
            self.importer.registry().dangling_references().into_iter().next()
        {
            return Err(ImportError::InvalidRegistry {
                entity: entity.to_string(),
                field: field.to_string(),
                target: target.to_string(),
            });
        }
        Ok(())
    }

    fn transition(&self, next: SchedulerState) {
        let prev = self.state.replace(next);
        if prev != next {
            debug!(from = %prev, to = %next, "调度状态切换");
        }
    }
}
