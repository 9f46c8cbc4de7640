// ==========================================
// 影评平台 (YaMDb) - 数据导入命令行入口
// ==========================================
// 用法: media-reviews-load（不接受参数，参数见环境变量）
// 输出: stdout 逐文件结果 + 汇总；日志走 stderr
// 退出码: 0 = 全部完成，1 = 导入中止
// ==========================================

use anyhow::Context;
use media_reviews::config::LoaderConfig;
use media_reviews::domain::{EntityRegistry, FileSummary, ImportReport};
use media_reviews::engine::DependencyScheduler;
use media_reviews::i18n::{self, t_with_args};
use media_reviews::importer::{FieldMapper, RecordImporter};
use media_reviews::repository::RecordRepository;
use media_reviews::{db, logging};
use std::sync::{Arc, Mutex};

fn main() {
    // 配置只读环境变量，不写日志，可先于日志初始化
    let config = LoaderConfig::from_env();
    logging::init(config.log_format);

    let locale = i18n::set_locale(&config.locale);

    tracing::info!("==================================================");
    tracing::info!("{} v{}", media_reviews::APP_NAME, media_reviews::VERSION);
    tracing::info!(locale, "==================================================");

    if let Err(e) = run(&config) {
        eprintln!("{}", t_with_args("load.failed", &[("reason", &format!("{:#}", e))]));
        std::process::exit(1);
    }
}

fn run(config: &LoaderConfig) -> anyhow::Result<ImportReport> {
    println!(
        "{}",
        t_with_args(
            "load.started",
            &[
                ("dir", &config.data_dir.display().to_string()),
                ("db", &config.db_path),
            ],
        )
    );

    let conn = db::open_sqlite_connection(&config.db_path)
        .with_context(|| format!("无法打开数据库 {}", config.db_path))?;
    db::init_schema(&conn).context("初始化数据库表结构失败")?;

    // 版本不一致只提示，不阻止导入
    match db::read_schema_version(&conn)? {
        Some(found) if found != db::CURRENT_SCHEMA_VERSION => {
            let hint = t_with_args(
                "load.schema_mismatch_hint",
                &[
                    ("found", &found.to_string()),
                    ("expected", &db::CURRENT_SCHEMA_VERSION.to_string()),
                ],
            );
            tracing::warn!("{}", hint);
        }
        _ => {}
    }

    let registry = EntityRegistry::standard();
    let repo = RecordRepository::from_connection(Arc::new(Mutex::new(conn)));
    let importer = RecordImporter::new(&registry, repo, FieldMapper::default());
    let scheduler = DependencyScheduler::new(importer);

    let report = scheduler.run_with(&config.data_dir, print_file_done)?;

    println!(
        "{}",
        t_with_args(
            "load.finished",
            &[
                ("files", &report.files.len().to_string()),
                ("rows", &report.total_persisted().to_string()),
                ("passes", &report.dependent_passes.to_string()),
            ],
        )
    );
    Ok(report)
}

/// 单个文件完成时输出一行（跳过的行另起一行）
fn print_file_done(summary: &FileSummary) {
    println!(
        "{}",
        t_with_args(
            "load.file_done",
            &[
                ("file", &summary.entity),
                ("count", &summary.persisted.to_string()),
            ],
        )
    );

    if summary.malformed > 0 || summary.rejected > 0 {
        println!(
            "{}",
            t_with_args(
                "load.file_skipped",
                &[
                    ("file", &summary.entity),
                    ("malformed", &summary.malformed.to_string()),
                    ("rejected", &summary.rejected.to_string()),
                ],
            )
        );
    }
}
