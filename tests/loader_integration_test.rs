// ==========================================
// 数据导入 集成测试
// ==========================================
// 测试目标: 目录 → 调度器 → SQLite 的完整流程
// ==========================================


use media_reviews::domain::{EntityRegistry, RowOutcome};
use media_reviews::engine::SchedulerState;
use media_reviews::importer::ImportError;
use media_reviews::logging;
use media_reviews::repository::RecordStore;
use rusqlite::Connection;
use test_helpers::{count_rows, create_data_dir, create_scheduler, create_test_db, write_csv};

const USERS: &[&str] = &[
    "id,username,email,role,bio,first_name,last_name",
    "100,bingobongo,bingobongo@yamdb.fake,user,,,",
    "101,capt_obvious,capt_obvious@yamdb.fake,admin,,,",
];

const CATEGORIES: &[&str] = &["id,name,slug", "1,Фильм,movie", "2,Книга,book"];

const TITLES: &[&str] = &[
    "id,name,year,category",
    "1,Побег из Шоушенка,1994,1",
    "2,Крёстный отец,1972,1",
];

#[test]
fn test_category_then_title_completes_in_first_pass() {
    logging::init_test();

    let (_db_file, db_path) = create_test_db().expect("Failed to create test db");
    let data_dir = create_data_dir();
    write_csv(data_dir.path(), "category.csv", CATEGORIES);
    write_csv(data_dir.path(), "title.csv", TITLES);

    let registry = EntityRegistry::standard();
    let scheduler = create_scheduler(&registry, &db_path);

    let mut done = Vec::new();
    let report = scheduler
        .run_with(data_dir.path(), |summary| done.push(summary.entity.clone()))
        .expect("Import should succeed");

    assert_eq!(scheduler.state(), SchedulerState::Done);
    assert_eq!(done, vec!["category", "title"]);
    assert_eq!(report.dependent_passes, 1);
    assert_eq!(report.total_persisted(), 4);

    let title = report.file("title").expect("title summary");
    assert_eq!(title.persisted, 2);
    assert_eq!(title.passes, 1);

    assert_eq!(count_rows(&db_path, "category"), 2);
    assert_eq!(count_rows(&db_path, "title"), 2);
}

#[test]
fn test_unresolvable_reference_stalls_and_names_file() {
    logging::init_test();

    let (_db_file, db_path) = create_test_db().expect("Failed to create test db");
    let data_dir = create_data_dir();
    write_csv(data_dir.path(), "user.csv", USERS);
    write_csv(data_dir.path(), "category.csv", CATEGORIES);
    write_csv(data_dir.path(), "title.csv", TITLES);
    write_csv(
        data_dir.path(),
        "review.csv",
        &[
            "id,title_id,text,author,score,pub_date",
            "1,1,Отлично,100,10,2019-09-24T21:08:21.567Z",
            "2,99,Такого фильма нет,100,5,2019-09-24T21:08:21.567Z",
        ],
    );

    let registry = EntityRegistry::standard();
    let scheduler = create_scheduler(&registry, &db_path);

    let mut done = Vec::new();
    let err = scheduler
        .run_with(data_dir.path(), |summary| done.push(summary.entity.clone()))
        .unwrap_err();

    match err {
        ImportError::StalledImport {
            pass,
            files,
            pending_rows,
        } => {
            assert_eq!(pass, 2);
            assert_eq!(files, vec!["review"]);
            assert_eq!(pending_rows, 1);
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(scheduler.state(), SchedulerState::Fatal);

    // 已完成文件的结果行在中止前已输出
    assert_eq!(done, vec!["user", "category", "title"]);

    // 可解析的行已写入，悬空行从未写入
    assert_eq!(count_rows(&db_path, "review"), 1);
    let conn = Connection::open(&db_path).unwrap();
    let dangling: i64 = conn
        .query_row("SELECT COUNT(*) FROM review WHERE title_id = 99", [], |row| row.get(0))
        .unwrap();
    assert_eq!(dangling, 0);
}

#[test]
fn test_reference_chain_resolves_across_passes() {
    logging::init_test();

    let (_db_file, db_path) = create_test_db().expect("Failed to create test db");
    let data_dir = create_data_dir();
    write_csv(data_dir.path(), "user.csv", USERS);
    write_csv(data_dir.path(), "category.csv", CATEGORIES);
    write_csv(data_dir.path(), "title.csv", TITLES);
    write_csv(
        data_dir.path(),
        "review.csv",
        &[
            "id,title_id,text,author,score,pub_date",
            "1,1,Отлично,100,10,2019-09-24T21:08:21.567Z",
            "2,2,Неплохо,101,7,2019-09-25T10:00:00Z",
        ],
    );
    write_csv(
        data_dir.path(),
        "comment.csv",
        &[
            "id,review_id,text,author,pub_date",
            "1,1,Согласен,101,2019-09-26T08:00:00Z",
            "2,2,Не согласен,100,2019-09-26T09:00:00Z",
        ],
    );

    // 声明顺序倒置：引用方先于被引用方尝试，需要多轮
    let standard = EntityRegistry::standard();
    let mut entities: Vec<_> = standard.iter().cloned().collect();
    entities.reverse();
    let reversed = EntityRegistry::new(entities);
    let scheduler = create_scheduler(&reversed, &db_path);

    let report = scheduler.run(data_dir.path()).expect("Import should succeed");

    // title → review → comment 链长 3
    assert_eq!(report.dependent_passes, 3);
    assert_eq!(report.file("title").unwrap().passes, 1);
    assert_eq!(report.file("review").unwrap().passes, 2);
    assert_eq!(report.file("comment").unwrap().passes, 3);
    assert_eq!(report.file("comment").unwrap().unresolved, 0);

    assert_eq!(count_rows(&db_path, "review"), 2);
    assert_eq!(count_rows(&db_path, "comment"), 2);
}

#[test]
fn test_header_mismatch_aborts_but_keeps_earlier_files() {
    logging::init_test();

    let (_db_file, db_path) = create_test_db().expect("Failed to create test db");
    let data_dir = create_data_dir();
    write_csv(data_dir.path(), "category.csv", CATEGORIES);
    write_csv(
        data_dir.path(),
        "title.csv",
        &["id,nmae,year,category", "1,Побег из Шоушенка,1994,1"],
    );

    let registry = EntityRegistry::standard();
    let scheduler = create_scheduler(&registry, &db_path);
    let err = scheduler.run(data_dir.path()).unwrap_err();

    match err {
        ImportError::SchemaMismatch { entity, column, fields } => {
            assert_eq!(entity, "title");
            assert_eq!(column, "nmae");
            assert!(fields.contains(&"name".to_string()));
        }
        other => panic!("unexpected error: {:?}", other),
    }

    // 先前导入的文件不回滚
    assert_eq!(count_rows(&db_path, "category"), 2);
    assert_eq!(count_rows(&db_path, "title"), 0);
}

#[test]
fn test_second_run_is_rejected_by_unique_constraints() {
    logging::init_test();

    let (_db_file, db_path) = create_test_db().expect("Failed to create test db");
    let data_dir = create_data_dir();
    write_csv(data_dir.path(), "category.csv", CATEGORIES);
    write_csv(data_dir.path(), "title.csv", TITLES);

    let registry = EntityRegistry::standard();
    create_scheduler(&registry, &db_path)
        .run(data_dir.path())
        .expect("First import should succeed");

    let report = create_scheduler(&registry, &db_path)
        .run(data_dir.path())
        .expect("Second import should finish");

    let category = report.file("category").unwrap();
    assert_eq!(category.persisted, 0);
    assert_eq!(category.rejected, 2);
    assert_eq!(report.file("title").unwrap().rejected, 2);

    assert_eq!(count_rows(&db_path, "category"), 2);
    assert_eq!(count_rows(&db_path, "title"), 2);
}

#[test]
fn test_second_run_without_ids_duplicates_rows() {
    logging::init_test();

    let (_db_file, db_path) = create_test_db().expect("Failed to create test db");
    let data_dir = create_data_dir();
    write_csv(data_dir.path(), "category.csv", CATEGORIES);
    write_csv(
        data_dir.path(),
        "title.csv",
        &["name,year,category", "Побег из Шоушенка,1994,1", "Сталкер,1979,"],
    );

    let registry = EntityRegistry::standard();
    for _ in 0..2 {
        create_scheduler(&registry, &db_path)
            .run(data_dir.path())
            .expect("Import should finish");
    }

    // title 没有唯一约束，重复导入得到重复行
    assert_eq!(count_rows(&db_path, "title"), 4);
    assert_eq!(count_rows(&db_path, "category"), 2);
}

#[test]
fn test_user_header_binds_to_author() {
    logging::init_test();

    let (_db_file, db_path) = create_test_db().expect("Failed to create test db");
    let data_dir = create_data_dir();
    write_csv(data_dir.path(), "user.csv", USERS);
    write_csv(data_dir.path(), "category.csv", CATEGORIES);
    write_csv(data_dir.path(), "title.csv", TITLES);
    write_csv(
        data_dir.path(),
        "review.csv",
        &[
            "id,title_id,text,user,score,pub_date",
            "1,1,Отлично,101,9,",
        ],
    );
    write_csv(
        data_dir.path(),
        "comment.csv",
        &[
            "id,review_id,text,author_id,pub_date",
            "1,1,Согласен,100,2019-09-26 08:00:00",
        ],
    );

    let registry = EntityRegistry::standard();
    create_scheduler(&registry, &db_path)
        .run(data_dir.path())
        .expect("Import should succeed");

    let conn = Connection::open(&db_path).unwrap();
    let (author, pub_date): (i64, String) = conn
        .query_row("SELECT author_id, pub_date FROM review WHERE id = 1", [], |row| {
            Ok((row.get(0)?, row.get(1)?))
        })
        .unwrap();
    assert_eq!(author, 101);
    // 空发布时间取导入时刻
    assert!(!pub_date.is_empty());

    let (comment_author, comment_date): (i64, String) = conn
        .query_row("SELECT author_id, pub_date FROM comment WHERE id = 1", [], |row| {
            Ok((row.get(0)?, row.get(1)?))
        })
        .unwrap();
    assert_eq!(comment_author, 100);
    assert_eq!(comment_date, "2019-09-26T08:00:00Z");
}

#[test]
fn test_malformed_rows_are_skipped() {
    logging::init_test();

    let (_db_file, db_path) = create_test_db().expect("Failed to create test db");
    let data_dir = create_data_dir();
    write_csv(
        data_dir.path(),
        "user.csv",
        &[
            "id,username,email",
            "100,bingobongo,bingobongo@yamdb.fake",
            "101,me,me@yamdb.fake",
            "102,capt_obvious,not-an-email",
        ],
    );
    write_csv(data_dir.path(), "category.csv", CATEGORIES);
    write_csv(data_dir.path(), "title.csv", TITLES);
    write_csv(
        data_dir.path(),
        "review.csv",
        &[
            "id,title_id,text,author,score,pub_date",
            "1,1,Отлично,100,10,2019-09-24T21:08:21.567Z",
            "2,2,Шкала до десяти,100,11,2019-09-24T21:08:21.567Z",
            "3,2,,100,5,2019-09-24T21:08:21.567Z",
        ],
    );

    let registry = EntityRegistry::standard();
    let report = create_scheduler(&registry, &db_path)
        .run(data_dir.path())
        .expect("Import should succeed");

    let users = report.file("user").unwrap();
    assert_eq!((users.persisted, users.malformed), (1, 2));

    let reviews = report.file("review").unwrap();
    assert_eq!(reviews.total_rows, 3);
    assert_eq!((reviews.persisted, reviews.malformed), (1, 2));
    assert_eq!(reviews.unresolved, 0);

    assert_eq!(count_rows(&db_path, "user"), 1);
    assert_eq!(count_rows(&db_path, "review"), 1);
}

#[test]
fn test_review_unique_per_author_and_title() {
    logging::init_test();

    let (_db_file, db_path) = create_test_db().expect("Failed to create test db");
    let data_dir = create_data_dir();
    write_csv(data_dir.path(), "user.csv", USERS);
    write_csv(data_dir.path(), "category.csv", CATEGORIES);
    write_csv(data_dir.path(), "title.csv", TITLES);
    write_csv(
        data_dir.path(),
        "review.csv",
        &[
            "id,title_id,text,author,score,pub_date",
            "1,1,Отлично,100,10,2019-09-24T21:08:21Z",
            "2,1,Передумал,100,3,2019-09-25T21:08:21Z",
        ],
    );

    let registry = EntityRegistry::standard();
    let scheduler = create_scheduler(&registry, &db_path);
    let report = scheduler.run(data_dir.path()).expect("Import should succeed");

    // 约束拒绝是终态，不参与后续轮次
    let reviews = report.file("review").unwrap();
    assert_eq!((reviews.persisted, reviews.rejected), (1, 1));
    assert_eq!(report.dependent_passes, 1);

    let store = scheduler.importer().store();
    assert_eq!(store.count("review").unwrap(), 1);
    assert!(RowOutcome::Rejected.is_settled());
}

#[test]
fn test_empty_directory_is_fatal() {
    logging::init_test();

    let (_db_file, db_path) = create_test_db().expect("Failed to create test db");
    let data_dir = create_data_dir();

    let registry = EntityRegistry::standard();
    let err = create_scheduler(&registry, &db_path)
        .run(data_dir.path())
        .unwrap_err();
    assert!(matches!(err, ImportError::NoDataFiles { .. }));
}
