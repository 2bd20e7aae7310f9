//! Batch runs against an in-memory SQLite database.

use std::cell::RefCell;
use std::path::PathBuf;

use pretty_assertions::assert_eq;
use sqlrun::batch::{self, BatchExecutor, BatchOptions, ErrorPolicy, Mode, Reporter, RunSummary};
use sqlrun::config::ConnectionConfig;
use sqlrun::error::SqlrunError;
use sqlrun::export::{BoxStyle, ExportFormat, Exporter, Sink};
use sqlrun::model::RowLimit;
use sqlrun::statement::{Source, Statement};
use sqlrun::warehouse::{self, Warehouse};

use super::SharedBuffer;

#[derive(Default)]
struct Recording {
    failures: RefCell<Vec<String>>,
    truncations: RefCell<Vec<u64>>,
}

impl Reporter for Recording {
    fn statement_failed(&self, _statement: &Statement, error: &SqlrunError) {
        self.failures.borrow_mut().push(error.to_string());
    }

    fn rows_truncated(&self, _statement: &Statement, limit: u64) {
        self.truncations.borrow_mut().push(limit);
    }
}

async fn memory() -> Box<dyn Warehouse> {
    let config = ConnectionConfig::from_connection_string("sqlite::memory:").unwrap();
    warehouse::connect(&config).await.unwrap()
}

fn file(name: &str, text: &str) -> Source {
    Source::File {
        path: PathBuf::from(format!("{name}.sql")),
        text: text.to_string(),
    }
}

fn ascii_options() -> BatchOptions {
    BatchOptions {
        exporter: Exporter::new(ExportFormat::Fmt).with_style(BoxStyle::Ascii),
        ..Default::default()
    }
}

fn csv_options(policy: ErrorPolicy) -> BatchOptions {
    BatchOptions {
        policy,
        exporter: Exporter::new(ExportFormat::Csv),
        echo: false,
        ..Default::default()
    }
}

async fn run_with(
    warehouse: &mut dyn Warehouse,
    options: &BatchOptions,
    reporter: &Recording,
    sources: &[Source],
) -> (RunSummary, String) {
    let buffer = SharedBuffer::default();
    let mut sink = Sink::text(Box::new(buffer.clone()));
    let summary = BatchExecutor::new(warehouse, options, reporter)
        .run(sources, &mut sink)
        .await
        .unwrap();
    sink.finish().unwrap();
    (summary, buffer.text())
}

async fn run(options: &BatchOptions, sources: &[Source]) -> (RunSummary, String) {
    let mut warehouse = memory().await;
    let reporter = Recording::default();
    let result = run_with(warehouse.as_mut(), options, &reporter, sources).await;
    warehouse.close().await.unwrap();
    result
}

#[tokio::test(flavor = "current_thread")]
async fn test_mixed_script() {
    let script = "\
create table t1(
    c1 int,
    c2 varchar(5)
);

insert into t1 values (1, 'hello'), (2, 'world');

update t1
    set c1 = 0
;

select * from t1;
";
    let (summary, out) = run(&ascii_options(), &[file("mix", script)]).await;

    let expected = "\
create table t1(
    c1 int,
    c2 varchar(5)
);
+---------------+
| rows affected |
+---------------+
|             0 |
+---------------+

insert into t1 values (1, 'hello'), (2, 'world');
+---------------+
| rows affected |
+---------------+
|             2 |
+---------------+

update t1
    set c1 = 0
;
+---------------+
| rows affected |
+---------------+
|             2 |
+---------------+

select * from t1;
+----+-------+
| c1 | c2    |
+----+-------+
|  0 | hello |
|  0 | world |
+----+-------+
";
    assert_eq!(out, expected);
    assert_eq!(summary.executed, 4);
    assert!(summary.success());
}

#[tokio::test(flavor = "current_thread")]
async fn test_error_stop() {
    let sources = [file("test", "select 'one'; selec current_u(); select 'two';")];
    let (summary, out) = run(&csv_options(ErrorPolicy::Stop), &sources).await;

    assert!(out.contains("one"));
    assert!(!out.contains("two"));
    assert!(summary.aborted);
    assert_eq!(summary.exit_code(), 1);
}

#[tokio::test(flavor = "current_thread")]
async fn test_error_continue() {
    let sources = [file("test", "select 'one'; selec current_u(); select 'two';")];
    let (summary, out) = run(&csv_options(ErrorPolicy::Continue), &sources).await;

    assert!(out.contains("one"));
    assert!(out.contains("two"));
    assert_eq!(summary.executed, 3);
    assert_eq!(summary.failed, 1);
    assert!(!summary.aborted);
}

#[tokio::test(flavor = "current_thread")]
async fn test_error_skip_file() {
    let sources = [
        file("test", "select 'one'; selec current_u(); select 'two';"),
        file("test2", "select 'three';"),
    ];
    let (summary, out) = run(&csv_options(ErrorPolicy::SkipFile), &sources).await;

    assert!(out.contains("one"));
    assert!(!out.contains("two"));
    assert!(out.contains("three"));
    assert_eq!(summary.skipped_sources, 1);
}

#[tokio::test(flavor = "current_thread")]
async fn test_failure_is_reported() {
    let mut warehouse = memory().await;
    let reporter = Recording::default();
    let sources = [Source::Query("select * from missing_table".into())];
    run_with(warehouse.as_mut(), &csv_options(ErrorPolicy::Stop), &reporter, &sources).await;

    let failures = reporter.failures.borrow();
    assert_eq!(failures.len(), 1);
    assert!(failures[0].contains("missing_table"));
}

#[tokio::test(flavor = "current_thread")]
async fn test_limit() {
    let mut warehouse = memory().await;
    let reporter = Recording::default();
    let options = BatchOptions {
        limit: RowLimit(2),
        echo: false,
        ..ascii_options()
    };
    let sources = [Source::Query(
        "select 1 as n union all select 2 union all select 3 order by 1;".into(),
    )];
    let (_, out) = run_with(warehouse.as_mut(), &options, &reporter, &sources).await;

    assert_eq!(out, "+---+\n| n |\n+---+\n| 1 |\n| 2 |\n+---+\n");
    assert_eq!(*reporter.truncations.borrow(), vec![2]);
}

#[tokio::test(flavor = "current_thread")]
async fn test_unlimited() {
    let options = BatchOptions {
        limit: RowLimit::UNLIMITED,
        ..csv_options(ErrorPolicy::Stop)
    };
    let sql = "with recursive n(i) as (select 1 union all select i + 1 from n where i < 600) select count(*) as c from (select i from n)";
    let (_, out) = run(&options, &[Source::Query(sql.into())]).await;
    assert_eq!(out, "c\n600\n");
}

#[tokio::test(flavor = "current_thread")]
async fn test_describe() {
    let mut warehouse = memory().await;
    let reporter = Recording::default();
    run_with(
        warehouse.as_mut(),
        &csv_options(ErrorPolicy::Stop),
        &reporter,
        &[Source::Query("create table t (id integer not null, name text)".into())],
    )
    .await;

    let options = BatchOptions {
        mode: Mode::Describe,
        ..csv_options(ErrorPolicy::Stop)
    };
    let (_, out) = run_with(
        warehouse.as_mut(),
        &options,
        &reporter,
        &[Source::Table("t".into())],
    )
    .await;

    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines[0], "Name,Type,Size,Prec,Scale,Nulls?");
    assert!(lines[1].starts_with("id,INTEGER,,,,"));
    assert!(lines[2].starts_with("name,TEXT,,,,"));
    assert_eq!(lines.len(), 3);
}

#[tokio::test(flavor = "current_thread")]
async fn test_show_sql() {
    let sources = [
        file("a", "select 1; -- trailing note\nselect\n  2"),
        Source::Table("orders".into()),
    ];
    let buffer = SharedBuffer::default();
    let mut sink = Sink::text(Box::new(buffer.clone()));
    let summary = batch::show_sql(&sources, &BatchOptions::default(), &mut sink).unwrap();
    sink.finish().unwrap();

    assert_eq!(buffer.text(), "select 1;\nselect\n  2;\nselect * from orders;\n");
    assert_eq!(summary.executed, 3);
}

#[tokio::test(flavor = "current_thread")]
async fn test_out_dir_workbooks() {
    let dir = tempfile::tempdir().unwrap();
    let options = BatchOptions {
        exporter: Exporter::new(ExportFormat::Xls),
        out_dir: Some(dir.path().to_path_buf()),
        ..Default::default()
    };
    let sources = [
        file("daily", "select 1 as a; select 'x' as b;"),
        file("empty", "create table t (id integer);"),
    ];
    let (summary, out) = run(&options, &sources).await;

    assert!(summary.success());
    assert_eq!(out, "");
    let daily = dir.path().join("daily.xlsx");
    assert!(std::fs::metadata(&daily).unwrap().len() > 0);
    // the status result of the DDL statement still gets a sheet
    assert!(dir.path().join("empty.xlsx").exists());
}
