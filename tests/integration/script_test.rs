//! Dataframe scripts run end to end.

use std::io::Write;
use std::path::Path;

use pretty_assertions::assert_eq;
use sqlrun::batch::{BatchExecutor, BatchOptions, Mode, TracingReporter};
use sqlrun::config::ConnectionConfig;
use sqlrun::export::{ExportFormat, Exporter, Sink};
use sqlrun::model::RowLimit;
use sqlrun::script::DEFAULT_FUNCTION;
use sqlrun::statement::Source;
use sqlrun::warehouse::{SqliteWarehouse, Warehouse};

use super::SharedBuffer;

const SCRIPT: &str = r#"
[main]
params = ["Session"]
returns = "DataFrame"
table = "orders"
select = ["id", "total"]
filter = ["total > 10"]
order_by = ["id DESC"]
limit = 2

[as_sql]
returns = "str"
sql = "select count(*) as n from orders"

[broken]
table = "orders"
filter = ["total >"]
"#;

fn write_script(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("report.toml");
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(SCRIPT.as_bytes()).unwrap();
    path
}

async fn orders() -> SqliteWarehouse {
    let config = ConnectionConfig::from_connection_string("sqlite::memory:").unwrap();
    let mut warehouse = SqliteWarehouse::connect(&config).await.unwrap();
    warehouse
        .execute("create table orders (id integer not null, total integer)", RowLimit::UNLIMITED)
        .await
        .unwrap();
    warehouse
        .execute(
            "insert into orders values (1, 5), (2, 20), (3, 30), (4, 40)",
            RowLimit::UNLIMITED,
        )
        .await
        .unwrap();
    warehouse
}

async fn run_function(function: &str, mode: Mode) -> String {
    let dir = tempfile::tempdir().unwrap();
    let path = write_script(dir.path());
    let source = Source::from_path(&path, function).unwrap();

    let mut warehouse = orders().await;
    let options = BatchOptions {
        exporter: Exporter::new(ExportFormat::Csv),
        echo: false,
        mode,
        ..Default::default()
    };
    let buffer = SharedBuffer::default();
    let mut sink = Sink::text(Box::new(buffer.clone()));
    let summary = BatchExecutor::new(&mut warehouse, &options, &TracingReporter)
        .run(&[source], &mut sink)
        .await
        .unwrap();
    assert!(summary.success());
    buffer.text()
}

#[tokio::test(flavor = "current_thread")]
async fn test_dataframe_function() {
    let out = run_function(DEFAULT_FUNCTION, Mode::Export).await;
    assert_eq!(out, "id,total\n4,40\n3,30\n");
}

#[tokio::test(flavor = "current_thread")]
async fn test_sql_returning_function() {
    let out = run_function("as_sql", Mode::Export).await;
    assert_eq!(out, "n\n4\n");
}

#[tokio::test(flavor = "current_thread")]
async fn test_describe_dataframe() {
    let out = run_function(DEFAULT_FUNCTION, Mode::Describe).await;
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines[0], "Name,Type,Nulls?");
    assert!(lines[1].starts_with("id,INTEGER,"));
    assert!(lines[2].starts_with("total,INTEGER,"));
}

#[test]
fn test_missing_function() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_script(dir.path());
    let err = Source::from_path(&path, "nope").unwrap_err();
    assert_eq!(err.category(), "Script Error");
    assert!(err.to_string().contains("does not contain 'nope' function"));
}

#[test]
fn test_invalid_fragment() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_script(dir.path());
    let err = Source::from_path(&path, "broken").unwrap_err();
    assert!(err.to_string().contains("invalid filter 'total >'"));
}

#[tokio::test(flavor = "current_thread")]
async fn test_typed_dataframe_csv() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sample.toml");
    std::fs::write(&path, "[main]\ntable = \"sample\"\norder_by = [\"C1\"]\n").unwrap();
    let source = Source::from_path(&path, DEFAULT_FUNCTION).unwrap();

    let config = ConnectionConfig::from_connection_string("sqlite::memory:").unwrap();
    let mut warehouse = SqliteWarehouse::connect(&config).await.unwrap();
    for statement in [
        "create table sample (C1 integer, C2 varchar(10), C3 decimal(6,4), C4 double, \
         C5 date, C6 time, C7 datetime)",
        "insert into sample values \
         (2, 'two', 2.22, 2.22, '2000-02-02', '12:02:22', '2000-01-01 12:02:22'), \
         (1, 'one', 1.1, 1.1, '2000-01-01', '11:01:01', '2000-01-01 11:01:01'), \
         (3, 'three', 3.333, 3.333, '2000-03-03', '13:03:33', '2000-01-03 13:03:44')",
    ] {
        warehouse.execute(statement, RowLimit::UNLIMITED).await.unwrap();
    }

    let options = BatchOptions {
        exporter: Exporter::new(ExportFormat::Csv),
        echo: false,
        ..Default::default()
    };
    let buffer = SharedBuffer::default();
    let mut sink = Sink::text(Box::new(buffer.clone()));
    BatchExecutor::new(&mut warehouse, &options, &TracingReporter)
        .run(&[source], &mut sink)
        .await
        .unwrap();

    let expected = "\
C1,C2,C3,C4,C5,C6,C7
1,one,1.1000,1.1,2000-01-01,11:01:01,2000-01-01 11:01:01
2,two,2.2200,2.22,2000-02-02,12:02:22,2000-01-01 12:02:22
3,three,3.3330,3.333,2000-03-03,13:03:33,2000-01-03 13:03:44
";
    assert_eq!(buffer.text(), expected);
}
