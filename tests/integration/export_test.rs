//! Exporting live query results to files.

use pretty_assertions::assert_eq;
use sqlrun::config::ConnectionConfig;
use sqlrun::export::{ExportFormat, Exporter, Sink};
use sqlrun::model::{ResultSet, RowLimit};
use sqlrun::warehouse::{SqliteWarehouse, Warehouse};

const SAMPLE: [&str; 2] = [
    "create table sample (
        C1 integer, C2 varchar(10), C3 decimal(6,4), C4 double, C5 date, C6 time, C7 datetime
    )",
    "insert into sample values
        (1, 'one', 1.1, 1.1, '2000-01-01', '11:01:01', '2000-01-01 11:01:01'),
        (2, 'two', 2.22, 2.22, '2000-02-02', '12:02:22', '2000-01-01 12:02:22'),
        (3, 'three', 3.333, 3.333, '2000-03-03', '13:03:33', '2000-01-03 13:03:44')",
];

const FIVE_ROWS: &str = "with recursive n(i) as (select 1 union all select i + 1 from n where i < 5) \
    select i, 'row ' || i as label from n";

async fn query_after(setup: &[&str], sql: &str, limit: RowLimit) -> ResultSet {
    let config = ConnectionConfig::from_connection_string("sqlite::memory:").unwrap();
    let mut warehouse = SqliteWarehouse::connect(&config).await.unwrap();
    for statement in setup {
        warehouse.execute(statement, RowLimit::UNLIMITED).await.unwrap();
    }
    let result = warehouse.execute(sql, limit).await.unwrap();
    warehouse.close().await.unwrap();
    result
}

async fn query(sql: &str) -> ResultSet {
    query_after(&[], sql, RowLimit::UNLIMITED).await
}

fn render(format: ExportFormat, rs: &ResultSet) -> Vec<u8> {
    let mut out = Vec::new();
    Exporter::new(format).write_text(rs, &mut out).unwrap();
    out
}

/// Counts the data rows in rendered output.
fn rows_in(format: ExportFormat, rs: &ResultSet) -> usize {
    let out = render(format, rs);
    let text = String::from_utf8(out.clone()).unwrap();
    let lines = text.lines();
    match format {
        ExportFormat::Fmt => lines.filter(|l| l.starts_with('│')).count() - 1,
        ExportFormat::Md => lines.filter(|l| l.starts_with('|')).count() - 2,
        ExportFormat::Csv | ExportFormat::Tsv => lines.count() - 1,
        ExportFormat::Raw | ExportFormat::Jsonl => lines.count(),
        ExportFormat::Json => serde_json::from_slice::<Vec<serde_json::Value>>(&out)
            .unwrap()
            .len(),
        ExportFormat::Xls => {
            let dir = tempfile::tempdir().unwrap();
            let mut sink = Sink::create(format, Some(&dir.path().join("rows.xlsx"))).unwrap();
            Exporter::new(format).export(rs, &mut sink).unwrap();
            match sink {
                Sink::Spreadsheet(book) => book.row_count(),
                Sink::Text(_) => unreachable!(),
            }
        }
    }
}

async fn export_to_file(format: ExportFormat, sql: &str) -> String {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.txt");
    let result = query(sql).await;

    let mut sink = Sink::create(format, Some(&path)).unwrap();
    Exporter::new(format).export(&result, &mut sink).unwrap();
    sink.finish().unwrap();

    std::fs::read_to_string(&path).unwrap()
}

#[tokio::test(flavor = "current_thread")]
async fn test_csv_file() {
    let out = export_to_file(ExportFormat::Csv, "select 'a,b' as x, null as y, 2 as z").await;
    assert_eq!(out, "x,y,z\n\"a,b\",,2\n");
}

#[tokio::test(flavor = "current_thread")]
async fn test_tsv_file() {
    let out = export_to_file(ExportFormat::Tsv, "select 'one' as name, 1 as id").await;
    assert_eq!(out, "name\tid\none\t1\n");
}

#[tokio::test(flavor = "current_thread")]
async fn test_jsonl_file() {
    let out = export_to_file(
        ExportFormat::Jsonl,
        "select 1 as id, 'one' as name union all select 2, null",
    )
    .await;
    assert_eq!(
        out,
        "{\"id\":1,\"name\":\"one\"}\n{\"id\":2,\"name\":null}\n"
    );
}

#[tokio::test(flavor = "current_thread")]
async fn test_raw_file() {
    let out = export_to_file(ExportFormat::Raw, "select 1 as a, 'x' as b").await;
    assert_eq!(out, "1\tx\n");
}

#[tokio::test(flavor = "current_thread")]
async fn test_dash_means_stdout() {
    let sink = Sink::create(ExportFormat::Csv, Some(std::path::Path::new("-"))).unwrap();
    assert!(sink.path().is_none());
    sink.finish().unwrap();
}

#[test]
fn test_spreadsheet_requires_file() {
    let err = Sink::create(ExportFormat::Xls, None).err().unwrap();
    assert_eq!(err.category(), "Output Error");
}

#[tokio::test(flavor = "current_thread")]
async fn test_workbook_saved_only_with_sheets() {
    let dir = tempfile::tempdir().unwrap();

    let unused = dir.path().join("unused.xlsx");
    Sink::create(ExportFormat::Xls, Some(&unused))
        .unwrap()
        .finish()
        .unwrap();
    assert!(!unused.exists());

    let report = dir.path().join("report.xlsx");
    let result = query("select 1 as id, 1.5 as ratio, 'x' as label").await;
    let mut sink = Sink::create(ExportFormat::Xls, Some(&report)).unwrap();
    assert_eq!(sink.path(), Some(&report));
    Exporter::new(ExportFormat::Xls).export(&result, &mut sink).unwrap();
    sink.finish().unwrap();
    assert!(report.exists());
}

#[tokio::test(flavor = "current_thread")]
async fn test_seven_typed_columns_csv() {
    let result = query_after(&SAMPLE, "select * from sample order by C1", RowLimit::UNLIMITED).await;
    let out = String::from_utf8(render(ExportFormat::Csv, &result)).unwrap();

    let expected = "\
C1,C2,C3,C4,C5,C6,C7
1,one,1.1000,1.1,2000-01-01,11:01:01,2000-01-01 11:01:01
2,two,2.2200,2.22,2000-02-02,12:02:22,2000-01-01 12:02:22
3,three,3.3330,3.333,2000-03-03,13:03:33,2000-01-03 13:03:44
";
    assert_eq!(out, expected);
}

#[tokio::test(flavor = "current_thread")]
async fn test_declared_scale_and_fractional_seconds() {
    let setup = [
        "create table t (c3 decimal(6,4), ts datetime)",
        "insert into t values (1.1, '2000-01-01 11:01:01.123456')",
    ];
    let result = query_after(&setup, "select * from t", RowLimit::UNLIMITED).await;
    let out = String::from_utf8(render(ExportFormat::Csv, &result)).unwrap();
    assert_eq!(out, "c3,ts\n1.1000,2000-01-01 11:01:01.123456\n");
}

#[tokio::test(flavor = "current_thread")]
async fn test_csv_round_trip() {
    let result = query(
        "select 'a,b' as comma, 'say \"hi\"' as quote, 'line1' || char(10) || 'line2' as multi, \
         'ünï' as text, null as empty, 42 as n, 1.5 as f",
    )
    .await;
    let out = render(ExportFormat::Csv, &result);

    let mut reader = csv::Reader::from_reader(out.as_slice());
    let headers: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
    assert_eq!(headers, result.headers());

    let records: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
    assert_eq!(records.len(), result.row_count());
    for (record, row) in records.iter().zip(&result.rows) {
        let parsed: Vec<&str> = record.iter().collect();
        let original: Vec<String> = row.iter().map(|v| v.to_text()).collect();
        assert_eq!(parsed, original);
    }
}

#[tokio::test(flavor = "current_thread")]
async fn test_export_is_deterministic() {
    let result = query_after(&SAMPLE, "select * from sample", RowLimit::UNLIMITED).await;

    for format in ExportFormat::ALL {
        if format.is_spreadsheet() {
            continue;
        }
        assert_eq!(render(format, &result), render(format, &result), "{format}");
    }

    let dir = tempfile::tempdir().unwrap();
    let save = |name: &str| {
        let path = dir.path().join(name);
        let mut sink = Sink::create(ExportFormat::Xls, Some(&path)).unwrap();
        Exporter::new(ExportFormat::Xls).export(&result, &mut sink).unwrap();
        sink.finish().unwrap();
        std::fs::read(path).unwrap()
    };
    let first = save("first.xlsx");
    let second = save("second.xlsx");
    assert!(first == second, "workbooks differ");
}

#[tokio::test(flavor = "current_thread")]
async fn test_row_cap_in_every_format() {
    let capped = query_after(&[], FIVE_ROWS, RowLimit(2)).await;
    assert!(capped.truncated);
    let all = query_after(&[], FIVE_ROWS, RowLimit::UNLIMITED).await;
    assert!(!all.truncated);

    for format in ExportFormat::ALL {
        assert_eq!(rows_in(format, &capped), 2, "{format} capped");
        assert_eq!(rows_in(format, &all), 5, "{format} unlimited");
    }
}
