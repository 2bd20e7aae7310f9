//! PostgreSQL warehouse integration tests.
//!
//! These need a running server reachable through DATABASE_URL.

use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use sqlrun::config::ConnectionConfig;
use sqlrun::error::SqlrunError;
use sqlrun::model::{ColumnType, RowLimit, Value};
use sqlrun::warehouse::{self, Warehouse};
use std::str::FromStr;

/// Helper to get test database URL from environment.
fn get_test_database_url() -> Option<String> {
    std::env::var("DATABASE_URL")
        .ok()
        .filter(|url| url.starts_with("postgres"))
}

/// Helper to open a test warehouse.
async fn get_test_warehouse() -> Option<Box<dyn Warehouse>> {
    let url = get_test_database_url()?;
    let config = ConnectionConfig::from_connection_string(&url).ok()?;
    warehouse::connect(&config).await.ok()
}

#[tokio::test(flavor = "current_thread")]
async fn test_select_types() {
    let Some(mut warehouse) = get_test_warehouse().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let result = warehouse
        .execute(
            "select 1::int4 as c1, 'three'::text as c2, 1.10::numeric(6,2) as c3, \
             3.5::float8 as c4, date '2000-01-01' as c5, true as c6, null::text as c7",
            RowLimit::UNLIMITED,
        )
        .await
        .unwrap();

    assert_eq!(result.headers(), vec!["c1", "c2", "c3", "c4", "c5", "c6", "c7"]);
    assert_eq!(result.columns[0].column_type, ColumnType::Integer);
    assert_eq!(result.columns[2].column_type, ColumnType::Decimal { scale: None });
    assert_eq!(result.rows[0][0], Value::Int(1));
    assert_eq!(result.rows[0][1], Value::from("three"));
    assert_eq!(result.rows[0][2], Value::Decimal(Decimal::from_str("1.10").unwrap()));
    assert_eq!(result.rows[0][3], Value::Float(3.5));
    assert_eq!(
        result.rows[0][4],
        Value::Date(chrono::NaiveDate::from_ymd_opt(2000, 1, 1).unwrap())
    );
    assert_eq!(result.rows[0][5], Value::Bool(true));
    assert_eq!(result.rows[0][6], Value::Null);

    warehouse.close().await.unwrap();
}

#[tokio::test(flavor = "current_thread")]
async fn test_limit() {
    let Some(mut warehouse) = get_test_warehouse().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let sql = "select n from generate_series(1, 3) as n order by 1";
    let result = warehouse.execute(sql, RowLimit(2)).await.unwrap();
    assert_eq!(result.rows, vec![vec![Value::Int(1)], vec![Value::Int(2)]]);
    assert!(result.truncated);

    warehouse.close().await.unwrap();
}

#[tokio::test(flavor = "current_thread")]
async fn test_status_statement() {
    let Some(mut warehouse) = get_test_warehouse().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    warehouse
        .execute("create temporary table t1 (c1 int, c2 varchar(5))", RowLimit::UNLIMITED)
        .await
        .unwrap();
    let inserted = warehouse
        .execute("insert into t1 values (1, 'hello'), (2, 'world')", RowLimit::UNLIMITED)
        .await
        .unwrap();
    assert_eq!(inserted.headers(), vec!["rows affected"]);
    assert_eq!(inserted.rows, vec![vec![Value::Int(2)]]);

    let columns = warehouse.describe("select c1, c2 from t1").await.unwrap();
    assert_eq!(columns[0].name, "c1");
    assert_eq!(columns[0].column_type, ColumnType::Integer);
    assert_eq!(columns[1].column_type, ColumnType::Text);

    warehouse.close().await.unwrap();
}

#[tokio::test(flavor = "current_thread")]
async fn test_execution_error_is_recoverable() {
    let Some(mut warehouse) = get_test_warehouse().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let err = warehouse
        .execute("selec current_u()", RowLimit::UNLIMITED)
        .await
        .unwrap_err();
    assert!(matches!(err, SqlrunError::Execution(_)));
    assert!(err.is_recoverable());

    // the connection stays usable after a failed statement
    let result = warehouse.execute("select 1 as one", RowLimit::UNLIMITED).await.unwrap();
    assert_eq!(result.rows, vec![vec![Value::Int(1)]]);

    warehouse.close().await.unwrap();
}
