use std::{collections::BTreeMap, path::Path};

use jobrun_core::TaskContext;
use jobrun_db::{CellValue, Connection, DbError, open};
use jobrun_model::ConnectionOptions;

fn create_options() -> ConnectionOptions {
    let mut options = ConnectionOptions::default();
    options.driver_params.insert(
        "sqlite".into(),
        BTreeMap::from([("mode".to_string(), "rwc".to_string())]),
    );
    options
}

async fn exec(conn: &mut Connection, ctx: &TaskContext, sql: &str) {
    let mut cursor = conn.query(ctx, sql).await.unwrap();
    while cursor.next().await.unwrap().is_some() {}
}

async fn seed(path: &Path) {
    let ctx = TaskContext::new();
    let mut conn = open(&ctx, path.to_str().unwrap(), &create_options())
        .await
        .unwrap();
    exec(&mut conn, &ctx, "CREATE TABLE tables (name TEXT, rows INTEGER, note TEXT)").await;
    exec(&mut conn, &ctx, "INSERT INTO tables VALUES ('users', 1250, NULL)").await;
    exec(&mut conn, &ctx, "INSERT INTO tables VALUES ('orders', 5432, 'hot')").await;
    conn.close().await;
}

#[tokio::test]
async fn streams_rows_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stats.db");
    seed(&path).await;

    for prepared in [true, false] {
        let options = ConnectionOptions {
            prepared_stmts: prepared,
            ..ConnectionOptions::default()
        };
        let ctx = TaskContext::new();
        let mut conn = open(&ctx, path.to_str().unwrap(), &options).await.unwrap();
        {
            let mut cursor = conn
                .query(&ctx, "SELECT name, rows AS value, note FROM tables ORDER BY name")
                .await
                .unwrap();

            let columns = cursor.columns().await.unwrap().unwrap();
            assert_eq!(&columns[..], ["name", "value", "note"]);

            let orders = cursor.next().await.unwrap().unwrap();
            assert_eq!(orders.get(0), Some(&CellValue::Text("orders".into())));
            assert_eq!(orders.get(1), Some(&CellValue::Int(5432)));

            let users = cursor.next().await.unwrap().unwrap();
            assert_eq!(users.get(2), Some(&CellValue::Null));
            assert!(cursor.next().await.unwrap().is_none());
        }
        conn.close().await;
    }
}

#[tokio::test]
async fn missing_file_fails_ping() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.db");

    let err = open(&TaskContext::new(), path.to_str().unwrap(), &ConnectionOptions::default())
        .await
        .err()
        .unwrap();
    assert!(matches!(err, DbError::Connection(ref msg) if msg.starts_with("ping failed")));
}

#[tokio::test]
async fn query_errors_are_reported() {
    let ctx = TaskContext::new();
    let mut conn = open(&ctx, ":memory:", &ConnectionOptions::default())
        .await
        .unwrap();
    let result = match conn.query(&ctx, "SELECT * FROM nowhere").await {
        Ok(mut cursor) => cursor.next().await.map(|_| ()),
        Err(e) => Err(e),
    };
    assert!(matches!(result, Err(DbError::Query(_))));
    conn.close().await;
}

#[tokio::test]
async fn unsupported_engines_are_rejected() {
    let ctx = TaskContext::new();
    let options = ConnectionOptions::default();

    let oracle = open(&ctx, "oracle://u:p@h:1521/orcl", &options).await.err().unwrap();
    assert!(matches!(oracle, DbError::UnsupportedEngine(ref e) if e == "oracle"));

    let other = open(&ctx, "cockroach://u:p@h:26257/db", &options).await.err().unwrap();
    assert!(matches!(other, DbError::UnsupportedEngine(_)));
}

#[tokio::test]
async fn memory_databases_need_no_file() {
    for dsn in [":memory:", "sqlite://:memory:"] {
        let ctx = TaskContext::new();
        let mut conn = open(&ctx, dsn, &ConnectionOptions::default()).await.unwrap();
        {
            let mut cursor = conn
                .query(&ctx, "SELECT 'a' AS name, 3 AS value")
                .await
                .unwrap();
            let row = cursor.next().await.unwrap().unwrap();
            assert_eq!(row.values(), [CellValue::Text("a".into()), CellValue::Int(3)]);
        }
        conn.close().await;
    }
}

#[tokio::test]
async fn empty_results_still_report_columns() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stats.db");
    seed(&path).await;

    for prepared in [true, false] {
        let options = ConnectionOptions {
            prepared_stmts: prepared,
            ..ConnectionOptions::default()
        };
        let ctx = TaskContext::new();
        let mut conn = open(&ctx, path.to_str().unwrap(), &options).await.unwrap();
        {
            let mut cursor = conn
                .query(&ctx, "SELECT name, rows AS value FROM tables WHERE 1 = 0")
                .await
                .unwrap();
            let columns = cursor.columns().await.unwrap().unwrap();
            assert_eq!(&columns[..], ["name", "value"]);
            assert!(cursor.next().await.unwrap().is_none());
        }
        conn.close().await;
    }
}

#[tokio::test]
async fn driver_params_override_descriptor_at_open() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fresh.db");
    let dsn = format!("{}?mode=ro", path.display());

    let read_only = open(&TaskContext::new(), &dsn, &ConnectionOptions::default()).await;
    assert!(read_only.is_err());
    assert!(!path.exists());

    let conn = open(&TaskContext::new(), &dsn, &create_options()).await.unwrap();
    conn.close().await;
    assert!(path.exists());
}

#[tokio::test]
async fn cells_follow_storage_class() {
    let ctx = TaskContext::new();
    let mut conn = open(&ctx, ":memory:", &ConnectionOptions::default()).await.unwrap();
    exec(&mut conn, &ctx, "CREATE TABLE mixed (n INTEGER, r REAL, d NUMERIC, b BLOB)").await;
    exec(&mut conn, &ctx, "INSERT INTO mixed VALUES ('n/a', 2.5, 1.5, x'6869')").await;
    {
        let mut cursor = conn.query(&ctx, "SELECT n, r, d, b FROM mixed").await.unwrap();
        let row = cursor.next().await.unwrap().unwrap();
        assert_eq!(
            row.values(),
            [
                CellValue::Text("n/a".into()),
                CellValue::Float(2.5),
                CellValue::Float(1.5),
                CellValue::Bytes(b"hi".to_vec()),
            ]
        );
    }
    conn.close().await;
}
