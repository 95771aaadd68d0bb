use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode},
};
use jobrun_api::HttpApi;
use jobrun_core::TaskRouter;
use jobrun_exec::register_builtin_tasks;
use jobrun_model::{Config, ConfigStore};
use jobrun_prometheus::RequestMetrics;
use tower::ServiceExt;

fn app() -> Router {
    let mut tasks = TaskRouter::new();
    register_builtin_tasks(&mut tasks).unwrap();
    HttpApi::new(
        Arc::new(ConfigStore::fixed(Config::default())),
        tasks,
        RequestMetrics::new().unwrap(),
    )
    .router()
}

async fn call(method: Method, uri: &str) -> (StatusCode, String) {
    let response = app()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

#[tokio::test]
async fn tasks_only_answer_get() {
    for uri in ["/sql", "/http_check"] {
        let (status, body) = call(Method::POST, uri).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED, "{uri}");
        assert_eq!(body, "Task execution failed: method not allowed\n");
    }
}

#[tokio::test]
async fn missing_parameters_are_bad_requests() {
    let (status, body) = call(Method::GET, "/sql?type=sqlite").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, "Task execution failed: missing required parameter: query\n");

    let (status, body) = call(Method::GET, "/http_check").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.ends_with("missing required parameter: target_url\n"));
}

#[tokio::test]
async fn in_memory_sqlite_end_to_end() {
    let (status, body) = call(
        Method::GET,
        "/sql?type=sqlite&db=:memory:&metric_prefix=table_rows\
         &query=SELECT%20'users'%20AS%20name,%201250%20AS%20value",
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{body}");
    let lines: Vec<&str> = body.lines().collect();
    assert_eq!(
        lines,
        vec![
            r#"sql_query_status{query="SELECT 'users' AS name, 1250 AS value"} 1"#,
            r#"table_rows{name="users"} 1250"#,
        ]
    );
}
