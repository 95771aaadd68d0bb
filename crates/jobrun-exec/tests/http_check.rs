use std::time::Duration;

use axum::{Router, http::StatusCode as AxumStatus, routing::get};
use jobrun_core::{Method, StatusCode, TaskContext, TaskError, TaskHandler, TaskRequest};
use jobrun_exec::HttpCheckTask;
use jobrun_model::Config;
use tokio::net::TcpListener;

async fn target_server() -> String {
    let app = Router::new()
        .route("/ok", get(|| async { "fine" }))
        .route("/teapot", get(|| async { (AxumStatus::IM_A_TEAPOT, "short and stout") }))
        .route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                "late"
            }),
        );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn check(target: &str) -> TaskRequest {
    TaskRequest::new(Method::GET, "/http_check").with_param("target_url", target)
}

async fn run(req: &TaskRequest) -> (StatusCode, String, Option<TaskError>) {
    let out = HttpCheckTask::default()
        .handle(&TaskContext::new(), req, &Config::default())
        .await;
    (out.status, String::from_utf8(out.body).unwrap(), out.error)
}

fn sample<'a>(body: &'a str, prefix: &str) -> Option<&'a str> {
    body.lines()
        .find(|l| l.starts_with(prefix))
        .and_then(|l| l.rsplit(' ').next())
}

#[tokio::test]
async fn reachable_target_is_up() {
    let base = target_server().await;
    let target = format!("{base}/ok");
    let (status, body, error) = run(&check(&target)).await;

    assert_eq!(status, StatusCode::OK, "{error:?}");
    let labels = format!("{{target_url=\"{target}\",method=\"GET\",status_code=\"200\"}}");
    assert!(body.contains(&format!("http_check_up{labels} 1\n")), "{body}");
    assert!(body.contains(&format!("http_check_status_code{labels} 200\n")));
    assert!(sample(&body, "http_check_duration_seconds").is_some());
}

#[tokio::test]
async fn status_mismatch_is_down_but_ok() {
    let base = target_server().await;
    let (status, body, error) = run(&check(&format!("{base}/teapot"))).await;

    assert_eq!(status, StatusCode::OK);
    assert!(error.is_none());
    assert_eq!(sample(&body, "http_check_up"), Some("0"));
    assert_eq!(sample(&body, "http_check_status_code"), Some("418"));

    let expected = check(&format!("{base}/teapot")).with_param("expected_status", "418");
    let (_, body, _) = run(&expected).await;
    assert_eq!(sample(&body, "http_check_up"), Some("1"));
}

#[tokio::test]
async fn slow_target_times_out() {
    let base = target_server().await;
    let req = check(&format!("{base}/slow")).with_param("timeout", "200ms");
    let (status, body, error) = run(&req).await;

    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert!(matches!(error, Some(TaskError::ProbeTimeout { .. })));
    assert_eq!(sample(&body, "http_check_up"), Some("0"));
    assert!(body.contains("error=\"context deadline exceeded\""), "{body}");
    assert!(!body.contains("http_check_status_code"));
}

#[tokio::test]
async fn unreachable_target_is_unavailable() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let (status, body, error) = run(&check(&format!("http://{addr}/"))).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(matches!(error, Some(TaskError::ProbeTransport { .. })));
    assert_eq!(sample(&body, "http_check_up"), Some("0"));
    assert!(body.contains(",error=\""));
}
