use std::{error::Error as _, time::Duration};

use async_trait::async_trait;
use jobrun_core::{ContextError, StatusCode, TaskContext, TaskError, TaskHandler, TaskOutput, TaskRequest};
use jobrun_model::{Config, parse_duration};
use jobrun_prometheus::{Labels, MetricSet};
use reqwest::{Client, Method};
use tokio::time::Instant;
use tracing::{debug, instrument};

pub const METRIC_PREFIX: &str = "http_check";
pub const DEFAULT_EXPECTED_STATUS: u16 = 200;

/// `/http_check`: probe a URL and report reachability as gauges.
///
/// A completed request whose status differs from `expected_status` is still a
/// successful check with `http_check_up` set to `0`.
#[derive(Debug, Clone, Default)]
pub struct HttpCheckTask {
    client: Client,
}

impl HttpCheckTask {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[derive(Debug)]
struct CheckParams<'a> {
    target: &'a str,
    method: String,
    expected: u16,
    timeout: Duration,
}

impl<'a> CheckParams<'a> {
    fn parse(req: &'a TaskRequest, cfg: &Config) -> Result<Self, TaskError> {
        req.ensure_get()?;
        let target = req.require("target_url")?;
        let method = req
            .param("method")
            .map_or_else(|| "GET".to_string(), str::to_ascii_uppercase);

        let expected = match req.param("expected_status") {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|e| TaskError::validation(format!("invalid expected_status: {e}")))?,
            None => DEFAULT_EXPECTED_STATUS,
        };

        let timeout = match req.param("timeout") {
            Some(raw) => parse_duration(raw)
                .map_err(|e| TaskError::validation(format!("invalid timeout duration: {e}")))?,
            None => cfg.http_check_timeout(),
        };

        Ok(Self {
            target,
            method,
            expected,
            timeout,
        })
    }
}

/// What one probe observed.
enum Observation {
    Response { status: StatusCode, elapsed: Duration },
    Failed { error: TaskError, reason: String, elapsed: Duration },
}

#[async_trait]
impl TaskHandler for HttpCheckTask {
    fn name(&self) -> &'static str {
        "http_check"
    }

    #[instrument(level = "debug", skip_all, fields(task = "http_check"))]
    async fn handle(&self, ctx: &TaskContext, req: &TaskRequest, cfg: &Config) -> TaskOutput {
        let params = match CheckParams::parse(req, cfg) {
            Ok(params) => params,
            Err(err) => return TaskOutput::rejected(err),
        };

        let mut set = MetricSet::new();
        match self.probe(ctx, &params).await {
            Observation::Response { status, elapsed } => {
                let up = status.as_u16() == params.expected;
                debug!(target_url = params.target, status = status.as_u16(), up, "http check completed");
                record_probe(&mut set, &params, Probe::Status(status.as_u16()), up, elapsed);
                TaskOutput::ok(set.encode())
            }
            Observation::Failed {
                error,
                reason,
                elapsed,
            } => {
                record_probe(&mut set, &params, Probe::Error(&reason), false, elapsed);
                TaskOutput::failed(set.encode(), error)
            }
        }
    }
}

impl HttpCheckTask {
    async fn probe(&self, ctx: &TaskContext, params: &CheckParams<'_>) -> Observation {
        let failed = |error: TaskError, reason: String, elapsed| Observation::Failed {
            error,
            reason,
            elapsed,
        };
        let target = params.target.to_string();

        let request = Method::from_bytes(params.method.as_bytes())
            .map_err(|e| e.to_string())
            .and_then(|method| {
                self.client
                    .request(method, params.target)
                    .build()
                    .map_err(|e| error_chain(&e))
            });
        let request = match request {
            Ok(request) => request,
            Err(reason) => {
                let error = TaskError::ProbeBuild {
                    target,
                    reason: reason.clone(),
                };
                return failed(error, reason, Duration::ZERO);
            }
        };

        let check_ctx = ctx.with_timeout(params.timeout);
        let started = Instant::now();
        let outcome = check_ctx
            .run(async {
                let mut response = self.client.execute(request).await?;
                let elapsed = started.elapsed();
                let status = response.status();
                // Drain so the measured exchange is complete; body content is ignored.
                while let Ok(Some(_)) = response.chunk().await {}
                Ok::<_, reqwest::Error>((status, elapsed))
            })
            .await;

        match outcome {
            Ok(Ok((status, elapsed))) => Observation::Response { status, elapsed },
            Ok(Err(e)) => {
                let reason = error_chain(&e);
                let error = if e.is_timeout() {
                    TaskError::ProbeTimeout {
                        target,
                        reason: reason.clone(),
                    }
                } else {
                    TaskError::ProbeTransport {
                        target,
                        reason: reason.clone(),
                    }
                };
                failed(error, reason, started.elapsed())
            }
            Err(ctx_err) => {
                let reason = ctx_err.to_string();
                let error = match ctx_err {
                    ContextError::DeadlineExceeded => TaskError::ProbeTimeout {
                        target,
                        reason: reason.clone(),
                    },
                    ContextError::Canceled => TaskError::ProbeTransport {
                        target,
                        reason: reason.clone(),
                    },
                };
                failed(error, reason, started.elapsed())
            }
        }
    }
}

enum Probe<'a> {
    Status(u16),
    Error(&'a str),
}

/// Emit `_up`, `_duration_seconds` and, when a response arrived, `_status_code`,
/// all with the same label set.
fn record_probe(set: &mut MetricSet, params: &CheckParams<'_>, probe: Probe<'_>, up: bool, elapsed: Duration) {
    let mut labels = Labels::new()
        .with("target_url", params.target)
        .with("method", params.method.as_str());
    let status = match probe {
        Probe::Status(code) => {
            labels.push("status_code", code.to_string());
            Some(code)
        }
        Probe::Error(reason) => {
            labels.push("error", reason);
            None
        }
    };

    set.set(&format!("{METRIC_PREFIX}_up"), &labels, if up { 1.0 } else { 0.0 });
    set.set(
        &format!("{METRIC_PREFIX}_duration_seconds"),
        &labels,
        elapsed.as_secs_f64(),
    );
    if let Some(code) = status {
        set.set(&format!("{METRIC_PREFIX}_status_code"), &labels, f64::from(code));
    }
}

/// `err: cause: cause` rendering; reqwest's top-level message omits the cause.
fn error_chain(err: &reqwest::Error) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}

#[cfg(test)]
mod tests {
    use jobrun_core::Method as HttpMethod;

    use super::*;

    fn get(params: &[(&str, &str)]) -> TaskRequest {
        params
            .iter()
            .fold(TaskRequest::new(HttpMethod::GET, "/http_check"), |req, (k, v)| {
                req.with_param(*k, *v)
            })
    }

    #[test]
    fn params_defaults() {
        let req = get(&[("target_url", "http://example.test/"), ("method", "head")]);
        let p = CheckParams::parse(&req, &Config::default()).unwrap();
        assert_eq!(p.method, "HEAD");
        assert_eq!(p.expected, 200);
        assert_eq!(p.timeout, Duration::from_secs(15));
    }

    #[test]
    fn params_validation() {
        let cfg = Config::default();
        let missing = CheckParams::parse(&get(&[]), &cfg).unwrap_err();
        assert_eq!(missing.to_string(), "missing required parameter: target_url");

        let bad_status = get(&[("target_url", "http://x/"), ("expected_status", "ok")]);
        assert!(matches!(
            CheckParams::parse(&bad_status, &cfg),
            Err(TaskError::Validation(ref m)) if m.starts_with("invalid expected_status")
        ));

        let bad_timeout = get(&[("target_url", "http://x/"), ("timeout", "soon")]);
        assert!(matches!(
            CheckParams::parse(&bad_timeout, &cfg),
            Err(TaskError::Validation(ref m)) if m.starts_with("invalid timeout duration")
        ));

        let post = TaskRequest::new(HttpMethod::POST, "/http_check").with_param("target_url", "http://x/");
        assert!(matches!(CheckParams::parse(&post, &cfg), Err(TaskError::MethodNotAllowed)));
    }

    #[test]
    fn timeout_parameter_overrides_config() {
        let req = get(&[("target_url", "http://x/"), ("timeout", "1.5s")]);
        let p = CheckParams::parse(&req, &Config::default()).unwrap();
        assert_eq!(p.timeout, Duration::from_millis(1500));
    }

    #[tokio::test]
    async fn malformed_url_is_a_build_failure() {
        let req = get(&[("target_url", "not a url")]);
        let out = HttpCheckTask::default()
            .handle(&TaskContext::new(), &req, &Config::default())
            .await;

        assert_eq!(out.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(matches!(out.error, Some(TaskError::ProbeBuild { .. })));
        let body = String::from_utf8(out.body).unwrap();
        assert!(body.contains("http_check_duration_seconds{target_url=\"not a url\",method=\"GET\",error="));
        assert!(!body.contains("http_check_status_code"));
    }

    #[test]
    fn gauges_share_labels() {
        let req = get(&[("target_url", "http://x/")]);
        let p = CheckParams::parse(&req, &Config::default()).unwrap();
        let mut set = MetricSet::new();
        record_probe(&mut set, &p, Probe::Status(503), false, Duration::from_millis(250));

        assert_eq!(
            set.encode_string(),
            concat!(
                "http_check_duration_seconds{target_url=\"http://x/\",method=\"GET\",status_code=\"503\"} 0.25\n",
                "http_check_status_code{target_url=\"http://x/\",method=\"GET\",status_code=\"503\"} 503\n",
                "http_check_up{target_url=\"http://x/\",method=\"GET\",status_code=\"503\"} 0\n",
            )
        );
    }
}
