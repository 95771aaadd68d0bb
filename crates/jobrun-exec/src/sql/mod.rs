mod coerce;
pub use coerce::{CoerceError, to_f64};

mod generate;
pub use generate::{DEFAULT_METRIC_PREFIX, DEFAULT_VALUE_COLUMN, GenerateStats, MetricGenerator};

mod status;
pub use status::record_query_status;

use std::fmt;

use async_trait::async_trait;
use jobrun_core::{TaskContext, TaskError, TaskHandler, TaskOutput, TaskRequest};
use jobrun_db::{Connection, DbError, DsnParts, Engine, build_dsn, open};
use jobrun_model::Config;
use jobrun_prometheus::{MetricSet, is_valid_metric_name};
use tracing::{debug, instrument};

use crate::error::GenerationError;

/// `/sql`: run a caller-supplied query and expose its rows as samples.
///
/// Parameters: `query`, `type`, `username`, `password`, `host`, `port`, `db`,
/// `value_column`, `metric_prefix`.
#[derive(Debug, Clone, Default)]
pub struct SqlTask;

impl SqlTask {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TaskHandler for SqlTask {
    fn name(&self) -> &'static str {
        "sql"
    }

    #[instrument(level = "debug", skip_all, fields(task = "sql"))]
    async fn handle(&self, ctx: &TaskContext, req: &TaskRequest, cfg: &Config) -> TaskOutput {
        let params = match SqlParams::parse(req, cfg) {
            Ok(params) => params,
            Err(err) => return TaskOutput::rejected(err),
        };

        let mut set = MetricSet::new();
        let result = execute(ctx, &params, cfg, &mut set).await;

        let detail = result.as_ref().err().map(ToString::to_string);
        record_query_status(&mut set, &cfg.query_status_metric_name, params.query, detail.as_deref());

        match result {
            Ok(stats) => {
                debug!(
                    rows = stats.rows,
                    emitted = stats.emitted,
                    skipped_null = stats.skipped_null,
                    skipped_invalid = stats.skipped_invalid,
                    "query metrics generated"
                );
                TaskOutput::ok(set.encode())
            }
            Err(failure) => TaskOutput::failed(set.encode(), failure.into()),
        }
    }
}

/// Validated `/sql` parameters.
#[derive(Debug)]
struct SqlParams<'a> {
    query: &'a str,
    engine: &'a str,
    username: &'a str,
    password: &'a str,
    host: &'a str,
    port: &'a str,
    database: &'a str,
    value_column: &'a str,
    metric_prefix: &'a str,
}

impl<'a> SqlParams<'a> {
    fn parse(req: &'a TaskRequest, cfg: &'a Config) -> Result<Self, TaskError> {
        req.ensure_get()?;
        let query = req.require("query")?;
        let engine = req.require("type")?;

        let username = req.param_or_empty("username");
        let host = req.param_or_empty("host");
        let database = req.param_or_empty("db");

        if Engine::from_token(engine).is_embedded() {
            if database.is_empty() {
                return Err(TaskError::validation(
                    "missing required parameter: db (database file path for SQLite)",
                ));
            }
        } else if username.is_empty() || host.is_empty() || database.is_empty() {
            return Err(TaskError::validation(
                "missing required connection parameters (username, host, db) for non-SQLite types",
            ));
        }

        let metric_prefix = req
            .param("metric_prefix")
            .unwrap_or(cfg.query_metric_name.as_str());
        if !is_valid_metric_name(metric_prefix) {
            return Err(TaskError::validation(format!(
                "invalid metric_prefix: {metric_prefix}"
            )));
        }

        Ok(Self {
            query,
            engine,
            username,
            password: req.param_or_empty("password"),
            host,
            port: req.param_or_empty("port"),
            database,
            value_column: req.param("value_column").unwrap_or(DEFAULT_VALUE_COLUMN),
            metric_prefix,
        })
    }

    fn dsn_parts(&self) -> DsnParts<'a> {
        DsnParts {
            engine: self.engine,
            username: self.username,
            password: self.password,
            host: self.host,
            port: self.port,
            database: self.database,
        }
    }
}

/// Pipeline stage that failed; `Display` is the bare cause used in the
/// status gauge.
#[derive(Debug)]
enum Failure {
    Dsn(DbError),
    Connect(DbError),
    Query(DbError),
    Generate(GenerationError),
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Failure::Dsn(e) | Failure::Connect(e) | Failure::Query(e) => fmt::Display::fmt(e, f),
            Failure::Generate(e) => fmt::Display::fmt(e, f),
        }
    }
}

impl From<Failure> for TaskError {
    fn from(failure: Failure) -> Self {
        let detail = failure.to_string();
        match failure {
            Failure::Dsn(_) => TaskError::DsnBuild(detail),
            Failure::Connect(_) => TaskError::Connection(detail),
            Failure::Query(_) => TaskError::Query(detail),
            Failure::Generate(_) => TaskError::Generation(detail),
        }
    }
}

async fn execute(
    ctx: &TaskContext,
    params: &SqlParams<'_>,
    cfg: &Config,
    set: &mut MetricSet,
) -> Result<GenerateStats, Failure> {
    let dsn = build_dsn(&params.dsn_parts()).map_err(Failure::Dsn)?;

    let query_ctx = ctx.bounded(cfg.conn_options.query_timeout.as_std());
    let mut conn = open(&query_ctx, &dsn, &cfg.conn_options)
        .await
        .map_err(Failure::Connect)?;

    let result = run_query(&mut conn, &query_ctx, params, set).await;
    conn.close().await;
    result
}

async fn run_query(
    conn: &mut Connection,
    ctx: &TaskContext,
    params: &SqlParams<'_>,
    set: &mut MetricSet,
) -> Result<GenerateStats, Failure> {
    let mut cursor = conn.query(ctx, params.query).await.map_err(Failure::Query)?;
    // Drivers report statement errors on the first fetch.
    cursor.columns().await.map_err(Failure::Query)?;

    MetricGenerator::new(params.metric_prefix, params.value_column)
        .generate(set, &mut cursor)
        .await
        .map_err(Failure::Generate)
}
