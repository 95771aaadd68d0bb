use std::{sync::Arc, time::Duration};

use jobrun_core::TaskContext;
use jobrun_model::ConnectionOptions;
use sqlx::{
    Column as _, Connection as _, Database, Executor as _, MySql, Pool, Postgres, Sqlite,
    pool::{PoolConnection, PoolOptions},
};
use tiberius::Client;
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::{debug, instrument, warn};

use crate::{
    connect,
    cursor::{self, RowCursor},
    descriptor::Descriptor,
    engine::Engine,
    error::DbError,
};

/// Upper bound on waiting for pooled connections to shut down.
const CLOSE_GRACE: Duration = Duration::from_secs(1);

type TdsClient = Client<Compat<TcpStream>>;

enum Backend {
    Postgres(Pooled<Postgres>),
    MySql(Pooled<MySql>),
    Sqlite(Pooled<Sqlite>),
    Tds(Box<TdsClient>),
}

/// A single-use `sqlx` pool; the lease is acquired by the ping or by the first query.
struct Pooled<DB: Database> {
    pool: Pool<DB>,
    lease: Option<PoolConnection<DB>>,
}

impl<DB: Database> Pooled<DB> {
    async fn open(
        ctx: &TaskContext,
        connect: <DB::Connection as sqlx::Connection>::Options,
        options: &ConnectionOptions,
    ) -> Result<Self, DbError> {
        let connect_timeout = options.connect_timeout.as_std();
        let mut pool_options = PoolOptions::<DB>::new()
            .max_connections(options.max_conns.max(1))
            .min_connections(0)
            .test_before_acquire(false);
        if !connect_timeout.is_zero() {
            pool_options = pool_options.acquire_timeout(connect_timeout);
        }
        if !options.max_conn_lifetime.is_zero() {
            pool_options = pool_options.max_lifetime(options.max_conn_lifetime.as_std());
        }
        let pool = pool_options.connect_lazy_with(connect);

        if options.no_ping {
            return Ok(Self { pool, lease: None });
        }

        let pinged = ctx
            .bounded(connect_timeout)
            .run(async {
                let mut conn = pool.acquire().await?;
                conn.ping().await?;
                Ok::<_, sqlx::Error>(conn)
            })
            .await;

        let reason = match pinged {
            Ok(Ok(conn)) => {
                return Ok(Self {
                    pool,
                    lease: Some(conn),
                });
            }
            Ok(Err(e)) => e.to_string(),
            Err(e) => e.to_string(),
        };
        Self { pool, lease: None }.close().await;
        Err(DbError::connection(format!("ping failed: {reason}")))
    }

    async fn lease(&mut self, ctx: &TaskContext) -> Result<&mut PoolConnection<DB>, DbError> {
        let conn = match self.lease.take() {
            Some(conn) => conn,
            None => ctx
                .run(self.pool.acquire())
                .await?
                .map_err(|e| DbError::connection(format!("failed to acquire connection: {e}")))?,
        };
        Ok(self.lease.insert(conn))
    }

    async fn close(self) {
        drop(self.lease);
        if tokio::time::timeout(CLOSE_GRACE, self.pool.close()).await.is_err() {
            warn!("timed out closing database pool");
        }
    }
}

/// A request-scoped database handle.
///
/// Opened, queried, and closed within one task invocation.
pub struct Connection {
    backend: Backend,
    engine: Engine,
    options: ConnectionOptions,
}

/// Open a connection for `descriptor`.
///
/// `driver_params` for the descriptor's engine are merged into its query
/// parameters first, overriding same-named ones. Unless `no_ping` is set the
/// handle is checked within `connect_timeout`; a failed check closes it.
#[instrument(level = "debug", skip_all, fields(engine))]
pub async fn open(
    ctx: &TaskContext,
    descriptor: &str,
    options: &ConnectionOptions,
) -> Result<Connection, DbError> {
    let mut target = Descriptor::parse(descriptor)?;
    let engine = target.engine().clone();
    tracing::Span::current().record("engine", engine.scheme());
    target.merge_params(options.params_for(engine.scheme()));

    let backend = match engine {
        Engine::Postgres => {
            Backend::Postgres(Pooled::open(ctx, connect::postgres(&target)?, options).await?)
        }
        Engine::MySql => Backend::MySql(Pooled::open(ctx, connect::mysql(&target)?, options).await?),
        Engine::Sqlite => {
            Backend::Sqlite(Pooled::open(ctx, connect::sqlite(&target)?, options).await?)
        }
        Engine::SqlServer => open_tds(ctx, &target, options).await?,
        Engine::Oracle | Engine::Other(_) => {
            return Err(DbError::UnsupportedEngine(engine.scheme().to_string()));
        }
    };

    debug!(dsn = %target.redacted(), "database connection opened");
    Ok(Connection {
        backend,
        engine,
        options: options.clone(),
    })
}

async fn open_tds(
    ctx: &TaskContext,
    target: &Descriptor,
    options: &ConnectionOptions,
) -> Result<Backend, DbError> {
    let config = connect::sqlserver(target)?;

    let connect_ctx = ctx.bounded(options.connect_timeout.as_std());
    let client = connect_ctx
        .run(async {
            let tcp = TcpStream::connect(config.get_addr())
                .await
                .map_err(|e| DbError::connection(format!("failed to connect: {e}")))?;
            tcp.set_nodelay(true)
                .map_err(|e| DbError::connection(format!("failed to connect: {e}")))?;
            Client::connect(config, tcp.compat_write())
                .await
                .map_err(|e| DbError::connection(format!("failed to authenticate: {e}")))
        })
        .await
        .map_err(|e| DbError::connection(format!("failed to connect: {e}")))??;

    let mut client = Box::new(client);
    if !options.no_ping {
        let pinged = connect_ctx
            .run(async {
                client.simple_query("SELECT 1").await?.into_results().await?;
                Ok::<_, tiberius::error::Error>(())
            })
            .await;
        let failure = match pinged {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(e.to_string()),
            Err(e) => Some(e.to_string()),
        };
        if let Some(reason) = failure {
            if let Err(e) = client.close().await {
                debug!(error = %e, "closing connection after failed ping");
            }
            return Err(DbError::connection(format!("ping failed: {reason}")));
        }
    }

    Ok(Backend::Tds(client))
}

/// Column names as the server describes them, so they are known even when no
/// row comes back. `None` when the statement cannot be described on its own.
fn described_columns<'q, S: sqlx::Statement<'q>>(
    prepared: Result<S, sqlx::Error>,
) -> Option<Arc<[String]>> {
    match prepared {
        Ok(statement) => Some(
            statement
                .columns()
                .iter()
                .map(|c| c.name().to_string())
                .collect(),
        ),
        Err(e) => {
            debug!(error = %e, "statement metadata unavailable");
            None
        }
    }
}

/// Describe, then stream, `$sql` over a leased `sqlx` connection.
macro_rules! pooled_rows {
    ($pooled:expr, $ctx:expr, $sql:expr, $prepared:expr, $values:path) => {{
        let conn = &mut **$pooled.lease($ctx).await?;
        let declared = described_columns($ctx.run((&mut *conn).prepare($sql)).await?);
        let stream = if $prepared {
            sqlx::query($sql).persistent(false).fetch(conn)
        } else {
            conn.fetch($sql)
        };
        (cursor::adapt(stream, cursor::sqlx_names, $values), declared)
    }};
}

impl Connection {
    #[inline]
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    #[inline]
    pub fn options(&self) -> &ConnectionOptions {
        &self.options
    }

    /// Run `sql` and stream its rows.
    ///
    /// With `prepared_statements` the query is prepared, executed once, and the
    /// statement discarded; otherwise it is sent as a simple query. Both the
    /// round trip and every subsequent fetch honor `ctx`.
    #[instrument(level = "debug", skip_all, fields(engine = %self.engine))]
    pub async fn query<'c>(
        &'c mut self,
        ctx: &TaskContext,
        sql: &'c str,
    ) -> Result<RowCursor<'c>, DbError> {
        if let Some(err) = ctx.err() {
            return Err(err.into());
        }
        let prepared = self.options.prepared_stmts;

        let (rows, declared) = match &mut self.backend {
            Backend::Postgres(pooled) => pooled_rows!(pooled, ctx, sql, prepared, cursor::pg_values),
            Backend::MySql(pooled) => pooled_rows!(pooled, ctx, sql, prepared, cursor::mysql_values),
            Backend::Sqlite(pooled) => {
                pooled_rows!(pooled, ctx, sql, prepared, cursor::sqlite_values)
            }
            Backend::Tds(client) => {
                let mut stream = if prepared {
                    ctx.run(client.query(sql, &[])).await?
                } else {
                    ctx.run(client.simple_query(sql)).await?
                }
                .map_err(DbError::query)?;
                let declared: Option<Arc<[String]>> = ctx
                    .run(stream.columns())
                    .await?
                    .map_err(DbError::query)?
                    .map(|cols| cols.iter().map(|c| c.name().to_string()).collect());
                let rows = cursor::adapt(
                    stream.into_row_stream(),
                    cursor::tds_names,
                    cursor::tds_values,
                );
                (rows, declared)
            }
        };

        Ok(RowCursor::new(rows, ctx.clone()).with_columns(declared))
    }

    /// Release the handle and the driver pool behind it.
    pub async fn close(self) {
        match self.backend {
            Backend::Postgres(pooled) => pooled.close().await,
            Backend::MySql(pooled) => pooled.close().await,
            Backend::Sqlite(pooled) => pooled.close().await,
            Backend::Tds(client) => {
                if let Err(e) = client.close().await {
                    warn!(error = %e, "failed to close database connection");
                }
            }
        }
    }
}
