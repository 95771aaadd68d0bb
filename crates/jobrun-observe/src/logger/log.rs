use time::{UtcOffset, format_description::well_known::Rfc3339};
use tracing_subscriber::{
    EnvFilter, Layer, Registry, filter::Directive, fmt, fmt::time::OffsetTime,
    layer::SubscriberExt, util::SubscriberInitExt,
};

use crate::logger::{config::LoggerConfig, error::LoggerError, format::LoggerFormat};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// sqlx logs every statement at `info`; keep that out of the default output.
const SQLX_STATEMENTS: &str = "sqlx::query=warn";

pub(crate) fn install(cfg: &LoggerConfig) -> Result<(), LoggerError> {
    if tracing::dispatcher::has_been_set() {
        return Err(LoggerError::AlreadyInitialized);
    }
    let filter = build_filter(&cfg.level)?;

    let layer: BoxedLayer = match cfg.format {
        LoggerFormat::Text => fmt::layer()
            .with_ansi(cfg.use_color)
            .with_target(cfg.with_targets)
            .with_timer(local_timer())
            .with_filter(filter)
            .boxed(),
        LoggerFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_target(cfg.with_targets)
            .with_timer(local_timer())
            .with_filter(filter)
            .boxed(),
        LoggerFormat::Journald => journald_layer(filter)?,
    };

    tracing_subscriber::registry()
        .with(layer)
        .try_init()
        .map_err(|e| {
            // Lost a race with another installer between the check and here.
            if e.to_string().contains("global default trace dispatcher") {
                LoggerError::AlreadyInitialized
            } else {
                LoggerError::InitializationFailed(e.to_string())
            }
        })
}

fn build_filter(level: &str) -> Result<EnvFilter, LoggerError> {
    let invalid = || LoggerError::InvalidLogLevel(level.to_string());
    let filter = EnvFilter::try_new(level).map_err(|_| invalid())?;
    if level.contains("sqlx") {
        return Ok(filter);
    }
    let quiet: Directive = SQLX_STATEMENTS.parse().map_err(|_| invalid())?;
    Ok(filter.add_directive(quiet))
}

fn local_timer() -> OffsetTime<Rfc3339> {
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    OffsetTime::new(offset, Rfc3339)
}

#[cfg(all(target_os = "linux", feature = "journald"))]
fn journald_layer(filter: EnvFilter) -> Result<BoxedLayer, LoggerError> {
    let layer = tracing_journald::layer()
        .map_err(|e| LoggerError::InitializationFailed(format!("journald: {e}")))?
        .with_syslog_identifier("jobrun-agentd".to_string());
    Ok(layer.with_filter(filter).boxed())
}

#[cfg(not(all(target_os = "linux", feature = "journald")))]
fn journald_layer(_filter: EnvFilter) -> Result<BoxedLayer, LoggerError> {
    Err(LoggerError::JournaldNotSupported)
}
