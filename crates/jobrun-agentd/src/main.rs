mod cli;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{error, info};

use jobrun_api::HttpApi;
use jobrun_core::TaskRouter;
use jobrun_exec::register_builtin_tasks;
use jobrun_model::{Config, ConfigStore};
use jobrun_observe::logger_init;
use jobrun_prometheus::RequestMetrics;

use crate::cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logger
    logger_init(&cli.logger_config()?)?;

    // Config
    let mut config = Config::load_or_default(cli.config.as_deref())
        .context("loading configuration")?;
    cli.apply_overrides(&mut config);
    let addr = config.listen_addr();
    let store = Arc::new(ConfigStore::new(config, cli.config.clone()));
    match store.path() {
        Some(path) => info!(path = %path.display(), "configuration loaded"),
        None => info!("no config file given, using defaults"),
    }

    // Tasks
    let metrics = RequestMetrics::new().context("registering request metrics")?;
    let mut tasks = TaskRouter::new();
    register_builtin_tasks(&mut tasks)?;

    // Serve
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, "listening");

    HttpApi::new(store, tasks, metrics)
        .serve(listener, shutdown_signal())
        .await
        .context("http server")?;

    info!("stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutting down..."),
        Err(e) => error!(error = %e, "failed to listen for ctrl-c"),
    }
}
