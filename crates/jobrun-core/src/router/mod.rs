use std::{collections::BTreeMap, sync::Arc};

use jobrun_model::Config;
use tracing::{debug, instrument, trace};

use crate::{
    context::TaskContext,
    error::{RouterError, TaskError},
    handler::{TaskHandler, TaskOutput, TaskRequest},
};

/// Route → task handler registry.
///
/// Filled once at startup and shared read-only afterwards.
#[derive(Default, Clone)]
pub struct TaskRouter {
    routes: BTreeMap<String, Arc<dyn TaskHandler>>,
}

impl TaskRouter {
    #[inline]
    pub fn new() -> Self {
        Self {
            routes: BTreeMap::new(),
        }
    }

    pub fn register(
        &mut self,
        route: impl Into<String>,
        handler: Arc<dyn TaskHandler>,
    ) -> Result<(), RouterError> {
        let route = route.into();
        if !route.starts_with('/') {
            return Err(RouterError::InvalidRoute(route));
        }
        if self.routes.contains_key(&route) {
            return Err(RouterError::DuplicateRoute(route));
        }
        debug!(%route, task = handler.name(), "task route registered");
        self.routes.insert(route, handler);
        Ok(())
    }

    pub fn pick(&self, path: &str) -> Option<&Arc<dyn TaskHandler>> {
        self.routes.get(path)
    }

    pub fn routes(&self) -> impl Iterator<Item = &str> {
        self.routes.keys().map(String::as_str)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Run the handler registered for `req.path()`.
    #[instrument(level = "debug", skip_all, fields(path = %req.path(), method = %req.method()))]
    pub async fn dispatch(&self, ctx: &TaskContext, req: &TaskRequest, cfg: &Config) -> TaskOutput {
        let Some(handler) = self.pick(req.path()) else {
            return TaskOutput::rejected(TaskError::UnknownRoute(req.path().to_string()));
        };

        let out = handler.handle(ctx, req, cfg).await;
        trace!(task = handler.name(), status = out.status.as_u16(), "task finished");
        out
    }
}
