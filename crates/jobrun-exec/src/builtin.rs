use std::sync::Arc;

use async_trait::async_trait;
use jobrun_core::{RouterError, TaskContext, TaskHandler, TaskOutput, TaskRequest, TaskRouter};
use jobrun_model::Config;

use crate::{httpcheck::HttpCheckTask, sql::SqlTask};

pub const SQL_ROUTE: &str = "/sql";
pub const HTTP_CHECK_ROUTE: &str = "/http_check";

/// The closed set of task types served by the agent.
#[derive(Debug, Clone)]
pub enum BuiltinTask {
    Sql(SqlTask),
    HttpCheck(HttpCheckTask),
}

#[async_trait]
impl TaskHandler for BuiltinTask {
    fn name(&self) -> &'static str {
        match self {
            BuiltinTask::Sql(task) => task.name(),
            BuiltinTask::HttpCheck(task) => task.name(),
        }
    }

    async fn handle(&self, ctx: &TaskContext, req: &TaskRequest, cfg: &Config) -> TaskOutput {
        match self {
            BuiltinTask::Sql(task) => task.handle(ctx, req, cfg).await,
            BuiltinTask::HttpCheck(task) => task.handle(ctx, req, cfg).await,
        }
    }
}

/// Register `/sql` and `/http_check`.
pub fn register_builtin_tasks(router: &mut TaskRouter) -> Result<(), RouterError> {
    router.register(SQL_ROUTE, Arc::new(BuiltinTask::Sql(SqlTask::new())))?;
    router.register(
        HTTP_CHECK_ROUTE,
        Arc::new(BuiltinTask::HttpCheck(HttpCheckTask::default())),
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_both_routes_once() {
        let mut router = TaskRouter::new();
        register_builtin_tasks(&mut router).unwrap();
        assert_eq!(router.routes().collect::<Vec<_>>(), vec!["/http_check", "/sql"]);
        assert_eq!(router.pick("/sql").map(|h| h.name()), Some("sql"));

        assert!(matches!(
            register_builtin_tasks(&mut router),
            Err(RouterError::DuplicateRoute(_))
        ));
    }
}
