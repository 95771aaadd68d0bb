//! Built-in task handlers: SQL query to metrics, and HTTP reachability checks.

mod error;
pub use error::GenerationError;

pub mod sql;
pub use sql::{GenerateStats, MetricGenerator, SqlTask, record_query_status};

pub mod httpcheck;
pub use httpcheck::HttpCheckTask;

mod builtin;
pub use builtin::{BuiltinTask, HTTP_CHECK_ROUTE, SQL_ROUTE, register_builtin_tasks};

pub mod prelude {
    pub use crate::{BuiltinTask, HttpCheckTask, SqlTask, register_builtin_tasks};
}
