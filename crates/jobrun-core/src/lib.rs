pub mod context;
pub use context::{ContextError, TaskContext};
pub mod error;
pub use error::{RouterError, TaskError};
pub mod handler;
pub use handler::{TaskHandler, TaskOutput, TaskRequest};
pub mod router;
pub use router::TaskRouter;

pub use http::{Method, StatusCode};
