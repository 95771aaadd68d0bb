use http::StatusCode;

use crate::error::TaskError;

/// Result of one task invocation: exposition bytes plus the status to answer with.
#[derive(Debug)]
pub struct TaskOutput {
    pub body: Vec<u8>,
    pub status: StatusCode,
    pub error: Option<TaskError>,
}

impl TaskOutput {
    /// Successful run.
    pub fn ok(body: Vec<u8>) -> Self {
        Self {
            body,
            status: StatusCode::OK,
            error: None,
        }
    }

    /// Execution failed; `body` carries the diagnostics gathered so far.
    pub fn failed(body: Vec<u8>, error: TaskError) -> Self {
        Self {
            body,
            status: error.status(),
            error: Some(error),
        }
    }

    /// Rejected before execution; nothing was produced.
    pub fn rejected(error: TaskError) -> Self {
        Self::failed(Vec::new(), error)
    }

    #[inline]
    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.status.is_success()
    }
}
