use http::StatusCode;
use thiserror::Error;

/// Failure of one task invocation.
///
/// Every variant maps onto the HTTP status returned to the caller, see
/// [`TaskError::status`]. A status mismatch observed by an HTTP check is not
/// an error: it is reported as an `up` gauge of `0`.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("method not allowed")]
    MethodNotAllowed,

    #[error("{0}")]
    Validation(String),

    #[error("no task registered for path {0}")]
    UnknownRoute(String),

    #[error("failed to build DSN: {0}")]
    DsnBuild(String),

    #[error("failed to connect to database: {0}")]
    Connection(String),

    #[error("failed to execute query: {0}")]
    Query(String),

    #[error("failed to generate metrics: {0}")]
    Generation(String),

    #[error("failed to create request for target_url {target}: {reason}")]
    ProbeBuild { target: String, reason: String },

    #[error("request to target_url {target} timed out: {reason}")]
    ProbeTimeout { target: String, reason: String },

    #[error("request to target_url {target} failed: {reason}")]
    ProbeTransport { target: String, reason: String },
}

impl TaskError {
    pub fn validation(msg: impl Into<String>) -> Self {
        TaskError::Validation(msg.into())
    }

    /// HTTP status code for this failure.
    pub fn status(&self) -> StatusCode {
        match self {
            TaskError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            TaskError::Validation(_) | TaskError::DsnBuild(_) => StatusCode::BAD_REQUEST,
            TaskError::UnknownRoute(_) => StatusCode::NOT_FOUND,
            TaskError::Connection(_)
            | TaskError::Query(_)
            | TaskError::Generation(_)
            | TaskError::ProbeBuild { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            TaskError::ProbeTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            TaskError::ProbeTransport { .. } => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// `true` for errors caused by the caller's input rather than by execution.
    pub fn is_client_error(&self) -> bool {
        self.status().is_client_error()
    }

    /// Short stable name, used as a log field.
    pub fn kind(&self) -> &'static str {
        match self {
            TaskError::MethodNotAllowed => "method_not_allowed",
            TaskError::Validation(_) => "validation",
            TaskError::UnknownRoute(_) => "unknown_route",
            TaskError::DsnBuild(_) => "dsn_build",
            TaskError::Connection(_) => "connection",
            TaskError::Query(_) => "query",
            TaskError::Generation(_) => "generation",
            TaskError::ProbeBuild { .. } => "probe_build",
            TaskError::ProbeTimeout { .. } => "probe_timeout",
            TaskError::ProbeTransport { .. } => "probe_transport",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RouterError {
    #[error("route already registered: {0}")]
    DuplicateRoute(String),

    #[error("route must start with '/': {0}")]
    InvalidRoute(String),
}
