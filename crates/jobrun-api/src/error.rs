use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use jobrun_model::ConfigError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("configuration reload not supported: no config file path specified at startup")]
    ReloadUnsupported,

    #[error("failed to reload configuration: {0}")]
    Reload(#[source] ConfigError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::ReloadUnsupported => StatusCode::NOT_IMPLEMENTED,
            ApiError::Reload(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::ReloadUnsupported => ApiError::ReloadUnsupported,
            other => ApiError::Reload(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), format!("{self}\n")).into_response()
    }
}
