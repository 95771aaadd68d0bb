use std::collections::HashMap;

use http::Method;

use crate::error::TaskError;

/// Method, path and query parameters of an inbound task request.
#[derive(Debug, Clone)]
pub struct TaskRequest {
    method: Method,
    path: String,
    params: HashMap<String, String>,
}

impl TaskRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            params: HashMap::new(),
        }
    }

    /// Build from a raw (still percent-encoded) query string.
    ///
    /// When a key repeats, the first occurrence wins.
    pub fn from_query(method: Method, path: impl Into<String>, query: Option<&str>) -> Self {
        let mut req = Self::new(method, path);
        if let Some(query) = query {
            for (k, v) in url::form_urlencoded::parse(query.as_bytes()) {
                req.params.entry(k.into_owned()).or_insert_with(|| v.into_owned());
            }
        }
        req
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    #[inline]
    pub fn method(&self) -> &Method {
        &self.method
    }

    #[inline]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Parameter value; empty values count as absent.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Parameter value or `""`.
    pub fn param_or_empty(&self, key: &str) -> &str {
        self.param(key).unwrap_or_default()
    }

    /// Parameter value, or a validation error naming the missing key.
    pub fn require(&self, key: &str) -> Result<&str, TaskError> {
        self.param(key)
            .ok_or_else(|| TaskError::validation(format!("missing required parameter: {key}")))
    }

    /// Tasks are read-only probes and answer GET only.
    pub fn ensure_get(&self) -> Result<(), TaskError> {
        if self.method == Method::GET {
            Ok(())
        } else {
            Err(TaskError::MethodNotAllowed)
        }
    }
}
