//! Prometheus text exposition for jobrun.
//!
//! Two independent pieces live here:
//! - [`MetricSet`]: a per-request accumulator of `name{labels} value` samples.
//!   Each task invocation creates one, fills it, encodes it once, and drops it.
//! - [`RequestMetrics`]: process-wide HTTP request counters backed by the
//!   `prometheus` crate, served on `/metrics`.
//!
//! ## Metrics
//! - `http_requests_total{code, handler, method}` - Counter
//! - `http_request_duration_seconds{code, handler, method}` - Histogram
//!
//! ```rust
//! use jobrun_prometheus::{Labels, MetricSet};
//!
//! let mut set = MetricSet::new();
//! set.set("table_rows", &Labels::new().with("name", "users"), 1250.0);
//! assert_eq!(set.encode_string(), "table_rows{name=\"users\"} 1250\n");
//! ```

mod labels;
pub use labels::{Labels, escape_label_value, is_valid_metric_name, sanitize_label_name};

mod set;
pub use set::MetricSet;

mod requests;
pub use requests::RequestMetrics;

pub use prometheus::{Encoder, Registry, TextEncoder};
