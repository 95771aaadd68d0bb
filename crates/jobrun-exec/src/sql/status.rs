use jobrun_prometheus::{Labels, MetricSet};

/// Append the per-query outcome gauge: `1` on success, `0` with an `error`
/// label otherwise.
pub fn record_query_status(set: &mut MetricSet, metric_name: &str, query: &str, error: Option<&str>) {
    let mut labels = Labels::new().with("query", query);
    let value = match error {
        Some(err) => {
            labels.push("error", err);
            0.0
        }
        None => 1.0,
    };
    set.set(metric_name, &labels, value);
}
