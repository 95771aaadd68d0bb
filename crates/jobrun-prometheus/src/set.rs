use std::{collections::BTreeMap, io};

use crate::labels::Labels;

/// Per-request sample accumulator.
///
/// Keys are fully-qualified series names (`name{labels}`); setting an existing
/// key overwrites its value. Samples are written sorted by key.
#[derive(Debug, Clone, Default)]
pub struct MetricSet {
    samples: BTreeMap<String, f64>,
}

impl MetricSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `name{labels}` to `value`, replacing any previous sample.
    pub fn set(&mut self, name: &str, labels: &Labels, value: f64) {
        self.set_key(format!("{name}{}", labels.render()), value);
    }

    /// Set a pre-rendered series key.
    pub fn set_key(&mut self, key: impl Into<String>, value: f64) {
        self.samples.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.samples.get(key).copied()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.samples.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Write every sample as one `key value` line.
    pub fn write_to<W: io::Write>(&self, w: &mut W) -> io::Result<()> {
        for (key, value) in &self.samples {
            writeln!(w, "{key} {}", format_value(*value))?;
        }
        Ok(())
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.samples.len() * 48);
        // Writing into a Vec cannot fail.
        let _ = self.write_to(&mut buf);
        buf
    }

    pub fn encode_string(&self) -> String {
        String::from_utf8_lossy(&self.encode()).into_owned()
    }
}

fn format_value(v: f64) -> String {
    if v.is_nan() {
        "NaN".to_string()
    } else if v.is_infinite() {
        if v > 0.0 { "+Inf" } else { "-Inf" }.to_string()
    } else {
        v.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_write_wins() {
        let mut set = MetricSet::new();
        let labels = Labels::new().with("name", "users");
        set.set("rows", &labels, 1.0);
        set.set("rows", &labels, 2.0);

        assert_eq!(set.len(), 1);
        assert_eq!(set.get(r#"rows{name="users"}"#), Some(2.0));
    }

    #[test]
    fn encodes_sorted_lines() {
        let mut set = MetricSet::new();
        set.set("b", &Labels::new(), 0.25);
        set.set("a", &Labels::new().with("x", "1"), 1250.0);
        set.set_key("c", f64::INFINITY);
        set.set_key("d", f64::NAN);

        assert_eq!(
            set.encode_string(),
            "a{x=\"1\"} 1250\nb 0.25\nc +Inf\nd NaN\n"
        );
    }

    #[test]
    fn empty_set_encodes_nothing() {
        assert!(MetricSet::new().encode().is_empty());
    }
}
