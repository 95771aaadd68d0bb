use std::fmt::Write;

/// Ordered label list rendered as `{a="x",b="y"}`.
///
/// Insertion order is kept: callers decide the positional layout of the key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Labels(Vec<(String, String)>);

impl Labels {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Append a label. Names that collide after sanitizing get a positional
    /// suffix (`a_b`, `a_b_2`, ...) so the rendered set stays valid.
    pub fn push(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        let base = sanitize_label_name(name.as_ref());
        let mut name = base.clone();
        let mut n = 1;
        while self.contains(&name) {
            n += 1;
            name = format!("{base}_{n}");
        }
        self.0.push((name, value.into()));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|(k, _)| k == name)
    }

    pub fn with(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.push(name, value);
        self
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// `{...}` suffix, or an empty string when there are no labels.
    pub fn render(&self) -> String {
        if self.0.is_empty() {
            return String::new();
        }
        let mut out = String::from("{");
        for (i, (name, value)) in self.0.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            let _ = write!(out, "{name}=\"{}\"", escape_label_value(value));
        }
        out.push('}');
        out
    }
}

/// Escape `\`, `"` and newlines as the text exposition format requires.
pub fn escape_label_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            c => out.push(c),
        }
    }
    out
}

/// Map an arbitrary column name onto `[a-zA-Z_][a-zA-Z0-9_]*`.
pub fn sanitize_label_name(name: &str) -> String {
    let mut out: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if out.is_empty() || out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

/// `true` when `name` matches `[a-zA-Z_:][a-zA-Z0-9_:]*`.
pub fn is_valid_metric_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == ':' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_in_insertion_order() {
        let labels = Labels::new().with("query", "SELECT 1").with("error", "boom");
        assert_eq!(labels.render(), r#"{query="SELECT 1",error="boom"}"#);
        assert_eq!(Labels::new().render(), "");
    }

    #[test]
    fn escapes_values() {
        let labels = Labels::new().with("q", "say \"hi\"\\n\nend");
        assert_eq!(labels.render(), r#"{q="say \"hi\"\\n\nend"}"#);
    }

    #[test]
    fn sanitizes_names() {
        assert_eq!(sanitize_label_name("name"), "name");
        assert_eq!(sanitize_label_name("count(*)"), "count___");
        assert_eq!(sanitize_label_name("1st"), "_1st");
        assert_eq!(sanitize_label_name(""), "_");
    }

    #[test]
    fn colliding_names_get_suffixes() {
        let labels = Labels::new()
            .with("a-b", "1")
            .with("a_b", "2")
            .with("a b", "3")
            .with("a_b_2", "4");
        assert_eq!(
            labels.render(),
            r#"{a_b="1",a_b_2="2",a_b_3="3",a_b_2_2="4"}"#
        );
    }

    #[test]
    fn metric_names() {
        assert!(is_valid_metric_name("sql_query_result"));
        assert!(is_valid_metric_name("ns:metric_1"));
        assert!(!is_valid_metric_name("1metric"));
        assert!(!is_valid_metric_name("bad-name"));
        assert!(!is_valid_metric_name(""));
    }
}
