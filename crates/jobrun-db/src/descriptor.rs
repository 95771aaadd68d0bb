use std::collections::BTreeMap;

use url::form_urlencoded;

use crate::{dsn::redact_dsn, engine::Engine, error::DbError};

const MEMORY_SENTINEL: &str = ":memory:";
const EMBEDDED_EXTENSIONS: &[&str] = &[".db", ".sqlite", ".sqlite3", ".db3"];

/// A connection descriptor split into engine, address and query parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    engine: Engine,
    /// Everything between `scheme://` and `?`.
    address: String,
    params: Vec<(String, String)>,
}

impl Descriptor {
    /// Parse a descriptor, recognizing bare embedded-database paths.
    pub fn parse(raw: &str) -> Result<Self, DbError> {
        let (base, query) = match raw.split_once('?') {
            Some((base, query)) => (base, Some(query)),
            None => (raw, None),
        };

        let (engine, address) = match base.split_once("://") {
            Some((scheme, address)) => (Engine::from_token(scheme), address),
            None if looks_embedded(base) => (Engine::Sqlite, base),
            None => {
                return Err(DbError::connection(format!(
                    "failed to parse DSN: missing scheme in {}",
                    redact_dsn(raw)
                )));
            }
        };

        let params = query
            .map(|q| {
                form_urlencoded::parse(q.as_bytes())
                    .map(|(k, v)| (k.into_owned(), v.into_owned()))
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            engine,
            address: address.to_string(),
            params,
        })
    }

    #[inline]
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Everything between `scheme://` and `?`; the file path for sqlite.
    #[inline]
    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn params(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// `true` for the in-memory sqlite sentinel.
    pub fn is_memory(&self) -> bool {
        self.address.ends_with(MEMORY_SENTINEL)
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Apply per-engine overrides; overrides replace same-named parameters.
    pub fn merge_params(&mut self, overrides: Option<&BTreeMap<String, String>>) {
        let Some(overrides) = overrides else {
            return;
        };
        for (key, value) in overrides {
            match self.params.iter_mut().find(|(k, _)| k == key) {
                Some(slot) => slot.1 = value.clone(),
                None => self.params.push((key.clone(), value.clone())),
            }
        }
    }

    /// Descriptor string with the canonical scheme, suitable for the driver.
    pub fn to_url(&self) -> String {
        let mut out = format!("{}://{}", self.engine.scheme(), self.address);
        if !self.params.is_empty() {
            let query = form_urlencoded::Serializer::new(String::new())
                .extend_pairs(&self.params)
                .finish();
            out.push('?');
            out.push_str(&query);
        }
        out
    }

    /// [`to_url`](Self::to_url) with the password masked.
    pub fn redacted(&self) -> String {
        redact_dsn(&self.to_url())
    }
}

fn looks_embedded(path: &str) -> bool {
    let lower = path.to_ascii_lowercase();
    lower.ends_with(MEMORY_SENTINEL) || EMBEDDED_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}
