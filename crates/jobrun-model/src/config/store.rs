use std::{
    path::{Path, PathBuf},
    sync::{Arc, PoisonError, RwLock},
};

use super::Config;
use crate::error::ConfigError;

/// Shared, reloadable configuration.
///
/// Readers take an immutable snapshot under the read lock; [`reload`](Self::reload)
/// builds a complete new [`Config`] and swaps it in under the write lock.
#[derive(Debug)]
pub struct ConfigStore {
    path: Option<PathBuf>,
    current: RwLock<Arc<Config>>,
}

impl ConfigStore {
    /// Create a store seeded with `config`; `path` is re-read on reload.
    pub fn new(config: Config, path: Option<PathBuf>) -> Self {
        Self {
            path,
            current: RwLock::new(Arc::new(config)),
        }
    }

    /// Store without a backing file; reload is rejected.
    pub fn fixed(config: Config) -> Self {
        Self::new(config, None)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Current configuration. The snapshot stays valid across reloads.
    pub fn snapshot(&self) -> Arc<Config> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Re-read the config file and replace the current snapshot.
    ///
    /// On failure the previous configuration stays in effect.
    pub fn reload(&self) -> Result<Arc<Config>, ConfigError> {
        let path = self.path.as_deref().ok_or(ConfigError::ReloadUnsupported)?;
        let next = Arc::new(Config::load(path)?);

        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Arc::clone(&next);
        Ok(next)
    }

    /// Replace the configuration wholesale.
    pub fn replace(&self, config: Config) {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Arc::new(config);
    }
}
