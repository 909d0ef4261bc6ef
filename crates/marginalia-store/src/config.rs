//! Store configuration.

use std::env;

use marginalia_core::defaults::{STORE_KEY, STORE_RETRIES};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Backend key holding the highlight array.
    pub key: String,
    /// Extra attempts after a failed backend call.
    pub retries: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            key: STORE_KEY.to_string(),
            retries: STORE_RETRIES,
        }
    }
}

impl StoreConfig {
    /// Load configuration from environment variables.
    ///
    /// - `MARGINALIA_STORE_KEY` (default: `marginalia.highlights`)
    /// - `MARGINALIA_STORE_RETRIES` (default: 1)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            key: env::var("MARGINALIA_STORE_KEY")
                .ok()
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty())
                .unwrap_or(defaults.key),
            retries: env::var("MARGINALIA_STORE_RETRIES")
                .ok()
                .and_then(|r| r.trim().parse().ok())
                .unwrap_or(defaults.retries),
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Total attempts per backend call.
    pub fn attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }
}
