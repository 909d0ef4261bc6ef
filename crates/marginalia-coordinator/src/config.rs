//! Coordinator configuration: the component configs plus fallback policy.

use std::env;

use marginalia_anchor::{BuilderConfig, LocatorConfig};
use marginalia_core::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct CoordinatorConfig {
    pub builder: BuilderConfig,
    pub locator: LocatorConfig,
    /// Try the host's native highlight command when direct wrapping fails.
    pub native_fallback: bool,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            builder: BuilderConfig::default(),
            locator: LocatorConfig::default(),
            native_fallback: true,
        }
    }
}

impl CoordinatorConfig {
    /// Load configuration from environment variables.
    ///
    /// Component variables are read by their own configs; this adds
    /// `MARGINALIA_NATIVE_FALLBACK` (default: true).
    pub fn from_env() -> Self {
        let native_fallback = env::var("MARGINALIA_NATIVE_FALLBACK")
            .ok()
            .map(|v| !matches!(v.trim().to_ascii_lowercase().as_str(), "0" | "false" | "no" | "off"))
            .unwrap_or(true);
        Self {
            builder: BuilderConfig::from_env(),
            locator: LocatorConfig::from_env(),
            native_fallback,
        }
    }

    /// Reject settings under which nothing could ever be anchored or
    /// resolved.
    pub fn validate(&self) -> Result<()> {
        let builder = &self.builder;
        if builder.window_min_chars == 0 || builder.window_min_chars > builder.window_max_chars {
            return Err(Error::Config(format!(
                "window scan needs 0 < min <= max, got {}..={}",
                builder.window_min_chars, builder.window_max_chars
            )));
        }
        if self.locator.strategies.is_empty() {
            return Err(Error::Config("no locate strategies configured".to_string()));
        }
        if self.locator.fuzzy_probe_chars == 0 {
            return Err(Error::Config("fuzzy probe length must be positive".to_string()));
        }
        Ok(())
    }

    pub fn with_builder(mut self, builder: BuilderConfig) -> Self {
        self.builder = builder;
        self
    }

    pub fn with_locator(mut self, locator: LocatorConfig) -> Self {
        self.locator = locator;
        self
    }

    pub fn with_native_fallback(mut self, enabled: bool) -> Self {
        self.native_fallback = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_enables_fallback() {
        let config = CoordinatorConfig::default();
        assert!(config.native_fallback);
        assert_eq!(config.builder, BuilderConfig::default());
    }

    #[test]
    fn test_builders() {
        let config = CoordinatorConfig::default()
            .with_native_fallback(false)
            .with_locator(LocatorConfig::default().with_fuzzy_threshold(0.9));
        assert!(!config.native_fallback);
        assert!((config.locator.fuzzy_threshold - 0.9).abs() < f32::EPSILON);
    }

    #[test]
    fn test_validate() {
        assert!(CoordinatorConfig::default().validate().is_ok());

        let inverted = CoordinatorConfig::default().with_builder(BuilderConfig {
            window_min_chars: 8,
            window_max_chars: 4,
            ..BuilderConfig::default()
        });
        assert!(matches!(inverted.validate(), Err(Error::Config(_))));

        let no_strategies = CoordinatorConfig::default()
            .with_locator(LocatorConfig::default().with_strategies(&[]));
        assert!(matches!(no_strategies.validate(), Err(Error::Config(_))));

        let no_probe = CoordinatorConfig::default()
            .with_locator(LocatorConfig::default().with_fuzzy_probe_chars(0));
        let err = no_probe.validate().unwrap_err();
        assert!(err.to_string().starts_with("Configuration error"));
    }
}
