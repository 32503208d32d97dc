//! Configuration for a Zephyr instance.

use crate::clock::DEFAULT_CLOCK_KEY;

/// Configuration for a [`Zephyr`](crate::Zephyr) instance.
#[derive(Debug, Clone)]
pub struct ZephyrConfig {
    /// The reserved key holding each store's last-sync timestamp.
    pub clock_key: String,
    /// Whether to emit a human-readable status line for each key written
    /// and each subscribe/unsubscribe event (at `tracing` debug level).
    pub debug: bool,
}

impl ZephyrConfig {
    /// Creates a configuration with the default clock key and debug off.
    #[must_use]
    pub fn new() -> Self {
        Self {
            clock_key: DEFAULT_CLOCK_KEY.to_owned(),
            debug: false,
        }
    }

    /// Overrides the reserved clock key.
    #[must_use]
    pub fn with_clock_key(mut self, key: impl Into<String>) -> Self {
        self.clock_key = key.into();
        self
    }

    /// Enables or disables per-key status lines.
    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}

impl Default for ZephyrConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ZephyrConfig::default();
        assert_eq!(config.clock_key, DEFAULT_CLOCK_KEY);
        assert!(!config.debug);
    }

    #[test]
    fn builder() {
        let config = ZephyrConfig::new()
            .with_clock_key("app.last-sync")
            .with_debug(true);
        assert_eq!(config.clock_key, "app.last-sync");
        assert!(config.debug);
    }
}
