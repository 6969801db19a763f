//! DataSpace configuration.

use crate::error::DataSpaceResult;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for opening a space.
///
/// Deserializes from the option object `{ "saveTimeout": <ms> }`, so
/// configuration can be kept next to application settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Debounce interval for persistence in milliseconds (0 = flush on
    /// every mutation).
    #[serde(rename = "saveTimeout", default)]
    pub save_timeout_ms: u64,
}

impl Config {
    /// Creates a new configuration with default values (immediate flush).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a configuration from its JSON option object.
    ///
    /// # Errors
    ///
    /// Returns a codec error if the text is not a valid option object.
    pub fn from_json(text: &str) -> DataSpaceResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Sets the debounce interval in milliseconds.
    #[must_use]
    pub const fn save_timeout(mut self, millis: u64) -> Self {
        self.save_timeout_ms = millis;
        self
    }

    /// Sets the debounce interval.
    ///
    /// Sub-millisecond precision is dropped.
    #[must_use]
    pub fn save_interval(mut self, interval: Duration) -> Self {
        self.save_timeout_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Returns the debounce interval, or `None` in immediate mode.
    #[must_use]
    pub fn interval(&self) -> Option<Duration> {
        (self.save_timeout_ms > 0).then(|| Duration::from_millis(self.save_timeout_ms))
    }
}
