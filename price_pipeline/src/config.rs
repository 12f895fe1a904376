//! Pipeline options derived from the settings provider.
use std::time::Duration;

use price_common::settings::{
    ENQUEUE_TIMEOUT_MS, FEED_INTERVAL_MS, FEED_SYMBOLS, POLL_INTERVAL_MS, QUEUE_CAPACITY,
    USE_MESSAGE_QUEUE,
};
use price_common::SettingsProvider;
use strum_macros::{Display, EnumString};

use crate::model::transfer_queue::QueueCapacity;

/// Instruments of the simulated feed when none are configured.
pub const DEFAULT_SYMBOLS: [&str; 4] = ["AAPL", "MSFT", "TSLA", "GOOGL"];

/// How feed notifications reach the merge step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(ascii_case_insensitive, serialize_all = "lowercase")]
pub enum DispatchMode {
    /// Merge synchronously from the notification callback.
    #[default]
    Direct,
    /// Enqueue and merge from a draining consumer worker.
    Buffered,
}

/// Runtime options of a `PipelineController`.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Direct or buffered dispatch.
    pub mode: DispatchMode,
    /// Transfer queue capacity (buffered mode only).
    pub queue_capacity: QueueCapacity,
    /// Longest producer block on a full bounded queue.
    pub enqueue_timeout: Duration,
    /// How long the consumer waits for an item before re-checking its exit
    /// conditions.
    pub poll_interval: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            mode: DispatchMode::Direct,
            queue_capacity: QueueCapacity::Unbounded,
            enqueue_timeout: Duration::from_millis(250),
            poll_interval: Duration::from_millis(10),
        }
    }
}

impl PipelineConfig {
    /// Read options; missing or unparseable values keep their defaults.
    pub fn from_settings(settings: &impl SettingsProvider) -> Self {
        let defaults = Self::default();
        let mode = if settings.get_bool(USE_MESSAGE_QUEUE, false) {
            DispatchMode::Buffered
        } else {
            DispatchMode::Direct
        };
        Self {
            mode,
            queue_capacity: QueueCapacity::from_setting(settings.get(QUEUE_CAPACITY, 0usize)),
            enqueue_timeout: Duration::from_millis(
                settings.get(ENQUEUE_TIMEOUT_MS, defaults.enqueue_timeout.as_millis() as u64),
            ),
            poll_interval: Duration::from_millis(
                settings.get(POLL_INTERVAL_MS, defaults.poll_interval.as_millis() as u64),
            ),
        }
    }

    /// Same options with another dispatch mode.
    pub fn with_mode(mut self, mode: DispatchMode) -> Self {
        self.mode = mode;
        self
    }
}

/// Options of the built-in feeds.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Pause between emitted updates (replay) or rounds (simulated).
    pub interval: Duration,
    /// Instruments of the simulated feed.
    pub symbols: Vec<String>,
}

impl FeedConfig {
    /// Read options; missing or unparseable values keep their defaults.
    pub fn from_settings(settings: &impl SettingsProvider) -> Self {
        Self {
            interval: Duration::from_millis(settings.get(FEED_INTERVAL_MS, 500u64)),
            symbols: settings.get_list(FEED_SYMBOLS, &DEFAULT_SYMBOLS),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use price_common::Settings;

    #[test]
    fn defaults_select_direct_unbounded() {
        let config = PipelineConfig::from_settings(&Settings::new());
        assert_eq!(config.mode, DispatchMode::Direct);
        assert_eq!(config.queue_capacity, QueueCapacity::Unbounded);
        assert_eq!(config.poll_interval, Duration::from_millis(10));

        let feed = FeedConfig::from_settings(&Settings::new());
        assert_eq!(feed.symbols, DEFAULT_SYMBOLS.to_vec());
        assert_eq!(feed.interval, Duration::from_millis(500));
    }

    #[test]
    fn message_queue_setting_selects_buffered() {
        let mut settings = Settings::new();
        settings.set(USE_MESSAGE_QUEUE, "true");
        settings.set(QUEUE_CAPACITY, "128");
        settings.set(POLL_INTERVAL_MS, "not a number");
        let config = PipelineConfig::from_settings(&settings);
        assert_eq!(config.mode, DispatchMode::Buffered);
        assert_eq!(config.queue_capacity, QueueCapacity::Bounded(128));
        assert_eq!(config.poll_interval, Duration::from_millis(10));
    }

    #[test]
    fn dispatch_mode_parses_case_insensitively() {
        assert_eq!("Buffered".parse::<DispatchMode>().unwrap(), DispatchMode::Buffered);
        assert_eq!(DispatchMode::Direct.to_string(), "direct");
    }
}
