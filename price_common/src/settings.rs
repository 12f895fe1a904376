//! Key-value settings provider.
//!
//! Values are looked up by key and converted on demand; a missing or
//! unparseable value yields the caller's default. Settings are read from a
//! `key=value` file and may be overlaid by `PRICE_<Key>` environment variables.
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::str::FromStr;

use log::debug;

use crate::error::PipelineError;

/// Prefix of environment variables that override file settings.
pub const ENV_PREFIX: &str = "PRICE_";

/// Selects buffered (`true`) or direct (`false`) dispatch.
pub const USE_MESSAGE_QUEUE: &str = "UseMessageQueue";
/// Transfer queue capacity; `0` means unbounded.
pub const QUEUE_CAPACITY: &str = "QueueCapacity";
/// Longest time a producer blocks on a full bounded queue.
pub const ENQUEUE_TIMEOUT_MS: &str = "EnqueueTimeoutMs";
/// Wait granularity of the draining consumer.
pub const POLL_INTERVAL_MS: &str = "PollIntervalMs";
/// Emit interval of the built-in feeds.
pub const FEED_INTERVAL_MS: &str = "FeedIntervalMs";
/// Comma separated instruments of the simulated feed.
pub const FEED_SYMBOLS: &str = "FeedSymbols";

/// Source of raw setting values.
///
/// Only `raw` has to be provided; the typed getters fall back to `default`
/// whenever the key is missing or its value does not convert.
pub trait SettingsProvider {
    /// Raw string value stored under `key`, if any.
    fn raw(&self, key: &str) -> Option<String>;

    /// Typed lookup using `FromStr`.
    fn get<T: FromStr>(&self, key: &str, default: T) -> T
    where
        Self: Sized,
    {
        match self.raw(key) {
            Some(value) if !value.trim().is_empty() => {
                value.trim().parse().unwrap_or_else(|_| {
                    debug!("Setting {} has unparseable value '{}', using default", key, value);
                    default
                })
            }
            _ => default,
        }
    }

    /// Boolean lookup accepting `true`/`false` in any case and `1`/`0`.
    fn get_bool(&self, key: &str, default: bool) -> bool {
        match self.raw(key).map(|v| v.trim().to_ascii_lowercase()) {
            Some(v) if v == "true" || v == "1" => true,
            Some(v) if v == "false" || v == "0" => false,
            Some(v) if !v.is_empty() => {
                debug!("Setting {} has unparseable value '{}', using default", key, v);
                default
            }
            _ => default,
        }
    }

    /// Comma separated list lookup; empty items are skipped.
    fn get_list(&self, key: &str, default: &[&str]) -> Vec<String> {
        let items: Vec<String> = self
            .raw(key)
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();
        if items.is_empty() {
            default.iter().map(|s| s.to_string()).collect()
        } else {
            items
        }
    }
}

/// In-memory settings map.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    values: HashMap<String, String>,
}

impl Settings {
    /// Creates an empty settings map; every lookup yields its default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses `key=value` lines. Blank lines and lines starting with `#` are
    /// ignored; a line without `=` is an error.
    pub fn parse_from_reader<R: BufRead>(reader: R) -> Result<Self, PipelineError> {
        let mut values = HashMap::new();
        for (index, line_result) in reader.lines().enumerate() {
            let line = line_result?;
            let trimmed_line = line.trim();
            if trimmed_line.is_empty() || trimmed_line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = trimmed_line.split_once('=') else {
                return Err(PipelineError::ParseSettings(format!(
                    "line {}: expected key=value, found '{}'",
                    index + 1,
                    trimmed_line
                )));
            };
            values.insert(key.trim().to_string(), value.trim().to_string());
        }
        Ok(Self { values })
    }

    /// Loads settings from a file.
    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        let file = File::open(path)?;
        Self::parse_from_reader(BufReader::new(file))
    }

    /// Overlays `PRICE_<Key>` variables from the process environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(std::env::vars())
    }

    /// Overlays `PRICE_<Key>` pairs from `vars`; other pairs are ignored.
    pub fn with_overrides<I>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (name, value) in vars {
            if let Some(key) = name.strip_prefix(ENV_PREFIX) {
                if !key.is_empty() {
                    self.values.insert(key.to_string(), value);
                }
            }
        }
        self
    }

    /// Stores `value` under `key`, replacing any previous value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }
}

impl SettingsProvider for Settings {
    fn raw(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}
