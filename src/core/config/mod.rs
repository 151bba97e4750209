// SPDX-License-Identifier: MIT OR Apache-2.0

// src/core/config/mod.rs

//! Configuration surface consumed by the core.
//!
//! Durations are written as human-readable strings ("100ms", "60s",
//! "5m") in configuration files. Every field has a default, so an empty
//! document is a valid configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Parse a duration string: a bare number is milliseconds, otherwise a
/// number followed by `ms`, `s`, `m`, or `h`.
pub fn parse_duration(input: &str) -> Result<Duration, String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err("empty duration".to_string());
    }
    let split = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    let (digits, unit) = trimmed.split_at(split);
    let value: u64 = digits
        .parse()
        .map_err(|_| format!("invalid duration '{trimmed}'"))?;
    match unit.trim() {
        "" | "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        "m" => Ok(Duration::from_secs(value * 60)),
        "h" => Ok(Duration::from_secs(value * 3600)),
        other => Err(format!("unknown duration unit '{other}'")),
    }
}

/// Render a duration the way `parse_duration` reads it.
pub fn format_duration(duration: Duration) -> String {
    let millis = duration.as_millis();
    if millis % 60_000 == 0 && millis > 0 {
        format!("{}m", millis / 60_000)
    } else if millis % 1000 == 0 && millis > 0 {
        format!("{}s", millis / 1000)
    } else {
        format!("{millis}ms")
    }
}

mod duration_str {
    use super::{format_duration, parse_duration};
    use serde::{de::Error, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_duration(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_duration(&raw).map_err(D::Error::custom)
    }
}

/// Knobs of the correlation engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CorrelationConfig {
    /// Age after which the reaper force-completes a group.
    #[serde(with = "duration_str")]
    pub group_timeout: Duration,

    /// How often the reaper runs.
    #[serde(with = "duration_str")]
    pub reaper_interval: Duration,

    /// Capacity of the tracked-correlation buffer.
    pub tracked_key_capacity: usize,

    /// Upper bound for outbound sends.
    #[serde(with = "duration_str")]
    pub send_timeout: Duration,

    /// Hand a timed-out group's members to the processor instead of the
    /// discard sink.
    pub send_partial_result_on_expiry: bool,

    /// Let the sequence-size release strategy emit contiguous partial
    /// runs before the group is complete.
    pub release_partial_sequences: bool,
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self {
            group_timeout: Duration::from_secs(60),
            reaper_interval: Duration::from_secs(1),
            tracked_key_capacity: 1000,
            send_timeout: Duration::from_secs(1),
            send_partial_result_on_expiry: false,
            release_partial_sequences: false,
        }
    }
}

/// Knobs of the dispatch engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct DispatchConfig {
    /// Fail broadcast dispatch when the candidate set is empty.
    pub require_subscribers: bool,

    /// Stamp sequence details onto broadcast copies.
    pub apply_sequence: bool,

    /// Worker threads for concurrent broadcast. `None` invokes handlers
    /// on the dispatching thread.
    pub executor_threads: Option<usize>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            require_subscribers: false,
            apply_sequence: false,
            executor_threads: None,
        }
    }
}

/// Top-level configuration document.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RuntimeConfig {
    pub correlation: CorrelationConfig,
    pub dispatch: DispatchConfig,
}

impl RuntimeConfig {
    pub fn from_yaml_str(input: &str) -> Result<Self, String> {
        serde_yaml::from_str(input).map_err(|e| format!("invalid configuration: {e}"))
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, String> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
        Self::from_yaml_str(&raw)
    }
}
