//! Per-device configuration.

use serde::{Deserialize, Serialize};

/// Environment variable holding the default debug level.
pub const HMAP_DEBUG_ENV: &str = "HMAP_DEBUG";

/// Highest meaningful debug level: per-event traces.
pub const MAX_DEBUG_LEVEL: u8 = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HmapConfig {
    /// 0 = quiet, 1 = trace each report, 2 = trace each emitted event.
    pub debug_level: u8,
    /// Appended to the device name given to the sink.
    pub description: Option<String>,
}

impl Default for HmapConfig {
    fn default() -> Self {
        Self {
            debug_level: default_debug_level(),
            description: None,
        }
    }
}

impl HmapConfig {
    pub fn with_debug_level(mut self, level: u8) -> Self {
        self.debug_level = level;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sink name: device name followed by the description, if any.
    pub fn device_name(&self, base: &str) -> String {
        match self.description.as_deref() {
            Some(desc) if base.is_empty() => desc.to_string(),
            Some(desc) => format!("{base} {desc}"),
            None => base.to_string(),
        }
    }
}

pub fn parse_debug_level(value: &str) -> Option<u8> {
    let value = value.trim();
    match value {
        "" => None,
        "true" | "yes" | "on" => Some(1),
        "false" | "no" | "off" => Some(0),
        _ => value.parse::<u8>().ok(),
    }
}

pub fn default_debug_level() -> u8 {
    std::env::var(HMAP_DEBUG_ENV)
        .ok()
        .and_then(|v| parse_debug_level(&v))
        .unwrap_or(0)
}
