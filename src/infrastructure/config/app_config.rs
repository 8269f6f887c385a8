use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::application::panel::PanelLimits;

/// Built-in application defaults, embedded from resources/configs/app.yaml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub panel: PanelConfig,
    pub rest: RestConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelConfig {
    /// Maximum number of players returned by one search
    pub search_limit: usize,
    /// Queries shorter than this (after trimming) are not sent
    pub min_search_chars: usize,
    /// Idle time after the last keystroke before searching
    pub search_debounce: String,
    pub group_name_max_chars: usize,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            search_limit: 10,
            min_search_chars: 1,
            search_debounce: "250ms".to_string(),
            group_name_max_chars: 64,
        }
    }
}

impl PanelConfig {
    pub fn search_debounce(&self) -> Duration {
        parse_duration_or(&self.search_debounce, Duration::from_millis(250))
    }

    pub fn limits(&self) -> PanelLimits {
        PanelLimits {
            name_max_chars: self.group_name_max_chars,
            min_search_chars: self.min_search_chars,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RestConfig {
    pub request_timeout: String,
    /// Path of the table API under the project URL
    pub schema_path: String,
    /// Path of the auth API under the project URL
    pub auth_path: String,
}

impl Default for RestConfig {
    fn default() -> Self {
        Self {
            request_timeout: "10s".to_string(),
            schema_path: "/rest/v1".to_string(),
            auth_path: "/auth/v1".to_string(),
        }
    }
}

impl RestConfig {
    pub fn request_timeout(&self) -> Duration {
        parse_duration_or(&self.request_timeout, Duration::from_secs(10))
    }
}

fn parse_duration_or(value: &str, fallback: Duration) -> Duration {
    match humantime::parse_duration(value.trim()) {
        Ok(duration) => duration,
        Err(e) => {
            tracing::warn!("Invalid duration {:?} ({}), using {:?}", value, e, fallback);
            fallback
        }
    }
}
