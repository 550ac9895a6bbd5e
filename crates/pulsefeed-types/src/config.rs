//! Application configuration types.
//!
//! Every tunable knob lives here: the minimum viable candidate
//! threshold, the scrape wait timeout, feed presentation, and
//! upstream endpoints. Loaded from `{data_dir}/config.toml`; every field
//! has a default so a missing or partial file still yields a working
//! configuration.

use serde::{Deserialize, Serialize};

use crate::message::RetentionClass;

/// Top-level application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub feed: FeedConfig,
    pub oracle: OracleConfig,
    pub scraper: ScraperConfig,
    pub transport: TransportConfig,
    pub training: TrainingConfig,
}

/// Feed orchestration tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Oracle results below this count trigger a scrape round.
    pub min_viable: usize,
    /// Upper bound on waiting for submitted scrape jobs; jobs that exceed
    /// it keep running in the background.
    pub scrape_wait_secs: u64,
    /// Default item count when the request does not specify one.
    pub default_count: usize,
    /// Retention class used when rendering feed items.
    pub item_retention: RetentionClass,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            min_viable: 5,
            scrape_wait_secs: 20,
            default_count: 10,
            item_retention: RetentionClass::Onetime,
        }
    }
}

/// Recommendation oracle endpoint configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            base_url: "http://api:8000".to_string(),
            timeout_secs: 10,
        }
    }
}

/// Scrape worker endpoint configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    pub base_url: String,
    /// Per-call timeout. Scrapes paginate upstream, so this is generous.
    pub timeout_secs: u64,
    /// Items requested per channel scrape.
    pub posts_per_channel: u32,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            base_url: "http://user-bot:8001".to_string(),
            timeout_secs: 60,
            posts_per_channel: 7,
        }
    }
}

/// Chat transport bridge endpoint configuration.
///
/// The bridge wraps the upstream chat protocol; its wire format is out of
/// scope here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            base_url: "http://chat-bridge:8002".to_string(),
            timeout_secs: 10,
        }
    }
}

/// Onboarding tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Channels every new user starts with, without the leading `@`.
    pub default_channels: Vec<String>,
    /// Locale used for sessions created on first contact.
    pub default_language: String,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            default_channels: vec!["durov".to_string(), "telegram".to_string()],
            default_language: "en_US".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = AppConfig::default();
        assert_eq!(config.feed.min_viable, 5);
        assert_eq!(config.feed.scrape_wait_secs, 20);
        assert_eq!(config.feed.item_retention, RetentionClass::Onetime);
        assert_eq!(config.training.default_channels.len(), 2);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
[feed]
min_viable = 3

[oracle]
base_url = "http://localhost:9000"
"#,
        )
        .unwrap();
        assert_eq!(config.feed.min_viable, 3);
        // Unspecified fields fall back to defaults
        assert_eq!(config.feed.scrape_wait_secs, 20);
        assert_eq!(config.oracle.base_url, "http://localhost:9000");
        assert_eq!(config.scraper.posts_per_channel, 7);
    }

    #[test]
    fn item_retention_parses_from_toml() {
        let config: AppConfig = toml::from_str(
            r#"
[feed]
item_retention = "ephemeral"
"#,
        )
        .unwrap();
        assert_eq!(config.feed.item_retention, RetentionClass::Ephemeral);
    }
}
