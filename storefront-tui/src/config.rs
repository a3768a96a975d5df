use std::path::PathBuf;

use serde::Deserialize;
use tracing::warn;

use storefront_core::{AdapterConfig, FeedConfig};

#[derive(Debug, Deserialize, Default)]
pub struct TuiConfig {
    pub url: Option<String>,
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub adapter: Vec<AdapterConfig>,
}

impl TuiConfig {
    pub fn load() -> Self {
        for path in Self::candidate_paths() {
            if let Ok(content) = std::fs::read_to_string(&path) {
                match Self::parse(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "Failed to parse config");
                    }
                }
            }
        }
        Self::default()
    }

    fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    fn candidate_paths() -> Vec<PathBuf> {
        let home = match std::env::var("HOME") {
            Ok(h) => PathBuf::from(h),
            Err(_) => return Vec::new(),
        };

        vec![home.join(".storefront-tui.toml")]
    }
}
