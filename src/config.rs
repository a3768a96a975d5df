use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

use storefront_core::{AdapterConfig, MAX_PAGE_SIZE};

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default = "default_max_page_size")]
    pub max_page_size: usize,
    #[serde(default)]
    pub adapter: Vec<AdapterConfig>,
}

fn default_max_page_size() -> usize {
    MAX_PAGE_SIZE
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_page_size: default_max_page_size(),
            adapter: Vec::new(),
        }
    }
}

pub fn load_config(path: &Path) -> anyhow::Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config {}", path.display()))?;
    if config.max_page_size == 0 {
        anyhow::bail!("max_page_size must be at least 1");
    }
    Ok(config)
}
