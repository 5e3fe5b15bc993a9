use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::report::RenderOptions;

pub const DEFAULT_CONFIG_FILE: &str = "pn-cover.toml";

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct AnalysisConfig {
    /// 覆盖树节点上限，`None` 表示不限制
    #[serde(default = "default_node_limit")]
    pub node_limit: Option<usize>,
    #[serde(default = "default_true")]
    pub show_tags: bool,
    #[serde(default = "default_true")]
    pub include_zero_tokens: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            node_limit: default_node_limit(),
            show_tags: true,
            include_zero_tokens: true,
        }
    }
}

impl AnalysisConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            show_tags: self.show_tags,
            include_zero_tokens: self.include_zero_tokens,
        }
    }
}

fn default_node_limit() -> Option<usize> {
    Some(10_000)
}

fn default_true() -> bool {
    true
}
