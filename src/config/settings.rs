//! User settings and preferences
//!
//! Manages settings stored in ~/.aoi-query/config.toml

use crate::config::ConnectionConfig;
use crate::error::ConfigResult;
use crate::sql::RelateMask;
use serde::{Deserialize, Serialize};

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Log level used when neither the CLI nor the environment sets one
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Spatial interaction tested between table rows and the AOI
    #[serde(default)]
    pub relate_mask: RelateMask,

    /// Reserved annotation column never selected from spatial tables
    #[serde(default = "default_excluded_column")]
    pub excluded_column: String,

    /// Rows shown in the terminal preview
    #[serde(default = "default_row_limit")]
    pub display_row_limit: usize,
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_excluded_column() -> String {
    "se_anno_cad_data".to_string()
}

fn default_row_limit() -> usize {
    20
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            relate_mask: RelateMask::default(),
            excluded_column: default_excluded_column(),
            display_row_limit: default_row_limit(),
        }
    }
}

/// Load settings from config file
pub fn load_settings() -> ConfigResult<Settings> {
    let path = ConnectionConfig::config_dir()?.join("config.toml");
    if !path.exists() {
        return Ok(Settings::default());
    }
    let content = std::fs::read_to_string(&path)?;
    parse_settings(&content)
}

/// Parse settings from TOML text, filling defaults for missing keys
pub fn parse_settings(content: &str) -> ConfigResult<Settings> {
    Ok(toml::from_str(content)?)
}
