use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::data::view_engine::ViewOptions;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub table: TableConfig,
    pub search: SearchConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    /// Rows per page when a table is first shown
    pub default_page_size: usize,

    /// Sizes offered by the page size selector
    pub page_size_options: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Search across all searchable columns
    pub enable_global_search: bool,

    /// Per-column text and range filters
    pub enable_column_search: bool,

    /// Prompt shown in the global search field
    pub placeholder: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default tracing level; RUST_LOG overrides it
    pub level: String,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            default_page_size: 5,
            page_size_options: vec![5, 10, 20],
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            enable_global_search: true,
            enable_column_search: true,
            placeholder: "Search all columns...".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load config from the default location, writing defaults on first run
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;

        if !config_path.exists() {
            let default_config = Self::default();
            default_config.save_to(&config_path)?;
            return Ok(default_config);
        }

        Self::load_from(&config_path)
    }

    /// Load and validate config from an explicit path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {:?}", path))?;

        Ok(())
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("case-table").join("config.toml"))
    }

    pub fn validate(&self) -> Result<()> {
        if self.table.default_page_size == 0 {
            bail!("table.default_page_size must be at least 1");
        }
        if self.table.page_size_options.contains(&0) {
            bail!("table.page_size_options must not contain 0");
        }
        Ok(())
    }

    /// Engine options derived from this config
    pub fn view_options(&self) -> ViewOptions {
        ViewOptions {
            page_size: self.table.default_page_size,
            default_sort: None,
            page_size_options: self.table.page_size_options.clone(),
            enable_global_search: self.search.enable_global_search,
            enable_column_search: self.search.enable_column_search,
        }
    }

    /// Default config file with comments
    pub fn create_default_with_comments() -> String {
        r#"# Case Table Configuration File
# Location: ~/.config/case-table/config.toml (Linux)
#           ~/Library/Application Support/case-table/config.toml (macOS)
#           %APPDATA%\case-table\config.toml (Windows)

[table]
# Rows per page when a table is first shown
default_page_size = 5

# Sizes offered by the page size selector
page_size_options = [5, 10, 20]

[search]
# Search across all searchable columns
enable_global_search = true

# Per-column text and range filters
enable_column_search = true

# Prompt shown in the global search field
placeholder = "Search all columns..."

[logging]
# trace, debug, info, warn or error (RUST_LOG overrides this)
level = "info"
"#
        .to_string()
    }
}
