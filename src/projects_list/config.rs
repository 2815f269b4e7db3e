//! # Configuration
//!
//! Loaded with [`confique`] from TOML files and environment variables.
//!
//! ## Layers
//!
//! Resolved in priority order:
//! 1. **Environment variables**: `PROJECTS_LIST_EXTENSIONS`, `PROJECTS_LIST_PAGE_SIZE`, etc.
//! 2. **Vault Config**: `<vault>/.projects-list.toml`.
//! 3. **Global Config**: OS-appropriate config directory (via `directories` crate).
//! 4. **Compiled Defaults**: `#[config(default = ...)]`.
//!
//! ## Available Settings
//!
//! | Key | Default | Description |
//! |-----|---------|-------------|
//! | `extensions` | `[".md"]` | File extensions treated as documents |
//! | `block_language` | `projects-list` | Info string of the fenced input block (`projects_list__kamyanytsya` is always accepted too) |
//! | `default_page_size` | `25` | Page size for tables without saved state |
//! | `poll_interval_ms` | `1000` | Fallback change check interval for `watch` when no file watcher runs |
//! | `date_style` | `absolute` | `absolute` (`HH:MM:SS dd.mm.yyyy`) or `relative` |

use confique::Config;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::Result;

pub const VAULT_CONFIG_FILE: &str = ".projects-list.toml";
const GLOBAL_CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateStyle {
    Absolute,
    Relative,
}

impl fmt::Display for DateStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateStyle::Absolute => f.write_str("absolute"),
            DateStyle::Relative => f.write_str("relative"),
        }
    }
}

#[derive(Config, Debug, Clone, PartialEq, Eq)]
pub struct ProjectsListConfig {
    /// File extensions treated as documents (e.g. ".md", ".markdown").
    #[config(
        default = [".md"],
        env = "PROJECTS_LIST_EXTENSIONS",
        parse_env = confique::env::parse::list_by_comma
    )]
    pub extensions: Vec<String>,

    /// Info string of the fenced block listing the documents of a table.
    /// Blocks tagged `projects_list__kamyanytsya` are recognized as well.
    #[config(default = "projects-list", env = "PROJECTS_LIST_BLOCK_LANGUAGE")]
    pub block_language: String,

    /// Page size for tables whose host has no saved pagination.
    #[config(default = 25, env = "PROJECTS_LIST_PAGE_SIZE")]
    pub default_page_size: usize,

    /// How long `watch` waits for an event before polling, in milliseconds.
    #[config(default = 1000, env = "PROJECTS_LIST_POLL_INTERVAL_MS")]
    pub poll_interval_ms: u64,

    /// "absolute" or "relative".
    #[config(default = "absolute", env = "PROJECTS_LIST_DATE_STYLE")]
    pub date_style: DateStyle,
}

impl ProjectsListConfig {
    /// Loads all layers for the vault at `vault`. Missing files are skipped.
    pub fn load(vault: &Path) -> Result<Self> {
        let mut builder = Self::builder()
            .env()
            .file(vault.join(VAULT_CONFIG_FILE));
        if let Some(global) = global_config_path() {
            builder = builder.file(global);
        }
        let config = builder.load()?;
        tracing::debug!(?config, "Loaded configuration");
        Ok(config)
    }

    /// A commented TOML file listing every setting with its default.
    pub fn template() -> String {
        confique::toml::template::<Self>(confique::toml::FormatOptions::default())
    }
}

pub fn global_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "projects-list").map(|dirs| dirs.config_dir().join(GLOBAL_CONFIG_FILE))
}
