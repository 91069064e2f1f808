//! `nako.toml` loading.
//!
//! ```toml
//! [analyzer]
//! problems_limit = 50
//! hint_unmatched_josi = false
//!
//! [catalog]
//! plugins = ["plugins/turtle.json"]
//! ```
//!
//! Plugin paths are relative to the configuration file. Their exports are
//! merged over the built-in system catalog.

use nako_core::plugin::{catalog_table, parse_export, system_export};
use nako_core::{AnalyzerConfig, DeclarationTable, NakoError};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub(crate) const CONFIG_FILE: &str = "nako.toml";

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    analyzer: AnalyzerConfig,
    catalog: CatalogSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct CatalogSection {
    plugins: Vec<PathBuf>,
}

/// Everything a command needs to analyse sources.
pub(crate) struct Settings {
    pub analyzer: AnalyzerConfig,
    pub catalog: DeclarationTable,
}

/// Read the explicit config file, or `./nako.toml` when it exists. A
/// `--problems-limit` flag wins over the file.
pub(crate) fn load(explicit: Option<&Path>, problems_limit: Option<usize>) -> Result<Settings, NakoError> {
    let path = explicit.map(Path::to_path_buf).or_else(|| {
        let default = PathBuf::from(CONFIG_FILE);
        default.is_file().then_some(default)
    });

    let (file, base) = match &path {
        Some(p) => {
            let base = p.parent().map(Path::to_path_buf).unwrap_or_default();
            (read_config(p)?, base)
        }
        None => (ConfigFile::default(), PathBuf::new()),
    };

    let mut analyzer = file.analyzer;
    if let Some(limit) = problems_limit {
        analyzer.problems_limit = limit;
    }

    let mut export = system_export();
    for plugin in &file.catalog.plugins {
        let plugin_path = base.join(plugin);
        let text = read(&plugin_path)?;
        export.extend(parse_export(&text)?);
    }
    tracing::debug!(config = ?path, plugins = file.catalog.plugins.len(), "settings loaded");

    Ok(Settings {
        analyzer,
        catalog: catalog_table(&export),
    })
}

fn read(path: &Path) -> Result<String, NakoError> {
    std::fs::read_to_string(path).map_err(|source| NakoError::Io {
        path: path.display().to_string(),
        source,
    })
}

fn read_config(path: &Path) -> Result<ConfigFile, NakoError> {
    let text = read(path)?;
    toml::from_str(&text).map_err(|e| NakoError::Config(format!("{}: {}", path.display(), e)))
}
