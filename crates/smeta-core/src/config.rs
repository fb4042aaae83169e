//! Engine configuration.
//!
//! Loaded from a TOML file; every section and key is optional. A missing,
//! unreadable or invalid file never fails the caller: defaults are used and a
//! warning is returned instead.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use smeta_engine::engine::{Classifier, Pricing};
use std::path::{Path, PathBuf};
use std::time::Duration;

const MAX_CONFIG_FILE_BYTES: u64 = 65_536;

/// Recalculation scheduling.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecalcConfig {
    /// Quiet period before staged edits are applied.
    pub debounce_ms: u64,
}

impl Default for RecalcConfig {
    fn default() -> Self {
        RecalcConfig { debounce_ms: 30 }
    }
}

/// Footer construction for documents that lack one.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FooterConfig {
    pub label: String,
}

impl Default for FooterConfig {
    fn default() -> Self {
        FooterConfig {
            label: "ИТОГО".to_string(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub pricing: Pricing,
    pub classify: Classifier,
    pub recalc: RecalcConfig,
    pub footer: FooterConfig,
}

impl EngineConfig {
    pub fn from_toml_str(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.recalc.debounce_ms)
    }
}

/// Per-user config file location (`<config dir>/smeta/config.toml`).
pub fn user_config_path() -> Option<PathBuf> {
    let proj = ProjectDirs::from("ru", "smeta", "smeta")?;
    Some(proj.config_dir().join("config.toml"))
}

/// Load configuration from `explicit` or the per-user config file.
///
/// Returns the configuration and any warnings produced while loading it.
pub fn load_config(explicit: Option<&Path>) -> (EngineConfig, Vec<String>) {
    let mut warnings = Vec::new();
    let path = explicit.map(Path::to_path_buf).or_else(user_config_path);
    let Some(path) = path else {
        return (EngineConfig::default(), warnings);
    };

    if !path.exists() {
        if explicit.is_some() {
            warnings.push(format!("Config file not found: {}", path.display()));
        }
        return (EngineConfig::default(), warnings);
    }

    let config = match std::fs::metadata(&path) {
        Ok(meta) if meta.len() > MAX_CONFIG_FILE_BYTES => {
            warnings.push(format!(
                "Refusing to read {}: file too large ({} bytes, max {})",
                path.display(),
                meta.len(),
                MAX_CONFIG_FILE_BYTES
            ));
            None
        }
        Ok(_) => match std::fs::read_to_string(&path) {
            Ok(content) => match EngineConfig::from_toml_str(&content) {
                Ok(parsed) => Some(parsed),
                Err(err) => {
                    warnings.push(format!("Failed to parse {}: {}", path.display(), err));
                    None
                }
            },
            Err(err) => {
                warnings.push(format!("Failed to read {}: {}", path.display(), err));
                None
            }
        },
        Err(err) => {
            warnings.push(format!(
                "Failed to read metadata for {}: {}",
                path.display(),
                err
            ));
            None
        }
    };

    for warning in &warnings {
        tracing::warn!("{warning}");
    }
    (config.unwrap_or_default(), warnings)
}
