//! Tree shadow options with TOML preset support.
//!
//! Options serialize to/from TOML so hosts can keep per-scene presets next to
//! their terrain assets. The JSON schema drives host-side settings panels.

mod tree_shadows;

use std::path::Path;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
pub use tree_shadows::{CompositeTarget, TreeShadowOptions};

use crate::error::TreeShadowError;

/// Top-level options container. Sub-structs use `#[serde(default)]` so
/// partial TOML files work.
#[derive(
    Debug, Clone, Serialize, Deserialize, PartialEq, Default, JsonSchema,
)]
#[serde(default)]
pub struct Options {
    /// Tree shadow parameters.
    pub tree_shadows: TreeShadowOptions,
}

impl Options {
    /// Generate JSON Schema describing the UI-exposed options.
    #[must_use]
    pub fn json_schema() -> schemars::Schema {
        schemars::schema_for!(Options)
    }

    /// Load options from a TOML file. Missing fields use defaults.
    ///
    /// # Errors
    ///
    /// Returns [`TreeShadowError::Io`] if the file cannot be read and
    /// [`TreeShadowError::OptionsParse`] if it is not valid TOML.
    pub fn load(path: &Path) -> Result<Self, TreeShadowError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse options from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`TreeShadowError::OptionsParse`] on malformed TOML.
    pub fn from_toml(content: &str) -> Result<Self, TreeShadowError> {
        toml::from_str(content)
            .map_err(|e| TreeShadowError::OptionsParse(e.to_string()))
    }

    /// Save options to a TOML file (pretty-printed).
    ///
    /// # Errors
    ///
    /// Returns [`TreeShadowError::OptionsParse`] if serialization fails and
    /// [`TreeShadowError::Io`] if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), TreeShadowError> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| TreeShadowError::OptionsParse(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// List available preset names (TOML file stems) in a directory.
    #[must_use]
    pub fn list_presets(dir: &Path) -> Vec<String> {
        let mut names = Vec::new();
        if let Ok(entries) = std::fs::read_dir(dir) {
            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().is_some_and(|ext| ext == "toml") {
                    if let Some(stem) =
                        path.file_stem().and_then(|s| s.to_str())
                    {
                        names.push(stem.to_owned());
                    }
                }
            }
        }
        names.sort();
        names
    }
}
