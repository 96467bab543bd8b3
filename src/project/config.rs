// src/project/config.rs
//
// Project manifest (`sable.toml`) and the build variants a project is
// compiled for.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

/// One of the two builds produced from a source tree. Each corresponds to
/// the macro the external preprocessor defines before the analyzer sees
/// the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildVariant {
    Server,
    Client,
}

impl BuildVariant {
    pub const ALL: [BuildVariant; 2] = [BuildVariant::Server, BuildVariant::Client];

    pub fn macro_name(self) -> &'static str {
        match self {
            BuildVariant::Server => "SERVER",
            BuildVariant::Client => "CLIENT",
        }
    }
}

impl fmt::Display for BuildVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildVariant::Server => write!(f, "server"),
            BuildVariant::Client => write!(f, "client"),
        }
    }
}

/// Contents of `sable.toml`. Missing keys take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    pub name: String,
    pub version: String,
    /// Library project: the entry point is `src/lib.sbl`
    pub lib: bool,
    /// Compiling the standard library itself: only builtins are layered
    /// under each file
    pub std: bool,
    /// Overrides the default entry file
    pub entry: Option<String>,
    /// Standard library file analyzed once and shared by both passes
    pub stdlib_entry: Option<String>,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            name: "app".to_string(),
            version: "0.1.0".to_string(),
            lib: false,
            std: false,
            entry: None,
            stdlib_entry: None,
        }
    }
}

impl ProjectConfig {
    pub const FILE_NAME: &'static str = "sable.toml";

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml(&text)?;
        tracing::debug!(name = %config.name, path = %path.display(), "manifest loaded");
        Ok(config)
    }

    pub fn entry_file(&self) -> &str {
        match &self.entry {
            Some(entry) => entry,
            None if self.lib => "src/lib.sbl",
            None => "src/main.sbl",
        }
    }

    /// The stdlib layered under every file, unless this project is the
    /// stdlib.
    pub fn stdlib(&self) -> Option<&str> {
        if self.std {
            return None;
        }
        self.stdlib_entry.as_deref()
    }

    pub fn variants(&self) -> [BuildVariant; 2] {
        BuildVariant::ALL
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_keys() {
        let config = ProjectConfig::from_toml("name = \"game\"").unwrap();
        assert_eq!(config.name, "game");
        assert_eq!(config.version, "0.1.0");
        assert_eq!(config.entry_file(), "src/main.sbl");
        assert!(config.stdlib().is_none());
    }

    #[test]
    fn lib_flag_selects_lib_entry() {
        let config = ProjectConfig::from_toml("lib = true").unwrap();
        assert_eq!(config.entry_file(), "src/lib.sbl");
    }

    #[test]
    fn explicit_entry_wins() {
        let config = ProjectConfig::from_toml("lib = true\nentry = \"boot.sbl\"").unwrap();
        assert_eq!(config.entry_file(), "boot.sbl");
    }

    #[test]
    fn std_project_skips_stdlib() {
        let config = ProjectConfig::from_toml("std = true\nstdlib_entry = \"std/prelude.sbl\"").unwrap();
        assert!(config.stdlib().is_none());
        let config = ProjectConfig::from_toml("stdlib_entry = \"std/prelude.sbl\"").unwrap();
        assert_eq!(config.stdlib(), Some("std/prelude.sbl"));
    }

    #[test]
    fn malformed_manifest_is_rejected() {
        let result = ProjectConfig::from_toml("name = 3");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn variants_cover_both_builds() {
        let names: Vec<_> = ProjectConfig::default()
            .variants()
            .iter()
            .map(|v| v.macro_name())
            .collect();
        assert_eq!(names, vec!["SERVER", "CLIENT"]);
    }
}
