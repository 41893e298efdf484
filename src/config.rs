//! Registry configuration
//!
//! Every field has a default, so an empty `{}` file (or no file at all) is a
//! valid configuration. Relative paths in a config file resolve against the
//! file's own directory.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::analyzer::AnalyzerConfig;
use crate::catalog::Catalog;
use crate::REGISTRY_VERSION;

pub const DEFAULT_BASE_URL: &str = "https://registry.example.com";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Registry version {0:?} is not a semantic version")]
    InvalidVersion(String),

    #[error("baseUrl must not be empty")]
    EmptyBaseUrl,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct RegistryConfig {
    pub base_url: String,
    pub version: String,
    pub components_dir: PathBuf,
    pub providers_dir: PathBuf,
    pub tokens_dir: PathBuf,
    pub templates_dir: PathBuf,
    pub output_dir: PathBuf,
    pub analyzer: AnalyzerConfig,
    pub catalog: Catalog,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            version: REGISTRY_VERSION.to_string(),
            components_dir: PathBuf::from("src/components"),
            providers_dir: PathBuf::from("src/providers"),
            tokens_dir: PathBuf::from("src/tokens"),
            templates_dir: PathBuf::from("templates"),
            output_dir: PathBuf::from("registry"),
            analyzer: AnalyzerConfig::default(),
            catalog: Catalog::default(),
        }
    }
}

impl RegistryConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: Self = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        if let Some(base) = path.parent() {
            config.rebase(base);
        }
        Ok(config)
    }

    /// All five directories laid out under one project root.
    pub fn for_project(root: &Path) -> Self {
        let mut config = Self::default();
        config.rebase(root);
        config
    }

    fn rebase(&mut self, base: &Path) {
        for dir in [
            &mut self.components_dir,
            &mut self.providers_dir,
            &mut self.tokens_dir,
            &mut self.templates_dir,
            &mut self.output_dir,
        ] {
            if dir.is_relative() {
                *dir = base.join(&*dir);
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_url.trim().is_empty() {
            return Err(ConfigError::EmptyBaseUrl);
        }
        semver::Version::parse(&self.version)
            .map_err(|_| ConfigError::InvalidVersion(self.version.clone()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_is_default() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("registry.config.json");
        fs::write(&path, "{}").unwrap();

        let config = RegistryConfig::load(&path).unwrap();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.components_dir, tmp.path().join("src/components"));
        assert_eq!(config.catalog, Catalog::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_absolute_paths_kept() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("c.json");
        fs::write(&path, r#"{"outputDir": "/srv/registry", "baseUrl": "https://cdn.test"}"#).unwrap();

        let config = RegistryConfig::load(&path).unwrap();
        assert_eq!(config.output_dir, PathBuf::from("/srv/registry"));
        assert_eq!(config.base_url, "https://cdn.test");
    }

    #[test]
    fn test_invalid_version_rejected() {
        let config = RegistryConfig {
            version: "one".to_string(),
            ..RegistryConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidVersion(_))));
    }

    #[test]
    fn test_parse_error_names_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("bad.json");
        fs::write(&path, "{").unwrap();
        let err = RegistryConfig::load(&path).unwrap_err();
        assert!(err.to_string().contains("bad.json"));
    }
}
