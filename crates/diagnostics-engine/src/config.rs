use crate::errors::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const DEFAULT_METADATA_FILE_NAME: &str = "metadata.json";
pub const DEFAULT_AGGREGATE_CONCURRENCY: usize = 8;

/// Settings the engine consumes.
///
/// `output_folder` must already have any variable substitution applied. A missing
/// key in a TOML file falls back to its default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckerConfig {
    pub output_folder: Option<PathBuf>,
    pub metadata_file_name: String,
    pub enabled: bool,
    /// Reports parsed at once during an aggregate rebuild
    pub aggregate_concurrency: usize,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            output_folder: None,
            metadata_file_name: DEFAULT_METADATA_FILE_NAME.to_string(),
            enabled: true,
            aggregate_concurrency: DEFAULT_AGGREGATE_CONCURRENCY,
        }
    }
}

impl CheckerConfig {
    pub fn load(path: &Path) -> Result<Self> {
        debug!("Loading checker configuration from {}", path.display());
        let content = std::fs::read_to_string(path).map_err(|source| EngineError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn with_output_folder(mut self, output_folder: impl Into<PathBuf>) -> Self {
        self.output_folder = Some(output_folder.into());
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Where the metadata file is expected, or `None` when the checker cannot run.
    pub fn metadata_path(&self) -> Option<PathBuf> {
        if !self.enabled {
            return None;
        }
        match &self.output_folder {
            Some(folder) => Some(folder.join(&self.metadata_file_name)),
            None => {
                warn!("Checker is enabled but no output folder is configured");
                None
            }
        }
    }

    /// Fails when the configuration cannot produce any data
    pub fn validate(&self) -> Result<()> {
        if !self.enabled {
            return Err(EngineError::Disabled);
        }
        if self.output_folder.is_none() {
            return Err(EngineError::NoOutputFolder);
        }
        Ok(())
    }

    pub fn aggregate_concurrency(&self) -> usize {
        self.aggregate_concurrency.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    #[test]
    fn test_defaults_fill_missing_keys() {
        let config = CheckerConfig::from_toml_str("output_folder = \"/work/codechecker\"").unwrap();

        assert_eq!(config.output_folder, Some(PathBuf::from("/work/codechecker")));
        assert_eq!(config.metadata_file_name, "metadata.json");
        assert!(config.enabled);
        assert_eq!(config.aggregate_concurrency, 8);
        assert_eq!(
            config.metadata_path(),
            Some(PathBuf::from("/work/codechecker/metadata.json"))
        );
    }

    #[test]
    fn test_disabled_has_no_metadata_path() {
        let config = CheckerConfig::default()
            .with_output_folder("/work/codechecker")
            .with_enabled(false);
        assert_eq!(config.metadata_path(), None);
    }

    #[traced_test]
    #[test]
    fn test_enabled_without_folder_warns() {
        assert_eq!(CheckerConfig::default().metadata_path(), None);
        assert!(logs_contain("no output folder is configured"));
    }

    #[test]
    fn test_validate() {
        assert!(matches!(
            CheckerConfig::default().validate(),
            Err(EngineError::NoOutputFolder)
        ));
        assert!(matches!(
            CheckerConfig::default()
                .with_output_folder("/work/codechecker")
                .with_enabled(false)
                .validate(),
            Err(EngineError::Disabled)
        ));
        assert!(
            CheckerConfig::default()
                .with_output_folder("/work/codechecker")
                .validate()
                .is_ok()
        );
    }

    #[test]
    fn test_zero_concurrency_is_clamped() {
        let config = CheckerConfig::from_toml_str("aggregate_concurrency = 0").unwrap();
        assert_eq!(config.aggregate_concurrency(), 1);
    }

    #[test]
    fn test_rejects_malformed_toml() {
        let err = CheckerConfig::from_toml_str("enabled = \"maybe\"").unwrap_err();
        assert!(matches!(err, EngineError::ConfigParse(_)));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("cclens.toml");
        std::fs::write(&path, "enabled = false\nmetadata_file_name = \"run.json\"\n").unwrap();

        let config = CheckerConfig::load(&path).unwrap();
        assert!(!config.enabled);
        assert_eq!(config.metadata_file_name, "run.json");

        let missing = CheckerConfig::load(&dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(missing, EngineError::ConfigRead { .. }));
    }
}
