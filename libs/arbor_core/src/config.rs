use std::path::Path;

use arbor_crypto::{errors::MerkleError, hashing::HashDomain, serialization::MerkleSerialize};
use serde::{Deserialize, Serialize};

/// Settings shared by every tree an engine builds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EngineConfig {
    /// Branching factor used by `create_tree_with_default_factor`.
    pub default_branching_factor: usize,
    /// Leaf/node hashing domain for built trees and accepted proofs.
    pub domain: HashDomain,
    /// Reject trees with more leaves than this.
    pub max_leaves: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            default_branching_factor: 2,
            domain: HashDomain::Plain,
            max_leaves: None,
        }
    }
}

impl MerkleSerialize for EngineConfig {}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), MerkleError> {
        if self.default_branching_factor < 2 {
            return Err(MerkleError::InvalidBranchingFactor(self.default_branching_factor));
        }
        if self.max_leaves == Some(0) {
            return Err(MerkleError::EmptyInput);
        }
        Ok(())
    }

    /// Load and validate a config previously written with `save`.
    pub fn from_file(path: &Path) -> Result<Self, MerkleError> {
        let config = Self::load(path)?;
        config.validate()?;
        tracing::info!("Loaded engine config from {}", path.display());
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("arbor_{name}_{}.bin", std::process::id()))
    }

    #[test]
    fn test_default_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_configs() {
        let config = EngineConfig { default_branching_factor: 1, ..Default::default() };
        assert!(matches!(config.validate(), Err(MerkleError::InvalidBranchingFactor(1))));

        let config = EngineConfig { max_leaves: Some(0), ..Default::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load() {
        let path = temp_path("config");
        let config = EngineConfig {
            default_branching_factor: 4,
            domain: HashDomain::Tagged,
            max_leaves: Some(1024),
        };
        config.save(&path).unwrap();
        let loaded = EngineConfig::from_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_rejects_invalid() {
        let path = temp_path("bad_config");
        EngineConfig { default_branching_factor: 0, ..Default::default() }.save(&path).unwrap();
        let result = EngineConfig::from_file(&path);
        std::fs::remove_file(&path).unwrap();
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_file() {
        let result = EngineConfig::from_file(&temp_path("does_not_exist"));
        assert!(matches!(result, Err(MerkleError::Io(_))));
    }
}
