//! Node configuration
//!
//! The vote set a node runs with: loaded from a JSON file, or the built-in
//! charger demo when none is given.

use crate::error::NodeError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;
use vote_core::{CallbackResult, Policy, Registry, VoteConfig};

/// Complete node configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    pub votes: Vec<VoteConfig<i64>>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            votes: vec![
                VoteConfig::new("chg_current", Policy::Min, 2000)
                    .voter("thermal")
                    .voter("usb")
                    .voter("jeita"),
                VoteConfig::new("usb_icl", Policy::Max, 500)
                    .voter("apsd")
                    .voter("pd")
                    .voter_with_priority("user", 10),
                VoteConfig::new("otg_enable", Policy::EnableOnly, 0)
                    .voter("typec")
                    .voter("user"),
            ],
        }
    }
}

impl NodeConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> Result<Self, NodeError> {
        let data = std::fs::read_to_string(path)?;
        let config = Self::from_json(&data)?;
        info!(
            "Config: loaded {} votes from {}",
            config.votes.len(),
            path.display()
        );
        Ok(config)
    }

    pub fn from_json(data: &str) -> Result<Self, NodeError> {
        Ok(serde_json::from_str(data)?)
    }

    /// Create every configured vote in `registry`.
    ///
    /// Each vote's consumer stands in for the hardware and logs the value it
    /// would apply.
    pub fn build(&self, registry: &Registry<i64>) -> Result<(), NodeError> {
        for vote in &self.votes {
            let name = vote.name.clone();
            vote.create(registry, move |value: &i64| -> CallbackResult {
                info!("{}: apply {}", name, value);
                Ok(())
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use vote_core::VoteError;

    #[test]
    fn test_default_config_builds() {
        let registry = Registry::new();
        NodeConfig::default().build(&registry).unwrap();
        assert_eq!(registry.names(), vec!["chg_current", "usb_icl", "otg_enable"]);
        assert_eq!(
            registry.find("usb_icl").unwrap().get_priority(2usize),
            10
        );
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"votes": [{{"name": "fv", "policy": "min", "voters": ["jeita", "step"], "initial": 4400}}]}}"#
        )
        .unwrap();

        let config = NodeConfig::load(file.path()).unwrap();
        assert_eq!(config.votes.len(), 1);
        assert_eq!(config.votes[0].initial, 4400);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = NodeConfig::load(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, NodeError::Io(_)));
    }

    #[test]
    fn test_bad_json_rejected() {
        let err = NodeConfig::from_json(r#"{"votes": [{"name": 1}]}"#).unwrap_err();
        assert!(matches!(err, NodeError::Json(_)));
    }

    #[test]
    fn test_duplicate_vote_rejected() {
        let registry = Registry::new();
        let mut config = NodeConfig::default();
        config.votes.push(config.votes[0].clone());

        let err = config.build(&registry).unwrap_err();
        assert!(matches!(err, NodeError::Vote(VoteError::DuplicateName(_))));
    }
}
