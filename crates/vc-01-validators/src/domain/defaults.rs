//! # Network Default Validator Sets
//!
//! The set a manager serves when it has no external source. Membership is an
//! injected value: node ids come from configuration, from the lists baked in
//! below for Flare, Songbird and Coston, or, for custom networks, from a JSON
//! file of `NodeID-<cb58>` strings. Any malformed entry fails construction.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use shared_types::{Validator, ValidatorId};

use super::set::ValidatorSet;
use crate::error::{ValidatorError, ValidatorResult};

/// Environment variable naming the custom validator file.
pub const VALIDATORS_FILE_ENV: &str = "VALIDATORS";

/// Flare starts with no baked-in validators.
const FLARE_NODE_IDS: &[&str] = &[];

const SONGBIRD_NODE_IDS: &[&str] = &[
    "NodeID-3M9KVT6ixi4gVMisbm5TnPXYXgFN5LHuv",
    "NodeID-NnX4fajAmyvpL9RLfheNdc47FKKDuQW8i",
    "NodeID-AzdF8JNU468uwZYGquHt7bhDrsggZpK67",
    "NodeID-FqeGcnLAXbDTthd382aP9uyu1i47paRRh",
    "NodeID-B9HuZ5hDkRodyRRsiMEHWgMmmMF7xSKbj",
    "NodeID-Jx3E1F7mfkseZmqnFgDUFV3eusMxVdT6Z",
    "NodeID-FnvWuwvJGezs4uaBLujkfeM8U3gmAUY3Z",
    "NodeID-LhVs6hzHjBcEkzA1Eu8Qxb9nEQAk1Qbgf",
    "NodeID-9SqDo3MxpvEDN4bE4rLTyM7HkkKAw4h96",
    "NodeID-4tStYRTi3KDxFmv1YHTZAQxbzeyMA7z52",
    "NodeID-8XnMh17zo6pB8Pa2zptRBi9TbbMZgij2t",
    "NodeID-Cn9P5wgg7d9RNLqm4dFLCUV2diCxpkj7f",
    "NodeID-PEDdah7g7Efiii1xw8ex2dH58oMfByzjb",
    "NodeID-QCt9AxMPt5nn445CQGoA3yktqkChnKmPY",
    "NodeID-9bWz6J61B8WbQtzeSyA1jsXosyVbuUJd1",
    "NodeID-DLMnewsEwtSH8Qk7p9RGzUVyZAaZVMKsk",
    "NodeID-7meEpyjmGbL577th58dm4nvvtVZiJusFp",
    "NodeID-JeYnnrUkuArAAe2Sjo47Z3X5yfeF7cw43",
    "NodeID-Fdwp9Wtjh5rxzuTCF9z4zrSM31y7ZzBQS",
    "NodeID-JdEBRLS98PansyFKQUzFKqk4xqrVZ41nC",
];

const COSTON_NODE_IDS: &[&str] = &[
    "NodeID-5dDZXn99LCkDoEi6t9gTitZuQmhokxQTc",
    "NodeID-EkH8wyEshzEQBToAdR7Fexxcj9rrmEEHZ",
    "NodeID-FPAwqHjs8Mw8Cuki5bkm3vSVisZr8t2Lu",
    "NodeID-AQghDJTU3zuQj73itPtfTZz6CxsTQVD3R",
    "NodeID-HaZ4HpanjndqSuN252chFsTysmdND5meA",
];

/// Known networks and their numeric ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NetworkId {
    Flare,
    Songbird,
    Coston,
    Testing,
    Local,
    Custom(u32),
}

impl NetworkId {
    pub const FLARE_ID: u32 = 1;
    pub const SONGBIRD_ID: u32 = 5;
    pub const COSTON_ID: u32 = 7;
    pub const TESTING_ID: u32 = 10;
    pub const LOCAL_ID: u32 = 12345;

    pub fn from_u32(id: u32) -> Self {
        match id {
            Self::FLARE_ID => Self::Flare,
            Self::SONGBIRD_ID => Self::Songbird,
            Self::COSTON_ID => Self::Coston,
            Self::TESTING_ID => Self::Testing,
            Self::LOCAL_ID => Self::Local,
            other => Self::Custom(other),
        }
    }

    pub fn as_u32(&self) -> u32 {
        match self {
            Self::Flare => Self::FLARE_ID,
            Self::Songbird => Self::SONGBIRD_ID,
            Self::Coston => Self::COSTON_ID,
            Self::Testing => Self::TESTING_ID,
            Self::Local => Self::LOCAL_ID,
            Self::Custom(id) => *id,
        }
    }

    /// Weight given to each default validator on this network.
    pub fn default_weight(&self) -> u64 {
        match self {
            Self::Flare | Self::Songbird => 50_000,
            _ => 200_000,
        }
    }

    /// Baked-in membership. `None` for networks that read a validator file.
    pub fn default_node_ids(&self) -> Option<&'static [&'static str]> {
        match self {
            Self::Flare => Some(FLARE_NODE_IDS),
            Self::Songbird => Some(SONGBIRD_NODE_IDS),
            Self::Coston => Some(COSTON_NODE_IDS),
            _ => None,
        }
    }

    /// Networks whose membership must be read from a validator file.
    pub fn is_custom(&self) -> bool {
        self.default_node_ids().is_none()
    }
}

/// Configuration for the default validator set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultValidatorsConfig {
    /// Numeric network id.
    pub network_id: u32,
    /// Per-validator weight. `None` uses the network default.
    pub weight: Option<u64>,
    /// Node ids in `NodeID-<cb58>` form. Empty uses the network's baked-in
    /// list, or the validator file on custom networks.
    pub node_ids: Vec<String>,
    /// JSON file holding an array of node ids. Read on custom networks when
    /// `node_ids` is empty.
    pub validators_file: Option<PathBuf>,
}

impl Default for DefaultValidatorsConfig {
    fn default() -> Self {
        Self {
            network_id: NetworkId::LOCAL_ID,
            weight: None,
            node_ids: Vec::new(),
            validators_file: None,
        }
    }
}

impl DefaultValidatorsConfig {
    /// Configuration for `network` with its baked-in node ids filled in.
    pub fn for_network(network: NetworkId) -> Self {
        Self {
            network_id: network.as_u32(),
            node_ids: network
                .default_node_ids()
                .unwrap_or_default()
                .iter()
                .map(|id| id.to_string())
                .collect(),
            ..Self::default()
        }
    }

    pub fn network(&self) -> NetworkId {
        NetworkId::from_u32(self.network_id)
    }

    /// Build the default set, failing on any malformed entry.
    pub fn build(&self) -> ValidatorResult<ValidatorSet> {
        let network = self.network();
        let weight = self.weight.unwrap_or_else(|| network.default_weight());
        if weight == 0 {
            return Err(ValidatorError::InvalidConfig {
                reason: "default validator weight must be non-zero".to_string(),
            });
        }

        let node_ids = if !self.node_ids.is_empty() {
            self.node_ids.clone()
        } else if let Some(baked) = network.default_node_ids() {
            baked.iter().map(|id| id.to_string()).collect()
        } else {
            match &self.validators_file {
                Some(path) => read_node_id_file(path)?,
                None => Vec::new(),
            }
        };

        let validators = node_ids
            .iter()
            .map(|raw| parse_node_id(raw).map(|id| Validator::new(id, weight)))
            .collect::<ValidatorResult<Vec<_>>>()?;

        let set = ValidatorSet::from_validators(&validators)?;
        tracing::info!(
            network = network.as_u32(),
            validators = set.len(),
            weight,
            "[vc-01] Default validator set loaded"
        );
        Ok(set)
    }
}

/// Parse a `NodeID-<cb58>` string.
pub fn parse_node_id(raw: &str) -> ValidatorResult<ValidatorId> {
    raw.trim()
        .parse()
        .map_err(|source| ValidatorError::InvalidNodeId {
            input: raw.to_string(),
            source,
        })
}

fn read_node_id_file(path: &Path) -> ValidatorResult<Vec<String>> {
    let data = std::fs::read_to_string(path).map_err(|e| ValidatorError::InvalidConfig {
        reason: format!("could not read validator file {}: {}", path.display(), e),
    })?;
    serde_json::from_str(&data).map_err(|e| ValidatorError::InvalidConfig {
        reason: format!("could not decode validator file {}: {}", path.display(), e),
    })
}
