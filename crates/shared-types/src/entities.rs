//! # Core Identifiers
//!
//! ## Clusters
//!
//! - **Participants**: `ValidatorId`, `Validator`
//! - **Reference Points**: `BlockId`
//! - **Chains**: `ChainId`

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::errors::IdError;

/// Prefix used by the textual form of a validator id.
pub const NODE_ID_PREFIX: &str = "NodeID-";

/// Width of a validator id in bytes.
pub const VALIDATOR_ID_LEN: usize = 20;

/// Width of block and chain ids in bytes.
pub const HASH_ID_LEN: usize = 32;

/// Trailing SHA-256 bytes appended by the CB58 encoding.
const CHECKSUM_LEN: usize = 4;

fn checksum(payload: &[u8]) -> [u8; CHECKSUM_LEN] {
    let digest = Sha256::digest(payload);
    let mut out = [0u8; CHECKSUM_LEN];
    out.copy_from_slice(&digest[digest.len() - CHECKSUM_LEN..]);
    out
}

/// CB58: base58 of the payload followed by the last four bytes of its
/// SHA-256 digest.
fn encode_cb58(payload: &[u8]) -> String {
    let mut bytes = Vec::with_capacity(payload.len() + CHECKSUM_LEN);
    bytes.extend_from_slice(payload);
    bytes.extend_from_slice(&checksum(payload));
    bs58::encode(bytes).into_string()
}

fn decode_cb58(text: &str) -> Result<Vec<u8>, IdError> {
    let mut bytes = bs58::decode(text)
        .into_vec()
        .map_err(|e| IdError::InvalidBase58(e.to_string()))?;
    if bytes.len() < CHECKSUM_LEN {
        return Err(IdError::MissingChecksum);
    }
    let payload_len = bytes.len() - CHECKSUM_LEN;
    if bytes[payload_len..] != checksum(&bytes[..payload_len]) {
        return Err(IdError::BadChecksum);
    }
    bytes.truncate(payload_len);
    Ok(bytes)
}

fn fixed<const N: usize>(bytes: Vec<u8>) -> Result<[u8; N], IdError> {
    let actual = bytes.len();
    bytes.try_into().map_err(|_| IdError::InvalidLength {
        expected: N,
        actual,
    })
}

fn decode_hex<const N: usize>(payload: &str) -> Result<[u8; N], IdError> {
    fixed(hex::decode(payload).map_err(|e| IdError::InvalidHex(e.to_string()))?)
}

/// Implements serde as the `Display`/`FromStr` string form.
macro_rules! serde_via_string {
    ($ty:ty) => {
        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

// =============================================================================
// CLUSTER A: PARTICIPANTS
// =============================================================================

/// Identifier of a staking participant. Its text form is `NodeID-<cb58>`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ValidatorId(pub [u8; VALIDATOR_ID_LEN]);

impl ValidatorId {
    /// Wrap raw id bytes.
    pub const fn new(bytes: [u8; VALIDATOR_ID_LEN]) -> Self {
        Self(bytes)
    }

    /// Raw id bytes.
    pub fn as_bytes(&self) -> &[u8; VALIDATOR_ID_LEN] {
        &self.0
    }
}

impl fmt::Display for ValidatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", NODE_ID_PREFIX, encode_cb58(&self.0))
    }
}

impl fmt::Debug for ValidatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl FromStr for ValidatorId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let payload = s
            .strip_prefix(NODE_ID_PREFIX)
            .ok_or_else(|| IdError::MissingPrefix {
                expected: NODE_ID_PREFIX,
                input: s.to_string(),
            })?;
        decode_cb58(payload).and_then(fixed).map(Self)
    }
}

serde_via_string!(ValidatorId);

/// A validator and its stake weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Validator {
    /// Validator identity.
    pub id: ValidatorId,
    /// Stake weight. Zero is equivalent to absence.
    pub weight: u64,
}

impl Validator {
    pub fn new(id: ValidatorId, weight: u64) -> Self {
        Self { id, weight }
    }
}

// =============================================================================
// CLUSTER B: REFERENCE POINTS AND CHAINS
// =============================================================================

/// Identifier of an accepted block. Used as the reference point a validator
/// set is loaded at.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct BlockId(pub [u8; HASH_ID_LEN]);

/// Identifier of a chain that consumes benchlist notifications.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ChainId(pub [u8; HASH_ID_LEN]);

macro_rules! hash_id {
    ($ty:ident) => {
        impl $ty {
            pub const fn new(bytes: [u8; HASH_ID_LEN]) -> Self {
                Self(bytes)
            }

            pub fn as_bytes(&self) -> &[u8; HASH_ID_LEN] {
                &self.0
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&hex::encode(self.0))
            }
        }

        impl fmt::Debug for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($ty), self)
            }
        }

        impl FromStr for $ty {
            type Err = IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                decode_hex(s.trim_start_matches("0x")).map(Self)
            }
        }

        serde_via_string!($ty);
    };
}

hash_id!(BlockId);
hash_id!(ChainId);
