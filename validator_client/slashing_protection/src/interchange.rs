//! EIP-3076 interchange document types.
use crate::signing_root::SigningRoot;
use serde::{Deserialize, Serialize};
use types::{Epoch, Hash256, PublicKeyBytes, Slot};

/// Format version this crate reads and writes. EIP-3076 fixes this at `"5"`.
pub const SUPPORTED_INTERCHANGE_FORMAT_VERSION: &str = "5";

#[derive(Debug, Clone, PartialEq)]
pub enum InterchangeError {
    /// `metadata.interchange_format_version` was not `SUPPORTED_INTERCHANGE_FORMAT_VERSION`.
    UnsupportedVersion(String),
    /// `metadata.genesis_validators_root` did not match the engine's configured root.
    GenesisValidatorsRootMismatch { expected: Hash256, found: Hash256 },
}

impl std::fmt::Display for InterchangeError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            InterchangeError::UnsupportedVersion(v) => {
                write!(f, "unsupported interchange_format_version: {}", v)
            }
            InterchangeError::GenesisValidatorsRootMismatch { expected, found } => write!(
                f,
                "genesis_validators_root mismatch: expected {:?}, found {:?}",
                expected, found
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "arbitrary-fuzz", derive(arbitrary::Arbitrary))]
pub struct InterchangeMetadata {
    pub interchange_format_version: String,
    pub genesis_validators_root: Hash256,
}

impl InterchangeMetadata {
    pub fn new(genesis_validators_root: Hash256) -> Self {
        InterchangeMetadata {
            interchange_format_version: SUPPORTED_INTERCHANGE_FORMAT_VERSION.to_string(),
            genesis_validators_root,
        }
    }

    pub fn check_version(&self) -> Result<(), InterchangeError> {
        if self.interchange_format_version == SUPPORTED_INTERCHANGE_FORMAT_VERSION {
            Ok(())
        } else {
            Err(InterchangeError::UnsupportedVersion(
                self.interchange_format_version.clone(),
            ))
        }
    }

    pub fn check_genesis_validators_root(
        &self,
        expected: Hash256,
    ) -> Result<(), InterchangeError> {
        if self.genesis_validators_root == expected {
            Ok(())
        } else {
            Err(InterchangeError::GenesisValidatorsRootMismatch {
                expected,
                found: self.genesis_validators_root,
            })
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "arbitrary-fuzz", derive(arbitrary::Arbitrary))]
pub struct InterchangeBlock {
    pub slot: Slot,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signing_root: Option<Hash256>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "arbitrary-fuzz", derive(arbitrary::Arbitrary))]
pub struct InterchangeAttestation {
    pub source_epoch: Epoch,
    pub target_epoch: Epoch,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signing_root: Option<Hash256>,
}

impl InterchangeBlock {
    pub fn signing_root(&self) -> SigningRoot {
        SigningRoot::from(self.signing_root)
    }
}

impl InterchangeAttestation {
    pub fn signing_root(&self) -> SigningRoot {
        SigningRoot::from(self.signing_root)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "arbitrary-fuzz", derive(arbitrary::Arbitrary))]
pub struct InterchangeData {
    pub pubkey: PublicKeyBytes,
    #[serde(default)]
    pub signed_blocks: Vec<InterchangeBlock>,
    #[serde(default)]
    pub signed_attestations: Vec<InterchangeAttestation>,
}

/// A full EIP-3076 interchange document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "arbitrary-fuzz", derive(arbitrary::Arbitrary))]
pub struct Interchange {
    pub metadata: InterchangeMetadata,
    pub data: Vec<InterchangeData>,
}

impl Interchange {
    pub fn from_json_str(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Remove empty `signed_blocks`/`signed_attestations` for validators with no history, and
    /// drop fields that the format considers optional. Used by the fuzz harness to check that
    /// minification doesn't change import semantics.
    pub fn minify(&self) -> Result<Self, serde_json::Error> {
        let data = self
            .data
            .iter()
            .cloned()
            .filter(|entry| !entry.signed_blocks.is_empty() || !entry.signed_attestations.is_empty())
            .collect();
        Ok(Interchange {
            metadata: self.metadata.clone(),
            data,
        })
    }
}
