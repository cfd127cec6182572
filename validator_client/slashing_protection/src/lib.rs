//! A slashing-protection engine for consensus validator signing keys.
//!
//! For any `(validator public key, candidate message)` pair this crate answers one question --
//! may this key sign that message -- and, when the answer is yes, durably records the artifact so
//! that the answer holds under any future request. Cryptographic signing, RPC front-ends, and key
//! management are deliberately external collaborators.
mod interchange;
mod signed_attestation;
mod signed_block;
mod signing_root;
mod slashing_database;

pub use crate::interchange::{
    Interchange, InterchangeAttestation, InterchangeBlock, InterchangeData, InterchangeError,
    InterchangeMetadata,
};
pub use crate::signed_attestation::{InvalidAttestation, SignedAttestation};
pub use crate::signed_block::{InvalidBlock, SignedBlock};
pub use crate::signing_root::SigningRoot;
pub use crate::slashing_database::{
    Config, ImportOutcome, SlashingDatabase, SUPPORTED_INTERCHANGE_FORMAT_VERSION,
};
pub use types::{Epoch, Hash256, PublicKeyBytes, Slot};

use std::io;

/// Every way a signing decision can fail to resolve.
///
/// `InvalidBlock`/`InvalidAttestation` and `InterchangeRejected` are ordinary *deny* outcomes --
/// they carry no side effect and are not bugs. `UnregisteredValidator`, `SQLError`,
/// `SQLPoolError` and `IOError` are the "fail closed and alert the operator" category: the
/// caller must treat them as deny *and* surface them, never silently convert them to a
/// permit.
#[derive(Debug, PartialEq)]
pub enum NotSafe {
    InvalidAttestation(InvalidAttestation),
    InvalidBlock(InvalidBlock),
    /// `register_validators` and a signing request raced for the same unknown key, or the key
    /// was never registered at all.
    UnregisteredValidator(PublicKeyBytes),
    /// An interchange import would violate a slashing invariant under the post-import
    /// watermarks; the affected validator's scope was rolled back.
    InterchangeRejected(String),
    IOError(io::ErrorKind),
    SQLError(String),
    SQLPoolError(String),
}

impl std::fmt::Display for NotSafe {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            NotSafe::InvalidAttestation(e) => write!(f, "invalid attestation: {}", e),
            NotSafe::InvalidBlock(e) => write!(f, "invalid block: {}", e),
            NotSafe::UnregisteredValidator(pk) => write!(f, "unregistered validator: {}", pk),
            NotSafe::InterchangeRejected(reason) => write!(f, "interchange rejected: {}", reason),
            NotSafe::IOError(kind) => write!(f, "IO error: {:?}", kind),
            NotSafe::SQLError(msg) => write!(f, "SQL error: {}", msg),
            NotSafe::SQLPoolError(msg) => write!(f, "connection pool error: {}", msg),
        }
    }
}

impl std::error::Error for NotSafe {}

impl From<InvalidBlock> for NotSafe {
    fn from(e: InvalidBlock) -> Self {
        NotSafe::InvalidBlock(e)
    }
}

impl From<InvalidAttestation> for NotSafe {
    fn from(e: InvalidAttestation) -> Self {
        NotSafe::InvalidAttestation(e)
    }
}

impl From<io::Error> for NotSafe {
    fn from(error: io::Error) -> NotSafe {
        NotSafe::IOError(error.kind())
    }
}

impl From<rusqlite::Error> for NotSafe {
    fn from(error: rusqlite::Error) -> NotSafe {
        NotSafe::SQLError(error.to_string())
    }
}

impl From<r2d2::Error> for NotSafe {
    fn from(error: r2d2::Error) -> Self {
        NotSafe::SQLPoolError(format!("{:?}", error))
    }
}

impl From<filesystem::Error> for NotSafe {
    fn from(error: filesystem::Error) -> Self {
        NotSafe::SQLPoolError(format!("failed to restrict database file permissions: {:?}", error))
    }
}

/// Why a signing decision was permitted, for callers that want to log more than a bare boolean.
#[derive(Debug, PartialEq, Eq)]
pub enum ValidityReason {
    /// History is empty for this coordinate, so signing is trivially safe.
    EmptyHistory,
    /// The candidate is byte-identical to a previously signed artifact; re-signing it is never
    /// slashable.
    SameData,
    /// The candidate is distinct from anything previously signed but passes every rule.
    Valid,
}

/// A successful signing decision, carrying the reason it was granted.
#[derive(Debug, PartialEq, Eq)]
pub struct Safe {
    pub reason: ValidityReason,
}
