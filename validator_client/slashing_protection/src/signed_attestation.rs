use crate::signing_root::SigningRoot;
use serde::{Deserialize, Serialize};
use types::Epoch;

/// An attestation signature previously granted to a validator, as recorded in the
/// `signed_attestations` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedAttestation {
    pub validator_id: i64,
    pub source_epoch: Epoch,
    pub target_epoch: Epoch,
    pub signing_root: SigningRoot,
}

/// The reason a candidate attestation was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidAttestation {
    /// `source_epoch > target_epoch`; malformed, never reaches the store.
    SourceGreaterThanTarget { source: Epoch, target: Epoch },
    /// The candidate source epoch is below the validator's source watermark.
    SourceViolatesWatermark { source: Epoch, min_source: Epoch },
    /// The candidate target epoch is at or below the validator's target watermark.
    TargetViolatesWatermark { target: Epoch, min_target: Epoch },
    /// An attestation already exists for this target epoch with a different (or unknown)
    /// signing root.
    DoubleVote { existing: SignedAttestation },
    /// A previously signed attestation surrounds the candidate.
    PrevSurroundsNew { prev: SignedAttestation },
    /// The candidate surrounds a previously signed attestation.
    NewSurroundsPrev { prev: SignedAttestation },
}

impl std::fmt::Display for InvalidAttestation {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            InvalidAttestation::SourceGreaterThanTarget { source, target } => {
                write!(f, "source epoch {} is greater than target epoch {}", source, target)
            }
            InvalidAttestation::SourceViolatesWatermark { source, min_source } => write!(
                f,
                "source epoch {} is below the low watermark {}",
                source, min_source
            ),
            InvalidAttestation::TargetViolatesWatermark { target, min_target } => write!(
                f,
                "target epoch {} is at or below the low watermark {}",
                target, min_target
            ),
            InvalidAttestation::DoubleVote { existing } => write!(
                f,
                "target epoch {} already has an attestation with a conflicting signing root",
                existing.target_epoch
            ),
            InvalidAttestation::PrevSurroundsNew { prev } => write!(
                f,
                "candidate is surrounded by previously signed attestation ({}, {})",
                prev.source_epoch, prev.target_epoch
            ),
            InvalidAttestation::NewSurroundsPrev { prev } => write!(
                f,
                "candidate surrounds previously signed attestation ({}, {})",
                prev.source_epoch, prev.target_epoch
            ),
        }
    }
}

/// Evaluate the attestation rule against a single existing record plus
/// pre-fetched surround witnesses.
///
/// As with `check_block_proposal`, the caller fetches `existing_attestation` (record at
/// `(validator_id, target)`), `surrounding` (any stored record with `s_i < source && t_i >
/// target`), `surrounded` (any stored record with `s_i > source && t_i < target`), and the two
/// watermarks from the history store within the ambient transaction.
#[allow(clippy::too_many_arguments)]
pub fn check_attestation(
    source: Epoch,
    target: Epoch,
    signing_root: SigningRoot,
    min_source: Option<Epoch>,
    min_target: Option<Epoch>,
    existing_attestation: Option<SignedAttestation>,
    surrounding: Option<SignedAttestation>,
    surrounded: Option<SignedAttestation>,
) -> Result<(), InvalidAttestation> {
    if source > target {
        return Err(InvalidAttestation::SourceGreaterThanTarget { source, target });
    }

    if let Some(min_source) = min_source {
        if source < min_source {
            return Err(InvalidAttestation::SourceViolatesWatermark { source, min_source });
        }
    }

    if let Some(min_target) = min_target {
        if target <= min_target {
            return Err(InvalidAttestation::TargetViolatesWatermark { target, min_target });
        }
    }

    if let Some(existing) = existing_attestation {
        return if existing.signing_root.matches(&signing_root) {
            Ok(())
        } else {
            Err(InvalidAttestation::DoubleVote { existing })
        };
    }

    if let Some(prev) = surrounding {
        return Err(InvalidAttestation::PrevSurroundsNew { prev });
    }

    if let Some(prev) = surrounded {
        return Err(InvalidAttestation::NewSurroundsPrev { prev });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::Hash256;

    fn root(byte: u8) -> SigningRoot {
        SigningRoot::from(Hash256::repeat_byte(byte))
    }

    fn att(source: u64, target: u64, byte: u8) -> SignedAttestation {
        SignedAttestation {
            validator_id: 1,
            source_epoch: Epoch::new(source),
            target_epoch: Epoch::new(target),
            signing_root: root(byte),
        }
    }

    #[test]
    fn malformed_never_touches_store() {
        let result = check_attestation(
            Epoch::new(11),
            Epoch::new(10),
            root(1),
            None,
            None,
            None,
            None,
            None,
        );
        assert_eq!(
            result,
            Err(InvalidAttestation::SourceGreaterThanTarget {
                source: Epoch::new(11),
                target: Epoch::new(10)
            })
        );
    }

    #[test]
    fn source_equal_target_permitted() {
        assert!(check_attestation(
            Epoch::new(5),
            Epoch::new(5),
            root(1),
            None,
            None,
            None,
            None,
            None
        )
        .is_ok());
    }

    #[test]
    fn scenario_surround_and_surrounded() {
        // Surround-vote boundary: an existing (10, 20) attestation.
        let existing = att(10, 20, 3);

        // Candidate (9, 19) is surrounded by the existing (10, 20) vote: deny.
        assert!(check_attestation(
            Epoch::new(9),
            Epoch::new(19),
            root(3),
            None,
            None,
            None,
            Some(existing),
            None
        )
        .is_err());

        // Candidate (11, 21) neither surrounds nor is surrounded by (10, 20): permit.
        assert!(check_attestation(
            Epoch::new(11),
            Epoch::new(21),
            root(3),
            None,
            None,
            None,
            None,
            None
        )
        .is_ok());
    }

    #[test]
    fn null_root_at_target_always_denies() {
        let existing = SignedAttestation {
            validator_id: 1,
            source_epoch: Epoch::new(10),
            target_epoch: Epoch::new(20),
            signing_root: SigningRoot(None),
        };
        assert!(check_attestation(
            Epoch::new(1),
            Epoch::new(20),
            root(9),
            None,
            None,
            Some(existing),
            None,
            None
        )
        .is_err());
    }

    #[test]
    fn source_watermark_boundary() {
        assert!(check_attestation(
            Epoch::new(4),
            Epoch::new(10),
            root(1),
            Some(Epoch::new(5)),
            None,
            None,
            None,
            None
        )
        .is_err());
        assert!(check_attestation(
            Epoch::new(5),
            Epoch::new(10),
            root(1),
            Some(Epoch::new(5)),
            None,
            None,
            None,
            None
        )
        .is_ok());
    }

    #[test]
    fn target_watermark_boundary_is_strict() {
        assert!(check_attestation(
            Epoch::new(1),
            Epoch::new(20),
            root(1),
            None,
            Some(Epoch::new(20)),
            None,
            None,
            None
        )
        .is_err());
        assert!(check_attestation(
            Epoch::new(1),
            Epoch::new(21),
            root(1),
            None,
            Some(Epoch::new(20)),
            None,
            None,
            None
        )
        .is_ok());
    }
}
