use crate::signing_root::SigningRoot;
use serde::{Deserialize, Serialize};
use types::Slot;

/// A block signature previously granted to a validator, as recorded in the `signed_blocks`
/// table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedBlock {
    pub validator_id: i64,
    pub slot: Slot,
    pub signing_root: SigningRoot,
}

/// The reason a candidate block proposal was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidBlock {
    /// The candidate slot is at or below the validator's block watermark.
    SlotViolatesWatermark { slot: Slot, min_slot: Slot },
    /// A block already exists at this slot with a different (or unknown) signing root.
    DoubleBlockProposal { existing: SignedBlock },
}

impl std::fmt::Display for InvalidBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            InvalidBlock::SlotViolatesWatermark { slot, min_slot } => write!(
                f,
                "slot {} is at or below the low watermark {}",
                slot, min_slot
            ),
            InvalidBlock::DoubleBlockProposal { existing } => write!(
                f,
                "slot {} already has a signed block with a conflicting signing root",
                existing.slot
            ),
        }
    }
}

/// Evaluate the block-proposal rule against a single existing record.
///
/// The caller is responsible for fetching `existing_block` (the record at `(validator_id, slot)`,
/// if any) and `min_slot` (the validator's `min_block_slot` watermark, if any) from the history
/// store within the ambient transaction; this function is a pure predicate over that snapshot.
pub fn check_block_proposal(
    slot: Slot,
    signing_root: SigningRoot,
    min_slot: Option<Slot>,
    existing_block: Option<SignedBlock>,
) -> Result<(), InvalidBlock> {
    if let Some(min_slot) = min_slot {
        if slot <= min_slot {
            return Err(InvalidBlock::SlotViolatesWatermark { slot, min_slot });
        }
    }

    match existing_block {
        None => Ok(()),
        Some(existing) if existing.signing_root.matches(&signing_root) => Ok(()),
        Some(existing) => Err(InvalidBlock::DoubleBlockProposal { existing }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::Hash256;

    fn root(byte: u8) -> SigningRoot {
        SigningRoot::from(Hash256::repeat_byte(byte))
    }

    #[test]
    fn empty_history_permits() {
        assert!(check_block_proposal(Slot::new(2), root(3), None, None).is_ok());
    }

    #[test]
    fn same_data_is_idempotent() {
        let existing = SignedBlock {
            validator_id: 1,
            slot: Slot::new(2),
            signing_root: root(3),
        };
        assert!(check_block_proposal(Slot::new(2), root(3), None, Some(existing)).is_ok());
    }

    #[test]
    fn conflicting_root_denied() {
        let existing = SignedBlock {
            validator_id: 1,
            slot: Slot::new(2),
            signing_root: root(3),
        };
        assert!(check_block_proposal(Slot::new(2), root(4), None, Some(existing)).is_err());
    }

    #[test]
    fn null_existing_root_always_denies() {
        let existing = SignedBlock {
            validator_id: 1,
            slot: Slot::new(2),
            signing_root: SigningRoot(None),
        };
        assert!(check_block_proposal(Slot::new(2), root(3), None, Some(existing)).is_err());
    }

    #[test]
    fn watermark_equal_to_slot_denies() {
        assert!(check_block_proposal(Slot::new(5), root(1), Some(Slot::new(5)), None).is_err());
    }

    #[test]
    fn watermark_below_slot_permits() {
        assert!(check_block_proposal(Slot::new(6), root(1), Some(Slot::new(5)), None).is_ok());
    }
}
