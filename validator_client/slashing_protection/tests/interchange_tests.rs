use crate::{test_db, test_gvr};
use slashing_protection::{
    Interchange, InterchangeAttestation, InterchangeBlock, InterchangeData, InterchangeMetadata,
};
use types::{Epoch, Hash256, PublicKeyBytes, Slot};

fn key(byte: u8) -> PublicKeyBytes {
    PublicKeyBytes::from_bytes(&[byte; 48]).unwrap()
}

#[test]
fn import_then_export_round_trips() {
    let (_dir, db) = test_db();
    let gvr = test_gvr();

    let interchange = Interchange {
        metadata: InterchangeMetadata::new(gvr),
        data: vec![InterchangeData {
            pubkey: key(1),
            signed_blocks: vec![InterchangeBlock {
                slot: Slot::new(10),
                signing_root: Some(Hash256::repeat_byte(1)),
            }],
            signed_attestations: vec![InterchangeAttestation {
                source_epoch: Epoch::new(1),
                target_epoch: Epoch::new(2),
                signing_root: Some(Hash256::repeat_byte(2)),
            }],
        }],
    };

    let outcomes = db.import_interchange_info(interchange, gvr).unwrap();
    assert!(outcomes.iter().all(|o| !o.failed()));

    let exported = db.export_interchange_info(gvr).unwrap();
    assert_eq!(exported.data.len(), 1);
    assert_eq!(exported.data[0].pubkey, key(1));
    assert_eq!(exported.data[0].signed_blocks.len(), 1);
    assert_eq!(exported.data[0].signed_attestations.len(), 1);
}

#[test]
fn import_rejects_genesis_validators_root_mismatch() {
    let (_dir, db) = test_db();
    let interchange = Interchange {
        metadata: InterchangeMetadata::new(Hash256::repeat_byte(1)),
        data: vec![],
    };
    assert!(db
        .import_interchange_info(interchange, Hash256::repeat_byte(2))
        .is_err());
}

#[test]
fn import_rejects_unsupported_version() {
    let (_dir, db) = test_db();
    let gvr = test_gvr();
    let mut interchange = Interchange {
        metadata: InterchangeMetadata::new(gvr),
        data: vec![],
    };
    interchange.metadata.interchange_format_version = "4".to_string();
    assert!(db.import_interchange_info(interchange, gvr).is_err());
}

#[test]
fn import_derives_watermarks_from_lowest_seen_record() {
    let (_dir, db) = test_db();
    let gvr = test_gvr();

    let interchange = Interchange {
        metadata: InterchangeMetadata::new(gvr),
        data: vec![InterchangeData {
            pubkey: key(2),
            signed_blocks: vec![
                InterchangeBlock {
                    slot: Slot::new(50),
                    signing_root: Some(Hash256::repeat_byte(1)),
                },
                InterchangeBlock {
                    slot: Slot::new(100),
                    signing_root: Some(Hash256::repeat_byte(2)),
                },
            ],
            signed_attestations: vec![],
        }],
    };
    let outcomes = db.import_interchange_info(interchange, gvr).unwrap();
    assert!(outcomes.iter().all(|o| !o.failed()));

    db.register_validators(std::iter::once(&key(2))).unwrap();

    // The lowest imported slot was 50, so the watermark floor is 49: slot 49 is now forbidden,
    // but a fresh proposal above the whole imported history is fine.
    assert!(db
        .check_and_insert_block_signing_root(
            &key(2),
            Slot::new(49),
            slashing_protection::SigningRoot::from(Hash256::repeat_byte(9))
        )
        .is_err());
    assert!(db
        .check_and_insert_block_signing_root(
            &key(2),
            Slot::new(101),
            slashing_protection::SigningRoot::from(Hash256::repeat_byte(9))
        )
        .is_ok());
}

#[test]
fn import_of_genesis_slot_and_epoch_does_not_self_reject() {
    // A lowest-seen slot/target-epoch of exactly zero has no valid watermark floor strictly
    // below it; the derived watermark must stay unset rather than reject the very record that
    // would have set it.
    let (_dir, db) = test_db();
    let gvr = test_gvr();

    let interchange = Interchange {
        metadata: InterchangeMetadata::new(gvr),
        data: vec![InterchangeData {
            pubkey: key(5),
            signed_blocks: vec![InterchangeBlock {
                slot: Slot::new(0),
                signing_root: Some(Hash256::repeat_byte(1)),
            }],
            signed_attestations: vec![InterchangeAttestation {
                source_epoch: Epoch::new(0),
                target_epoch: Epoch::new(0),
                signing_root: Some(Hash256::repeat_byte(2)),
            }],
        }],
    };

    let outcomes = db.import_interchange_info(interchange, gvr).unwrap();
    assert!(
        outcomes.iter().all(|o| !o.failed()),
        "genesis-slot/epoch import must not reject itself: {:#?}",
        outcomes
    );
}

#[test]
fn conflicting_entry_only_rejects_that_validator() {
    let (_dir, db) = test_db();
    let gvr = test_gvr();

    // Seed validator 3 with a block at slot 10 under an explicit-null signing root, so any
    // import record at that slot for this validator is unresolvable.
    db.register_validators(std::iter::once(&key(3))).unwrap();
    db.set_watermarks(&key(3), Some(Slot::new(10)), None, None)
        .unwrap();

    let interchange = Interchange {
        metadata: InterchangeMetadata::new(gvr),
        data: vec![
            InterchangeData {
                pubkey: key(3),
                signed_blocks: vec![InterchangeBlock {
                    slot: Slot::new(10),
                    signing_root: Some(Hash256::repeat_byte(1)),
                }],
                signed_attestations: vec![],
            },
            InterchangeData {
                pubkey: key(4),
                signed_blocks: vec![InterchangeBlock {
                    slot: Slot::new(10),
                    signing_root: Some(Hash256::repeat_byte(1)),
                }],
                signed_attestations: vec![],
            },
        ],
    };

    let outcomes = db.import_interchange_info(interchange, gvr).unwrap();
    let validator_3_failed = outcomes.iter().any(|o| {
        matches!(o, slashing_protection::ImportOutcome::Failed { public_key, .. } if *public_key == key(3))
    });
    let validator_4_inserted = outcomes.iter().any(|o| {
        matches!(o, slashing_protection::ImportOutcome::BlockInserted { public_key, .. } if *public_key == key(4))
    });
    assert!(validator_3_failed);
    assert!(validator_4_inserted);
}
