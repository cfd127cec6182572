use crate::test_db;
use slashing_protection::{NotSafe, SigningRoot};
use types::{Epoch, Hash256, PublicKeyBytes};

fn key(byte: u8) -> PublicKeyBytes {
    PublicKeyBytes::from_bytes(&[byte; 48]).unwrap()
}

fn root(byte: u8) -> SigningRoot {
    SigningRoot::from(Hash256::repeat_byte(byte))
}

#[test]
fn first_attestation_for_validator_is_always_permitted() {
    let (_dir, db) = test_db();
    db.register_validators(std::iter::once(&key(1))).unwrap();
    assert!(db
        .check_and_insert_attestation_signing_root(&key(1), Epoch::new(1), Epoch::new(2), root(1))
        .is_ok());
}

#[test]
fn double_vote_at_same_target_is_rejected() {
    let (_dir, db) = test_db();
    db.register_validators(std::iter::once(&key(1))).unwrap();
    db.check_and_insert_attestation_signing_root(&key(1), Epoch::new(1), Epoch::new(2), root(1))
        .unwrap();
    let err = db
        .check_and_insert_attestation_signing_root(&key(1), Epoch::new(1), Epoch::new(2), root(2))
        .unwrap_err();
    assert!(matches!(err, NotSafe::InvalidAttestation(_)));
}

#[test]
fn surrounding_vote_is_rejected() {
    let (_dir, db) = test_db();
    db.register_validators(std::iter::once(&key(1))).unwrap();
    db.check_and_insert_attestation_signing_root(&key(1), Epoch::new(10), Epoch::new(20), root(1))
        .unwrap();
    // Surrounds the existing (10, 20) vote.
    let err = db
        .check_and_insert_attestation_signing_root(&key(1), Epoch::new(5), Epoch::new(25), root(2))
        .unwrap_err();
    assert!(matches!(err, NotSafe::InvalidAttestation(_)));
}

#[test]
fn surrounded_vote_is_rejected() {
    let (_dir, db) = test_db();
    db.register_validators(std::iter::once(&key(1))).unwrap();
    db.check_and_insert_attestation_signing_root(&key(1), Epoch::new(10), Epoch::new(20), root(1))
        .unwrap();
    // Surrounded by the existing (10, 20) vote.
    let err = db
        .check_and_insert_attestation_signing_root(&key(1), Epoch::new(11), Epoch::new(19), root(2))
        .unwrap_err();
    assert!(matches!(err, NotSafe::InvalidAttestation(_)));
}

#[test]
fn non_overlapping_votes_chain_freely() {
    let (_dir, db) = test_db();
    db.register_validators(std::iter::once(&key(1))).unwrap();
    for (source, target) in [(0u64, 2u64), (2, 4), (4, 6), (6, 8)] {
        assert!(db
            .check_and_insert_attestation_signing_root(
                &key(1),
                Epoch::new(source),
                Epoch::new(target),
                root(1)
            )
            .is_ok());
    }
}

#[test]
fn watermarks_enforce_both_bounds() {
    let (_dir, db) = test_db();
    db.register_validators(std::iter::once(&key(1))).unwrap();
    db.set_watermarks(&key(1), None, Some(Epoch::new(5)), Some(Epoch::new(10)))
        .unwrap();

    assert!(db
        .check_and_insert_attestation_signing_root(&key(1), Epoch::new(4), Epoch::new(11), root(1))
        .is_err());
    assert!(db
        .check_and_insert_attestation_signing_root(&key(1), Epoch::new(5), Epoch::new(10), root(1))
        .is_err());
    assert!(db
        .check_and_insert_attestation_signing_root(&key(1), Epoch::new(5), Epoch::new(11), root(1))
        .is_ok());
}
