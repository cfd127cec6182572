//! Trimmed-down stand-in for Lighthouse's `types` crate, carrying only the primitives the
//! slashing protection engine needs: `Slot`, `Epoch`, `PublicKeyBytes` and `Hash256`.
mod hash256;
mod public_key_bytes;
mod slot_epoch;

pub use hash256::Hash256;
pub use public_key_bytes::{PublicKeyBytes, PUBLIC_KEY_BYTES_LEN};
pub use slot_epoch::{Epoch, Slot};
