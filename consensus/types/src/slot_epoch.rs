//! The `Slot` and `Epoch` wrapper types, ported from the full `types` crate's
//! `slot_epoch.rs`/`slot_epoch_macros.rs` pair. Only the arithmetic needed by the slashing
//! protection engine (`+`, `-`, comparisons, conversions) is carried over; block/state-processing
//! specific helpers (e.g. `epoch_at_slot`) are out of scope here.
use serde_derive::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};

/// A slot is a fixed-duration period during which a single block may be proposed.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "arbitrary-fuzz", derive(arbitrary::Arbitrary))]
#[serde(transparent)]
pub struct Slot(#[serde(with = "ethereum_serde_utils::quoted_u64")] u64);

/// An epoch is a span of consecutive slots; attestations cite a source and target epoch.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "arbitrary-fuzz", derive(arbitrary::Arbitrary))]
#[serde(transparent)]
pub struct Epoch(#[serde(with = "ethereum_serde_utils::quoted_u64")] u64);

macro_rules! impl_common {
    ($type:ident) => {
        impl $type {
            pub const fn new(n: u64) -> $type {
                $type(n)
            }

            pub const fn as_u64(&self) -> u64 {
                self.0
            }

            pub fn as_usize(&self) -> usize {
                self.0 as usize
            }

            pub fn checked_add(&self, other: $type) -> Option<$type> {
                self.0.checked_add(other.0).map($type)
            }

            pub fn checked_sub(&self, other: $type) -> Option<$type> {
                self.0.checked_sub(other.0).map($type)
            }

            pub fn saturating_add(&self, other: $type) -> $type {
                $type(self.0.saturating_add(other.0))
            }

            pub fn saturating_sub(&self, other: $type) -> $type {
                $type(self.0.saturating_sub(other.0))
            }
        }

        impl From<u64> for $type {
            fn from(n: u64) -> $type {
                $type(n)
            }
        }

        impl From<$type> for u64 {
            fn from(from: $type) -> u64 {
                from.0
            }
        }

        impl Add<u64> for $type {
            type Output = $type;

            fn add(self, other: u64) -> $type {
                $type(self.0.saturating_add(other))
            }
        }

        impl Add<$type> for $type {
            type Output = $type;

            fn add(self, other: $type) -> $type {
                self + other.0
            }
        }

        impl Sub<u64> for $type {
            type Output = $type;

            fn sub(self, other: u64) -> $type {
                $type(self.0.saturating_sub(other))
            }
        }

        impl Sub<$type> for $type {
            type Output = $type;

            fn sub(self, other: $type) -> $type {
                self - other.0
            }
        }

        impl fmt::Display for $type {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

impl_common!(Slot);
impl_common!(Epoch);
