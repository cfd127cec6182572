//! A compressed BLS12-381 public key, stored and compared as opaque bytes.
//!
//! The slashing protection engine never verifies or deserializes the curve point; it only needs
//! equality, hashing, and a stable hex encoding for the interchange format and the validators
//! table. Real point validation belongs to the key-management/signing layer, which is out of
//! scope here (see `SlashingDatabase` module docs).
use serde::de::{Deserialize, Deserializer};
use serde::ser::{Serialize, Serializer};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Length of a compressed BLS public key, in bytes.
pub const PUBLIC_KEY_BYTES_LEN: usize = 48;

#[derive(Clone, Copy)]
pub struct PublicKeyBytes([u8; PUBLIC_KEY_BYTES_LEN]);

impl PublicKeyBytes {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, String> {
        if bytes.len() != PUBLIC_KEY_BYTES_LEN {
            return Err(format!(
                "public key must be {} bytes, got {}",
                PUBLIC_KEY_BYTES_LEN,
                bytes.len()
            ));
        }
        let mut buf = [0; PUBLIC_KEY_BYTES_LEN];
        buf.copy_from_slice(bytes);
        Ok(Self(buf))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn as_hex_string(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl PartialEq for PublicKeyBytes {
    fn eq(&self, other: &Self) -> bool {
        self.0[..] == other.0[..]
    }
}

impl Eq for PublicKeyBytes {}

impl Hash for PublicKeyBytes {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state)
    }
}

impl fmt::Debug for PublicKeyBytes {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_hex_string())
    }
}

impl std::str::FromStr for PublicKeyBytes {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let stripped = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(stripped).map_err(|e| format!("invalid hex public key: {}", e))?;
        Self::from_bytes(&bytes)
    }
}

impl fmt::Display for PublicKeyBytes {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_hex_string())
    }
}

impl Serialize for PublicKeyBytes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.as_hex_string())
    }
}

impl<'de> Deserialize<'de> for PublicKeyBytes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(feature = "arbitrary-fuzz")]
impl<'a> arbitrary::Arbitrary<'a> for PublicKeyBytes {
    fn arbitrary(u: &mut arbitrary::Unstructured<'a>) -> arbitrary::Result<Self> {
        let mut bytes = [0u8; PUBLIC_KEY_BYTES_LEN];
        u.fill_buffer(&mut bytes)?;
        Ok(PublicKeyBytes(bytes))
    }
}
