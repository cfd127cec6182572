use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use types::Hash256;

/// The signing root of a block or attestation, as recorded in the history store.
///
/// A `SigningRoot` that wraps `None` means "a signature at this coordinate is known to have
/// happened, but we don't know its content". Such a record forbids
/// *any* future signing at that coordinate, regardless of the candidate root offered, because we
/// cannot prove the candidate is a re-sign of the same artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "arbitrary-fuzz", derive(arbitrary::Arbitrary))]
#[serde(transparent)]
pub struct SigningRoot(pub Option<Hash256>);

impl SigningRoot {
    pub fn matches(&self, other: &SigningRoot) -> bool {
        match (self.0, other.0) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

impl From<Hash256> for SigningRoot {
    fn from(root: Hash256) -> Self {
        SigningRoot(Some(root))
    }
}

impl From<Option<Hash256>> for SigningRoot {
    fn from(root: Option<Hash256>) -> Self {
        SigningRoot(root)
    }
}

impl ToSql for SigningRoot {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self.0 {
            Some(root) => Ok(ToSqlOutput::from(root.as_bytes().to_vec())),
            None => Ok(ToSqlOutput::from(rusqlite::types::Null)),
        }
    }
}

impl FromSql for SigningRoot {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value {
            ValueRef::Null => Ok(SigningRoot(None)),
            ValueRef::Blob(bytes) => {
                if bytes.len() != 32 {
                    return Err(FromSqlError::InvalidType);
                }
                Ok(SigningRoot(Some(Hash256::from_slice(bytes))))
            }
            _ => Err(FromSqlError::InvalidType),
        }
    }
}
