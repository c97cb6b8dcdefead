//! Core type definitions for txwatch

use std::fmt;

/// Opaque block identifier, as handed out by the chain accessor
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct BlockHash(String);

impl BlockHash {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BlockHash {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for BlockHash {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Opaque transaction identifier
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct TxId(String);

impl TxId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TxId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for TxId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Disposition of a transaction within one block's lineage.
///
/// "Still pending" has no variant: a transaction that is absent from a
/// block and still valid there simply has no settlement recorded.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Settlement {
    /// Included in the body of `block_hash`
    Valid {
        block_hash: BlockHash,
        successful: bool,
    },

    /// Not included, and can never be included on this lineage
    Invalid { block_hash: BlockHash },
}

impl Settlement {
    /// The block in which the transaction settled
    pub fn block_hash(&self) -> &BlockHash {
        match self {
            Settlement::Valid { block_hash, .. } | Settlement::Invalid { block_hash } => {
                block_hash
            }
        }
    }
}

impl fmt::Display for Settlement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Settlement::Valid {
                block_hash,
                successful,
            } => write!(f, "valid in {block_hash} (successful: {successful})"),
            Settlement::Invalid { block_hash } => write!(f, "invalid at {block_hash}"),
        }
    }
}
