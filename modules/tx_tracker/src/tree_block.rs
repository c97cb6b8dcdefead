//! Block representation within the block tree.

use txwatch_common::{BlockHash, TxId};

/// A node in the block tree: one observed block that has not yet been
/// pruned by finality.
#[derive(Debug, Clone)]
pub struct TreeBlock {
    /// Block hash (identity key).
    pub hash: BlockHash,
    /// Parent block hash; `None` for the root.
    pub parent: Option<BlockHash>,
    /// Parent the block was announced with; survives re-rooting.
    pub announced_parent: Option<BlockHash>,
    /// Child block hashes, in observation order.
    pub children: Vec<BlockHash>,
    /// Transaction ids in the block; `None` until fetched.
    pub body: Option<Vec<TxId>>,
}

impl TreeBlock {
    /// Create a new tree block with no body and no children.
    pub fn new(hash: BlockHash, parent: Option<BlockHash>) -> Self {
        Self {
            hash,
            announced_parent: parent.clone(),
            parent,
            children: Vec::new(),
            body: None,
        }
    }
}
