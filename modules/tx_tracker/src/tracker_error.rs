//! Error types for transaction tracker operations.

use txwatch_common::BlockHash;

/// Errors returned by [`TxTracker`](crate::TxTracker) and
/// [`BlockTree`](crate::block_tree::BlockTree) operations.
///
/// All of these are fatal: the event stream is expected to be internally
/// consistent, and the tracker refuses further events once one is raised.
#[derive(Debug, thiserror::Error)]
pub enum TxTrackerError {
    /// A new block's parent hash is not present in the tree.
    #[error("parent not found: {hash}")]
    ParentNotFound { hash: BlockHash },

    /// A block was announced again with a different parent.
    #[error("block {hash} re-announced with different parent {got}")]
    ConflictingParent { hash: BlockHash, got: BlockHash },

    /// A block hash referenced by an operation is not in the tree.
    #[error("block not in tree: {hash}")]
    BlockNotInTree { hash: BlockHash },

    /// The chain accessor failed to answer a query.
    #[error("chain accessor {operation} failed for block {hash}: {source}")]
    ChainAccess {
        operation: &'static str,
        hash: BlockHash,
        #[source]
        source: anyhow::Error,
    },

    /// An earlier event failed part-way; state can no longer be trusted.
    #[error("tracker poisoned by an earlier failure")]
    Poisoned,
}
