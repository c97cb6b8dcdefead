//! Chain data collaborator consumed by the tracker.

use anyhow::Result;
use txwatch_common::{BlockHash, TxId};

/// Read access to pinned chain data, plus the ability to release it.
///
/// All queries are answered synchronously. Any error is treated as fatal
/// by the tracker.
pub trait ChainAccessor {
    /// Transaction ids included in the block, in block order.
    fn get_body(&self, block: &BlockHash) -> Result<Vec<TxId>>;

    /// Whether a transaction not included so far could still be included
    /// after this block.
    fn is_tx_valid(&self, block: &BlockHash, tx: &TxId) -> Result<bool>;

    /// Execution result of a transaction included in this block.
    fn is_tx_successful(&self, block: &BlockHash, tx: &TxId) -> Result<bool>;

    /// Release retained data for blocks that are no longer needed.
    fn unpin(&self, blocks: &[BlockHash]);
}
