//! Settlement engine: decides, for each newly observed block, which
//! tracked transactions settle in it.

use tracing::{debug, info, warn};
use txwatch_common::{BlockHash, Settlement, TxId};

use crate::block_tree::BlockTree;
use crate::chain_accessor::ChainAccessor;
use crate::tracker_error::TxTrackerError;
use crate::TxTracker;

impl TxTracker {
    /// Handle a `newBlock` event.
    ///
    /// Every tracked transaction that already settled at `parent` inherits
    /// that settlement at `hash` without any chain query. The rest are
    /// checked against this block; the body is fetched at most once.
    /// Settlement notifications are only fired once every query for the
    /// block has succeeded, in submission order.
    pub(crate) fn on_new_block(
        &mut self,
        hash: BlockHash,
        parent: BlockHash,
    ) -> Result<(), TxTrackerError> {
        if self.tree.is_empty() {
            debug!(root = %parent, "starting block tree from unannounced parent");
            self.tree.set_root(parent.clone());
        }

        if !self.tree.insert(hash.clone(), parent.clone())? {
            warn!(hash = %hash, parent = %parent, "ignoring re-announced block");
            return Ok(());
        }

        let accessor = &*self.accessor;
        let mut inherited: Vec<(TxId, Settlement)> = Vec::new();
        let mut settled: Vec<(TxId, Settlement)> = Vec::new();

        for (tx, settlements) in self.pending.iter() {
            if let Some(settlement) = settlements.get(&parent) {
                inherited.push((tx.clone(), settlement.clone()));
                continue;
            }

            if let Some(settlement) = settle_in_block(&mut self.tree, accessor, &hash, tx)? {
                settled.push((tx.clone(), settlement));
            }
        }

        debug!(
            hash = %hash,
            inherited = inherited.len(),
            settled = settled.len(),
            "processed new block"
        );

        for (tx, settlement) in inherited {
            self.pending.record(&tx, hash.clone(), settlement);
        }

        for (tx, settlement) in settled {
            info!(tx = %tx, "transaction settled: {settlement}");
            self.observer.tx_settled(&tx, &settlement);
            self.pending.record(&tx, hash.clone(), settlement);
        }

        Ok(())
    }
}

/// Check one transaction against one block.
///
/// Returns `None` if the transaction is absent and could still be
/// included later on this lineage.
fn settle_in_block(
    tree: &mut BlockTree,
    accessor: &dyn ChainAccessor,
    hash: &BlockHash,
    tx: &TxId,
) -> Result<Option<Settlement>, TxTrackerError> {
    let included = tree
        .body_or_fetch(hash, |h| {
            accessor.get_body(h).map_err(|source| chain_access("get_body", h, source))
        })?
        .contains(tx);

    if included {
        let successful = accessor
            .is_tx_successful(hash, tx)
            .map_err(|source| chain_access("is_tx_successful", hash, source))?;
        return Ok(Some(Settlement::Valid {
            block_hash: hash.clone(),
            successful,
        }));
    }

    let valid = accessor
        .is_tx_valid(hash, tx)
        .map_err(|source| chain_access("is_tx_valid", hash, source))?;
    if valid {
        Ok(None)
    } else {
        Ok(Some(Settlement::Invalid {
            block_hash: hash.clone(),
        }))
    }
}

fn chain_access(
    operation: &'static str,
    hash: &BlockHash,
    source: anyhow::Error,
) -> TxTrackerError {
    TxTrackerError::ChainAccess {
        operation,
        hash: hash.clone(),
        source,
    }
}
