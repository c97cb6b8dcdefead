//! Finality and pruning engine: reports completed transactions and
//! releases blocks that a finalized block has made obsolete.

use tracing::{debug, info};
use txwatch_common::{BlockHash, Settlement, TxId};

use crate::block_tree::BlockTree;
use crate::tracker_error::TxTrackerError;
use crate::TxTracker;

impl TxTracker {
    /// Handle a `finalized` event.
    ///
    /// Settlement maps already carry inherited entries for every block
    /// below a settling block, so a direct lookup at `hash` also finds
    /// transactions that settled in a block whose own `finalized` event
    /// was skipped.
    pub(crate) fn on_finalized(&mut self, hash: BlockHash) -> Result<(), TxTrackerError> {
        if !self.tree.contains(&hash) {
            return Err(TxTrackerError::BlockNotInTree { hash });
        }

        let done: Vec<(TxId, Settlement)> = self
            .pending
            .iter()
            .filter_map(|(tx, settlements)| {
                settlements.get(&hash).map(|settlement| (tx.clone(), settlement.clone()))
            })
            .collect();

        for (tx, settlement) in &done {
            info!(tx = %tx, "transaction done: {settlement}");
            self.observer.tx_done(tx, settlement);
        }
        let done: Vec<TxId> = done.into_iter().map(|(tx, _)| tx).collect();
        self.pending.complete(&done);

        let pruned = prune_set(&self.tree, &hash);
        debug!(finalized = %hash, pruned = pruned.len(), "computed prune set");

        if !pruned.is_empty() {
            if self.config.unpin_pruned {
                self.accessor.unpin(&pruned);
            }
            for block in &pruned {
                self.tree.remove(block);
            }
            let dropped = self.pending.forget_blocks(&pruned);
            if dropped > 0 {
                debug!(dropped, "discarded settlements on pruned blocks");
            }
        }

        self.tree.reroot(&hash)
    }
}

/// Blocks made obsolete by finalizing `finalized`.
///
/// Every strict ancestor of `finalized`, plus every fork hanging off its
/// lineage, with full subtrees. Never includes `finalized` or anything
/// below it. Pure: the tree is only read.
pub fn prune_set(tree: &BlockTree, finalized: &BlockHash) -> Vec<BlockHash> {
    let mut pruned = Vec::new();
    let mut keep_child = finalized;
    let mut ancestor = tree.parent_of(finalized);

    while let Some(hash) = ancestor.filter(|h| tree.contains(h)) {
        pruned.push(hash.clone());
        pruned.extend(tree.descendants_excluding(hash, Some(keep_child)));
        keep_child = hash;
        ancestor = tree.parent_of(hash);
    }
    pruned
}
