//! Per-transaction settlement maps, kept in submission order.

use std::collections::{HashMap, HashSet};

use txwatch_common::{BlockHash, Settlement, TxId};

/// Settlements recorded for one transaction, keyed by every block at or
/// below the settling block on each lineage where it settled.
pub type SettlementMap = HashMap<BlockHash, Settlement>;

/// Transactions still being watched, plus the ids already reported done.
#[derive(Debug, Default)]
pub struct PendingTxs {
    /// Submission order
    order: Vec<TxId>,

    /// Recorded settlements per transaction
    settlements: HashMap<TxId, SettlementMap>,

    /// Transactions reported done; never tracked again.
    ///
    /// Grows by one id per completed transaction for the life of the
    /// tracker. A done transaction sits in a finalized block, so a
    /// resubmission of it would settle invalid on every new block and be
    /// reported done a second time if the id were forgotten.
    completed: HashSet<TxId>,
}

impl PendingTxs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking a transaction. Returns false if it is already
    /// tracked or has already been reported done.
    pub fn register(&mut self, tx: TxId) -> bool {
        if self.settlements.contains_key(&tx) || self.completed.contains(&tx) {
            return false;
        }
        self.order.push(tx.clone());
        self.settlements.insert(tx, SettlementMap::new());
        true
    }

    pub fn is_tracked(&self, tx: &TxId) -> bool {
        self.settlements.contains_key(tx)
    }

    pub fn is_completed(&self, tx: &TxId) -> bool {
        self.completed.contains(tx)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Tracked transactions with their settlement maps, in submission order
    pub fn iter(&self) -> impl Iterator<Item = (&TxId, &SettlementMap)> {
        self.order
            .iter()
            .filter_map(move |tx| self.settlements.get(tx).map(|settlements| (tx, settlements)))
    }

    /// Settlement holding for `tx` at exactly `block`, if any
    pub fn settlement_at(&self, tx: &TxId, block: &BlockHash) -> Option<&Settlement> {
        self.settlements.get(tx).and_then(|s| s.get(block))
    }

    /// Record a settlement for `tx` at `block`. An existing entry is never
    /// overwritten.
    pub fn record(&mut self, tx: &TxId, block: BlockHash, settlement: Settlement) {
        if let Some(settlements) = self.settlements.get_mut(tx) {
            settlements.entry(block).or_insert(settlement);
        }
    }

    /// Stop tracking the given transactions and remember them as done
    pub fn complete(&mut self, txs: &[TxId]) {
        if txs.is_empty() {
            return;
        }
        for tx in txs {
            self.settlements.remove(tx);
            self.completed.insert(tx.clone());
        }
        self.order.retain(|tx| self.settlements.contains_key(tx));
    }

    /// Drop every settlement keyed by one of `blocks`. Returns how many
    /// entries were dropped.
    pub fn forget_blocks(&mut self, blocks: &[BlockHash]) -> usize {
        let blocks: HashSet<&BlockHash> = blocks.iter().collect();
        let mut dropped = 0;
        for settlements in self.settlements.values_mut() {
            let before = settlements.len();
            settlements.retain(|block, _| !blocks.contains(block));
            dropped += before - settlements.len();
        }
        dropped
    }
}
