//! txwatch transaction tracker
//! Reports when submitted transactions settle in blocks, and when those
//! blocks become final, across a forking block tree

pub mod block_tree;
pub mod chain_accessor;
pub mod finality;
pub mod memory_chain;
pub mod pending_txs;
pub mod settlement;
pub mod tracker_error;
pub mod tracker_observer;
pub mod tree_block;

use config::Config;
use tracing::{debug, error, info, info_span};
use txwatch_common::{messages::ChainEvent, TxId};

use block_tree::BlockTree;
use chain_accessor::ChainAccessor;
use pending_txs::PendingTxs;
use tracker_error::TxTrackerError;
use tracker_observer::TxTrackerObserver;

const DEFAULT_UNPIN_PRUNED: bool = true;

/// Tracker configuration
#[derive(Debug, Clone)]
pub struct TxTrackerConfig {
    /// Hand pruned blocks to the chain accessor for unpinning
    pub unpin_pruned: bool,
}

impl Default for TxTrackerConfig {
    fn default() -> Self {
        Self {
            unpin_pruned: DEFAULT_UNPIN_PRUNED,
        }
    }
}

impl TxTrackerConfig {
    pub fn new(config: &Config) -> Self {
        let unpin_pruned = config.get_bool("unpin-pruned").unwrap_or(DEFAULT_UNPIN_PRUNED);
        info!("Unpin pruned blocks: {unpin_pruned}");
        Self { unpin_pruned }
    }
}

/// Settlement and finality tracker.
///
/// Events are handled strictly one at a time, each to completion. Any
/// error is fatal: the tracker is poisoned and rejects every later event.
pub struct TxTracker {
    /// Blocks observed since the last finalized block
    tree: BlockTree,
    /// Transactions being watched
    pending: PendingTxs,
    /// Chain data collaborator
    accessor: Box<dyn ChainAccessor + Send>,
    /// Notification receiver
    observer: Box<dyn TxTrackerObserver + Send>,
    config: TxTrackerConfig,
    poisoned: bool,
}

impl TxTracker {
    pub fn new(
        config: TxTrackerConfig,
        accessor: Box<dyn ChainAccessor + Send>,
        observer: Box<dyn TxTrackerObserver + Send>,
    ) -> Self {
        Self {
            tree: BlockTree::new(),
            pending: PendingTxs::new(),
            accessor,
            observer,
            config,
            poisoned: false,
        }
    }

    /// Route one inbound event to the engine that handles it
    pub fn handle(&mut self, event: ChainEvent) -> Result<(), TxTrackerError> {
        if self.poisoned {
            return Err(TxTrackerError::Poisoned);
        }

        let span = info_span!("tx_tracker", event = event.kind());
        let _entered = span.enter();

        let result = match event {
            ChainEvent::NewTransaction { value } => {
                self.on_new_transaction(value);
                Ok(())
            }
            ChainEvent::NewBlock { block_hash, parent } => self.on_new_block(block_hash, parent),
            ChainEvent::Finalized { block_hash } => self.on_finalized(block_hash),
        };

        if let Err(e) = &result {
            error!("Event failed, tracker poisoned: {e}");
            self.poisoned = true;
        }
        result
    }

    fn on_new_transaction(&mut self, tx: TxId) {
        if self.pending.register(tx.clone()) {
            debug!(tx = %tx, pending = self.pending.len(), "tracking transaction");
        } else {
            debug!(tx = %tx, "transaction already tracked or done");
        }
    }

    pub fn tree(&self) -> &BlockTree {
        &self.tree
    }

    pub fn pending(&self) -> &PendingTxs {
        &self.pending
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }
}
