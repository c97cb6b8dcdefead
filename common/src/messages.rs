//! Definition of txwatch messages

use crate::types::{BlockHash, Settlement, TxId};

/// Lifecycle events fed to the tracker, in arrival order
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ChainEvent {
    /// A transaction was submitted and should be watched
    NewTransaction { value: TxId },

    /// A block was produced on top of `parent`
    NewBlock { block_hash: BlockHash, parent: BlockHash },

    /// A block (and its whole lineage) is final
    Finalized { block_hash: BlockHash },
}

impl ChainEvent {
    /// Short name used in logs and spans
    pub fn kind(&self) -> &'static str {
        match self {
            ChainEvent::NewTransaction { .. } => "newTransaction",
            ChainEvent::NewBlock { .. } => "newBlock",
            ChainEvent::Finalized { .. } => "finalized",
        }
    }
}

/// Notifications emitted by the tracker
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TxNotification {
    /// The transaction settled in some block
    TxSettled { tx: TxId, settlement: Settlement },

    /// The settling block is now on the finalized lineage
    TxDone { tx: TxId, settlement: Settlement },
}
