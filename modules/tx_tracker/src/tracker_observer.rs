//! Observer trait for transaction tracker notifications.

use std::sync::{Arc, Mutex, PoisonError};

use txwatch_common::{messages::TxNotification, Settlement, TxId};

/// Callback receiver for transaction tracker notifications.
///
/// The owning process implements this trait to forward notifications to
/// whoever is watching the transactions.
pub trait TxTrackerObserver {
    /// A transaction settled in a newly observed block.
    ///
    /// Called at most once per (transaction, settling block) pair, in
    /// transaction submission order within one block.
    fn tx_settled(&self, tx: &TxId, settlement: &Settlement);

    /// A transaction's settling block is now on the finalized lineage.
    ///
    /// Called at most once per transaction, ever.
    fn tx_done(&self, tx: &TxId, settlement: &Settlement);
}

/// Shared notification queue between a [`QueueObserver`] and its reader.
pub type NotificationQueue = Arc<Mutex<Vec<TxNotification>>>;

/// Observer that queues notifications for the caller to drain.
pub struct QueueObserver {
    notifications: NotificationQueue,
}

impl QueueObserver {
    pub fn new(notifications: NotificationQueue) -> Self {
        Self { notifications }
    }

    fn push(&self, notification: TxNotification) {
        self.notifications.lock().unwrap_or_else(PoisonError::into_inner).push(notification);
    }
}

impl TxTrackerObserver for QueueObserver {
    fn tx_settled(&self, tx: &TxId, settlement: &Settlement) {
        self.push(TxNotification::TxSettled {
            tx: tx.clone(),
            settlement: settlement.clone(),
        });
    }

    fn tx_done(&self, tx: &TxId, settlement: &Settlement) {
        self.push(TxNotification::TxDone {
            tx: tx.clone(),
            settlement: settlement.clone(),
        });
    }
}

/// Take everything queued so far.
pub fn drain_notifications(queue: &NotificationQueue) -> Vec<TxNotification> {
    queue.lock().unwrap_or_else(PoisonError::into_inner).drain(..).collect()
}
