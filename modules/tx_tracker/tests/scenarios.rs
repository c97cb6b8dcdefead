//! End-to-end scenarios: events in, notifications and unpins out.

use std::sync::{Arc, Mutex};

use txwatch_common::messages::{ChainEvent, TxNotification};
use txwatch_common::{BlockHash, Settlement, TxId};
use txwatch_module_tx_tracker::memory_chain::{ChainQuery, MemoryChain};
use txwatch_module_tx_tracker::tracker_observer::{
    drain_notifications, NotificationQueue, QueueObserver,
};
use txwatch_module_tx_tracker::{TxTracker, TxTrackerConfig};

struct Harness {
    tracker: TxTracker,
    chain: MemoryChain,
    queue: NotificationQueue,
}

impl Harness {
    fn new(chain: MemoryChain) -> Self {
        let queue: NotificationQueue = Arc::new(Mutex::new(Vec::new()));
        let tracker = TxTracker::new(
            TxTrackerConfig::default(),
            Box::new(chain.clone()),
            Box::new(QueueObserver::new(queue.clone())),
        );
        Self {
            tracker,
            chain,
            queue,
        }
    }

    fn tx(&mut self, tx: &str) -> &mut Self {
        self.tracker.handle(ChainEvent::NewTransaction { value: tx.into() }).unwrap();
        self
    }

    fn block(&mut self, hash: &str, parent: &str) -> &mut Self {
        self.tracker
            .handle(ChainEvent::NewBlock {
                block_hash: hash.into(),
                parent: parent.into(),
            })
            .unwrap();
        self
    }

    fn finalized(&mut self, hash: &str) -> &mut Self {
        self.tracker
            .handle(ChainEvent::Finalized {
                block_hash: hash.into(),
            })
            .unwrap();
        self
    }

    fn drain(&mut self) -> Vec<TxNotification> {
        drain_notifications(&self.queue)
    }
}

fn valid(block: &str, successful: bool) -> Settlement {
    Settlement::Valid {
        block_hash: block.into(),
        successful,
    }
}

fn invalid(block: &str) -> Settlement {
    Settlement::Invalid {
        block_hash: block.into(),
    }
}

fn settled(tx: &str, settlement: Settlement) -> TxNotification {
    TxNotification::TxSettled {
        tx: tx.into(),
        settlement,
    }
}

fn done(tx: &str, settlement: Settlement) -> TxNotification {
    TxNotification::TxDone {
        tx: tx.into(),
        settlement,
    }
}

fn sorted(mut hashes: Vec<BlockHash>) -> Vec<BlockHash> {
    hashes.sort();
    hashes
}

#[test]
fn settles_then_completes_on_finality() {
    let mut h = Harness::new(MemoryChain::new().with_block("B1", &["t1"]));

    h.tx("t1").block("B1", "B0");
    assert_eq!(h.drain(), vec![settled("t1", valid("B1", true))]);

    h.finalized("B1");
    assert_eq!(h.drain(), vec![done("t1", valid("B1", true))]);
    assert_eq!(h.chain.unpinned(), vec![BlockHash::from("B0")]);
    assert!(h.tracker.pending().is_empty());
}

#[test]
fn finalized_fork_wins_and_sibling_is_pruned() {
    let chain = MemoryChain::new()
        .with_block("B1", &["t1"])
        .with_block("B2", &[])
        .with_invalid("B2", "t1");
    let mut h = Harness::new(chain);

    h.tx("t1").block("B1", "B0").block("B2", "B0");
    assert_eq!(
        h.drain(),
        vec![settled("t1", valid("B1", true)), settled("t1", invalid("B2"))]
    );

    h.finalized("B2");
    assert_eq!(h.drain(), vec![done("t1", invalid("B2"))]);
    assert_eq!(
        sorted(h.chain.unpinned()),
        vec![BlockHash::from("B0"), BlockHash::from("B1")]
    );
    assert!(h.tracker.tree().get_block(&"B1".into()).is_none());
}

#[test]
fn skipped_finality_resolves_through_inheritance() {
    let chain = MemoryChain::new()
        .with_block("B1", &["t1"])
        .with_failed("B1", "t1")
        .with_block("B2", &[]);
    let mut h = Harness::new(chain);

    h.tx("t1").block("B1", "B0").block("B2", "B1");
    assert_eq!(h.drain(), vec![settled("t1", valid("B1", false))]);

    // No finalized(B1) event
    h.finalized("B2");
    assert_eq!(h.drain(), vec![done("t1", valid("B1", false))]);
    assert_eq!(
        sorted(h.chain.unpinned()),
        vec![BlockHash::from("B0"), BlockHash::from("B1")]
    );
}

#[test]
fn no_queries_for_settled_transaction_on_descendants() {
    let chain = MemoryChain::new()
        .with_block("B1", &["t1"])
        .with_block("B2", &["t2"])
        .with_block("B3", &[])
        .with_block("B4", &[]);
    let mut h = Harness::new(chain);

    h.tx("t1").tx("t2");
    h.block("B1", "B0").block("B2", "B1").block("B3", "B2").block("B4", "B2");

    let t1_queries = h.chain.queries_for_tx(&TxId::from("t1"));
    assert_eq!(
        t1_queries,
        vec![ChainQuery::IsTxSuccessful("B1".into(), "t1".into())]
    );
    let t2_queries = h.chain.queries_for_tx(&TxId::from("t2"));
    assert_eq!(
        t2_queries,
        vec![
            ChainQuery::IsTxValid("B1".into(), "t2".into()),
            ChainQuery::IsTxSuccessful("B2".into(), "t2".into()),
        ]
    );
    // B3 and B4 had nothing left to check
    assert!(!h.chain.queries().contains(&ChainQuery::GetBody("B3".into())));
    assert!(!h.chain.queries().contains(&ChainQuery::GetBody("B4".into())));
}

#[test]
fn settled_fires_once_per_transaction_and_block() {
    let chain = MemoryChain::new()
        .with_block("B1", &["t1"])
        .with_block("B2", &[])
        .with_block("B3", &[])
        .with_block("B1b", &["t1"]);
    let mut h = Harness::new(chain);

    h.tx("t1").block("B1", "B0").block("B2", "B1").block("B3", "B2");
    h.block("B1b", "B0");
    h.tx("t1");

    assert_eq!(
        h.drain(),
        vec![settled("t1", valid("B1", true)), settled("t1", valid("B1b", true))]
    );
}

#[test]
fn submission_order_is_preserved_for_settled_and_done() {
    let chain = MemoryChain::new()
        .with_block("B1", &["c", "a"])
        .with_invalid("B1", "b")
        .with_block("B2", &[]);
    let mut h = Harness::new(chain);

    h.tx("b").tx("c").tx("a").block("B1", "B0").block("B2", "B1");
    let order: Vec<TxId> = h
        .drain()
        .into_iter()
        .map(|n| match n {
            TxNotification::TxSettled { tx, .. } | TxNotification::TxDone { tx, .. } => tx,
        })
        .collect();
    assert_eq!(order, vec![TxId::from("b"), TxId::from("c"), TxId::from("a")]);

    h.finalized("B2");
    let order: Vec<TxId> = h
        .drain()
        .into_iter()
        .map(|n| match n {
            TxNotification::TxSettled { tx, .. } | TxNotification::TxDone { tx, .. } => tx,
        })
        .collect();
    assert_eq!(order, vec![TxId::from("b"), TxId::from("c"), TxId::from("a")]);
}

#[test]
fn done_fires_at_most_once_even_if_resubmitted() {
    let chain = MemoryChain::new()
        .with_block("B1", &["t1"])
        .with_block("B2", &["t1"]);
    let mut h = Harness::new(chain);

    h.tx("t1").block("B1", "B0").finalized("B1");
    assert_eq!(h.drain().len(), 2);

    h.tx("t1").block("B2", "B1").finalized("B2");
    assert!(h.drain().is_empty());
}

#[test]
fn transaction_submitted_late_is_checked_only_against_later_blocks() {
    let chain = MemoryChain::new()
        .with_block("B1", &["t1"])
        .with_block("B2", &[]);
    let mut h = Harness::new(chain);

    h.block("B1", "B0").tx("t1").block("B2", "B1");

    assert!(h.drain().is_empty());
    assert_eq!(
        h.chain.queries_for_tx(&TxId::from("t1")),
        vec![ChainQuery::IsTxValid("B2".into(), "t1".into())]
    );
}

#[test]
fn deep_fork_pruning_keeps_finalized_subtree() {
    // B0 -> B1 -> B2 -> B3 -> B4
    //             B2 -> X1 -> X2
    //       B1 -> Y1
    // B0 -> Z1
    let mut chain = MemoryChain::new();
    for hash in ["B1", "B2", "B3", "B4", "X1", "X2", "Y1", "Z1"] {
        chain = chain.with_block(hash, &[]);
    }
    let mut h = Harness::new(chain);

    h.block("B1", "B0").block("B2", "B1").block("B3", "B2").block("B4", "B3");
    h.block("X1", "B2").block("X2", "X1").block("Y1", "B1").block("Z1", "B0");

    h.finalized("B3");
    let expected: Vec<BlockHash> = ["B0", "B1", "B2", "X1", "X2", "Y1", "Z1"]
        .into_iter()
        .map(BlockHash::from)
        .collect();
    assert_eq!(sorted(h.chain.unpinned()), sorted(expected));
    assert_eq!(h.tracker.tree().len(), 2);
    assert_eq!(h.tracker.tree().root(), Some(&BlockHash::from("B3")));
    assert_eq!(
        h.tracker.tree().children_of(&"B3".into()),
        &[BlockHash::from("B4")]
    );

    // Later finality only releases what became obsolete since
    h.finalized("B4");
    assert_eq!(h.chain.unpinned().len(), 8);
    assert_eq!(h.chain.unpinned().last(), Some(&BlockHash::from("B3")));
}

#[test]
fn settlement_is_recorded_at_every_descendant() {
    let chain = MemoryChain::new()
        .with_block("B1", &[])
        .with_invalid("B1", "t1")
        .with_block("B2", &[])
        .with_block("B3", &[]);
    let mut h = Harness::new(chain);

    h.tx("t1").block("B1", "B0").block("B2", "B1").block("B3", "B1");

    for block in ["B1", "B2", "B3"] {
        assert_eq!(
            h.tracker.pending().settlement_at(&"t1".into(), &block.into()),
            Some(&invalid("B1"))
        );
    }
}
