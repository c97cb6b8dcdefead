//! In-memory chain accessor, loaded from a JSON fixture.
//!
//! Records every query it answers and every block it is asked to unpin,
//! so callers can check that no redundant queries were issued.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{anyhow, Result};
use txwatch_common::{BlockHash, TxId};

use crate::chain_accessor::ChainAccessor;

/// Chain data for one block.
///
/// Transactions are valid and successful unless listed otherwise.
#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockFixture {
    /// Transactions included in the block, in order
    #[serde(default)]
    pub body: Vec<TxId>,

    /// Transactions that can no longer be included after this block
    #[serde(default)]
    pub invalid: Vec<TxId>,

    /// Included transactions whose execution failed
    #[serde(default)]
    pub failed: Vec<TxId>,
}

/// A query answered by the chain accessor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainQuery {
    GetBody(BlockHash),
    IsTxValid(BlockHash, TxId),
    IsTxSuccessful(BlockHash, TxId),
}

impl ChainQuery {
    pub fn tx(&self) -> Option<&TxId> {
        match self {
            ChainQuery::GetBody(_) => None,
            ChainQuery::IsTxValid(_, tx) | ChainQuery::IsTxSuccessful(_, tx) => Some(tx),
        }
    }
}

/// Chain accessor over fixture data. Clones share their query and unpin
/// logs.
#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(from = "HashMap<BlockHash, BlockFixture>")]
pub struct MemoryChain {
    blocks: HashMap<BlockHash, BlockFixture>,
    /// Validity queries that fail instead of answering
    failing_validity: HashSet<(BlockHash, TxId)>,
    queries: Arc<Mutex<Vec<ChainQuery>>>,
    unpinned: Arc<Mutex<Vec<BlockHash>>>,
}

impl From<HashMap<BlockHash, BlockFixture>> for MemoryChain {
    fn from(blocks: HashMap<BlockHash, BlockFixture>) -> Self {
        Self {
            blocks,
            ..Self::default()
        }
    }
}

impl MemoryChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a block with the given body
    pub fn with_block(mut self, hash: &str, body: &[&str]) -> Self {
        self.blocks.entry(hash.into()).or_default().body =
            body.iter().map(|tx| TxId::from(*tx)).collect();
        self
    }

    /// Mark a transaction invalid at a block
    pub fn with_invalid(mut self, hash: &str, tx: &str) -> Self {
        self.blocks.entry(hash.into()).or_default().invalid.push(tx.into());
        self
    }

    /// Mark an included transaction as failed at a block
    pub fn with_failed(mut self, hash: &str, tx: &str) -> Self {
        self.blocks.entry(hash.into()).or_default().failed.push(tx.into());
        self
    }

    /// Make the validity query for a transaction at a block fail
    pub fn with_failing_validity(mut self, hash: &str, tx: &str) -> Self {
        self.failing_validity.insert((hash.into(), tx.into()));
        self
    }

    /// All queries answered so far, in order
    pub fn queries(&self) -> Vec<ChainQuery> {
        self.queries.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Validity and success queries issued for one transaction
    pub fn queries_for_tx(&self, tx: &TxId) -> Vec<ChainQuery> {
        self.queries().into_iter().filter(|q| q.tx() == Some(tx)).collect()
    }

    /// All blocks unpinned so far, in order
    pub fn unpinned(&self) -> Vec<BlockHash> {
        self.unpinned.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn log(&self, query: ChainQuery) {
        self.queries.lock().unwrap_or_else(PoisonError::into_inner).push(query);
    }

    fn block(&self, hash: &BlockHash) -> Result<&BlockFixture> {
        self.blocks.get(hash).ok_or_else(|| anyhow!("unknown block {hash}"))
    }
}

impl ChainAccessor for MemoryChain {
    fn get_body(&self, block: &BlockHash) -> Result<Vec<TxId>> {
        self.log(ChainQuery::GetBody(block.clone()));
        Ok(self.block(block)?.body.clone())
    }

    fn is_tx_valid(&self, block: &BlockHash, tx: &TxId) -> Result<bool> {
        self.log(ChainQuery::IsTxValid(block.clone(), tx.clone()));
        if self.failing_validity.contains(&(block.clone(), tx.clone())) {
            return Err(anyhow!("validity of {tx} unavailable at {block}"));
        }
        Ok(!self.block(block)?.invalid.contains(tx))
    }

    fn is_tx_successful(&self, block: &BlockHash, tx: &TxId) -> Result<bool> {
        self.log(ChainQuery::IsTxSuccessful(block.clone(), tx.clone()));
        Ok(!self.block(block)?.failed.contains(tx))
    }

    fn unpin(&self, blocks: &[BlockHash]) {
        self.unpinned.lock().unwrap_or_else(PoisonError::into_inner).extend_from_slice(blocks);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_from_json() {
        let chain: MemoryChain = serde_json::from_str(
            r#"{
                "B1": { "body": ["t1", "t2"], "failed": ["t2"] },
                "B2": { "invalid": ["t3"] }
            }"#,
        )
        .unwrap();

        let b1 = BlockHash::from("B1");
        let b2 = BlockHash::from("B2");
        assert_eq!(chain.get_body(&b1).unwrap(), vec![TxId::from("t1"), TxId::from("t2")]);
        assert!(chain.is_tx_successful(&b1, &"t1".into()).unwrap());
        assert!(!chain.is_tx_successful(&b1, &"t2".into()).unwrap());
        assert!(chain.get_body(&b2).unwrap().is_empty());
        assert!(!chain.is_tx_valid(&b2, &"t3".into()).unwrap());
        assert!(chain.is_tx_valid(&b2, &"t1".into()).unwrap());
    }

    #[test]
    fn test_unknown_block_is_an_error() {
        let chain = MemoryChain::new();
        assert!(chain.get_body(&"B9".into()).is_err());
    }

    #[test]
    fn test_failing_validity_only_affects_that_query() {
        let chain = MemoryChain::new().with_block("B1", &[]).with_failing_validity("B1", "t2");

        assert!(chain.is_tx_valid(&"B1".into(), &"t1".into()).unwrap());
        assert!(chain.is_tx_valid(&"B1".into(), &"t2".into()).is_err());
        assert_eq!(chain.queries_for_tx(&"t2".into()).len(), 1);
    }

    #[test]
    fn test_clones_share_logs() {
        let chain = MemoryChain::new().with_block("B1", &["t1"]);
        let clone = chain.clone();

        clone.get_body(&"B1".into()).unwrap();
        clone.is_tx_valid(&"B1".into(), &"t1".into()).unwrap();
        clone.unpin(&["B0".into()]);

        assert_eq!(chain.queries().len(), 2);
        assert_eq!(chain.queries_for_tx(&"t1".into()).len(), 1);
        assert_eq!(chain.unpinned(), vec![BlockHash::from("B0")]);
    }
}
