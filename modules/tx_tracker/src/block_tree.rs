//! Block tree data structure for tracking unfinalized chain forks.
//!
//! Blocks are indexed by hash; parent and child links are hashes into the
//! same table, never direct references.

use std::collections::HashMap;

use tracing::debug;
use txwatch_common::{BlockHash, TxId};

use crate::tracker_error::TxTrackerError;
use crate::tree_block::TreeBlock;

/// All blocks observed since the last finalized block.
///
/// Operations are single-threaded; the owning tracker handles ordering.
#[derive(Debug, Default)]
pub struct BlockTree {
    /// All blocks keyed by hash.
    blocks: HashMap<BlockHash, TreeBlock>,
    /// Root of the tree (oldest retained block).
    root: Option<BlockHash>,
}

impl BlockTree {
    /// Create a new empty block tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the root of the tree (the starting point of the event stream).
    ///
    /// The root has no parent and its body is never fetched.
    pub fn set_root(&mut self, hash: BlockHash) {
        self.blocks.insert(hash.clone(), TreeBlock::new(hash.clone(), None));
        self.root = Some(hash);
    }

    /// Returns a reference to the block with the given hash, if present.
    pub fn get_block(&self, hash: &BlockHash) -> Option<&TreeBlock> {
        self.blocks.get(hash)
    }

    /// Returns true if the block is in the tree.
    pub fn contains(&self, hash: &BlockHash) -> bool {
        self.blocks.contains_key(hash)
    }

    /// Returns the root hash, if the tree is non-empty.
    pub fn root(&self) -> Option<&BlockHash> {
        self.root.as_ref()
    }

    /// Returns the number of blocks in the tree.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Returns true if the tree has no blocks.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Insert a block below an existing parent.
    ///
    /// Returns `Ok(false)` without touching the tree if the block is
    /// already known with the same parent.
    pub fn insert(&mut self, hash: BlockHash, parent: BlockHash) -> Result<bool, TxTrackerError> {
        if let Some(existing) = self.blocks.get(&hash) {
            // Compare against the announced parent: re-rooting clears
            // `parent` but a re-offer of the root is still a duplicate
            return match &existing.announced_parent {
                Some(known) if *known == parent => Ok(false),
                _ => Err(TxTrackerError::ConflictingParent { hash, got: parent }),
            };
        }

        let parent_block = self
            .blocks
            .get_mut(&parent)
            .ok_or_else(|| TxTrackerError::ParentNotFound {
                hash: parent.clone(),
            })?;
        parent_block.children.push(hash.clone());

        self.blocks.insert(hash.clone(), TreeBlock::new(hash, Some(parent)));
        Ok(true)
    }

    /// Parent of the given block; `None` for the root or an unknown hash.
    pub fn parent_of(&self, hash: &BlockHash) -> Option<&BlockHash> {
        self.blocks.get(hash).and_then(|b| b.parent.as_ref())
    }

    /// Children of the given block in observation order; empty for an
    /// unknown hash.
    pub fn children_of(&self, hash: &BlockHash) -> &[BlockHash] {
        self.blocks.get(hash).map(|b| b.children.as_slice()).unwrap_or_default()
    }

    /// Every block below `hash`, skipping the whole subtree rooted at
    /// `excluded_child`.
    ///
    /// Pure: walks the tree without modifying it. Order is depth-first,
    /// children visited in observation order.
    pub fn descendants_excluding(
        &self,
        hash: &BlockHash,
        excluded_child: Option<&BlockHash>,
    ) -> Vec<BlockHash> {
        let mut result = Vec::new();
        let mut stack: Vec<&BlockHash> = self
            .children_of(hash)
            .iter()
            .rev()
            .filter(|child| Some(*child) != excluded_child)
            .collect();

        while let Some(h) = stack.pop() {
            result.push(h.clone());
            stack.extend(self.children_of(h).iter().rev());
        }
        result
    }

    /// Returns the block body, fetching it with `fetch` on first use.
    ///
    /// The fetched body is cached on the block, so `fetch` runs at most
    /// once per block.
    pub fn body_or_fetch<F>(
        &mut self,
        hash: &BlockHash,
        fetch: F,
    ) -> Result<&[TxId], TxTrackerError>
    where
        F: FnOnce(&BlockHash) -> Result<Vec<TxId>, TxTrackerError>,
    {
        let block = self
            .blocks
            .get_mut(hash)
            .ok_or_else(|| TxTrackerError::BlockNotInTree { hash: hash.clone() })?;

        if block.body.is_none() {
            let body = fetch(hash)?;
            debug!(hash = %hash, txs = body.len(), "fetched block body");
            block.body = Some(body);
        }
        Ok(block.body.as_deref().unwrap_or_default())
    }

    /// Remove a single block.
    ///
    /// The block is unlinked from its parent if the parent is still
    /// present. Children are left as they are; the caller removes them or
    /// re-roots the tree.
    pub fn remove(&mut self, hash: &BlockHash) -> Option<TreeBlock> {
        let block = self.blocks.remove(hash)?;
        if let Some(parent) = block.parent.as_ref().and_then(|p| self.blocks.get_mut(p)) {
            parent.children.retain(|h| h != hash);
        }
        if self.root.as_ref() == Some(hash) {
            self.root = None;
        }
        Some(block)
    }

    /// Make an existing block the root, clearing its parent link.
    ///
    /// The announced parent is kept, so the block can still be recognised
    /// if it is announced again.
    pub fn reroot(&mut self, hash: &BlockHash) -> Result<(), TxTrackerError> {
        let block = self
            .blocks
            .get_mut(hash)
            .ok_or_else(|| TxTrackerError::BlockNotInTree { hash: hash.clone() })?;
        block.parent = None;
        self.root = Some(hash.clone());
        Ok(())
    }
}
