use crate::block::{Block, GENESIS_PREVIOUS_HASH};
use crate::error::{LedgerError, Result};
use crate::ticket::Transaction;
use chrono::Utc;

/// Append-only, hash-linked sequence of blocks.
///
/// The chain owns all blocks exclusively. Blocks are created exactly once, at
/// append time, and never mutated or deleted; the chain only grows.
#[derive(Debug, Default)]
pub struct Chain {
    blocks: Vec<Block>,
}

/// Result of a full-chain integrity scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrityReport {
    /// True when every block recomputes to its stored hash and every link holds.
    pub ok: bool,
    /// Index of the first block that failed, when `ok` is false.
    pub first_broken_index: Option<u64>,
}

impl IntegrityReport {
    fn intact() -> Self {
        Self {
            ok: true,
            first_broken_index: None,
        }
    }

    fn broken_at(index: u64) -> Self {
        Self {
            ok: false,
            first_broken_index: Some(index),
        }
    }
}

impl std::fmt::Display for IntegrityReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.first_broken_index {
            None => write!(f, "chain intact"),
            Some(i) => write!(f, "chain broken at block {}", i),
        }
    }
}

impl Chain {
    /// Create an empty, uninitialized chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the genesis block. Fails with `AlreadyInitialized` if the chain
    /// already has one.
    pub fn initialize(&mut self) -> Result<&Block> {
        if !self.blocks.is_empty() {
            return Err(LedgerError::AlreadyInitialized);
        }
        self.blocks.push(Block::genesis()?);
        Ok(&self.blocks[0])
    }

    /// Rebuild a chain from previously exported blocks (persistence load).
    /// Blocks are ordered by index; integrity is the caller's check to run.
    pub fn from_blocks(mut blocks: Vec<Block>) -> Self {
        blocks.sort_by_key(|b| b.index);
        Self { blocks }
    }

    pub fn is_initialized(&self) -> bool {
        !self.blocks.is_empty()
    }

    /// Append a new block wrapping `transaction`, linked to the current tip.
    ///
    /// Performs no uniqueness or payload validation — that is the registry's
    /// job. Fails with `EmptyChain` before `initialize`. The timestamp is
    /// clamped to the predecessor's so the chain stays non-decreasing.
    pub fn append(&mut self, transaction: Transaction) -> Result<Block> {
        let last = self.last_block()?;
        let timestamp = Utc::now().max(last.timestamp);
        let block = Block::with_timestamp(
            self.blocks.len() as u64,
            transaction,
            last.content_hash.clone(),
            timestamp,
        )?;
        self.blocks.push(block.clone());
        Ok(block)
    }

    /// The most recently appended block.
    pub fn last_block(&self) -> Result<&Block> {
        self.blocks.last().ok_or(LedgerError::EmptyChain)
    }

    /// Look up a block by index.
    pub fn get(&self, index: u64) -> Option<&Block> {
        self.blocks.get(index as usize)
    }

    /// Number of blocks, genesis included.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Lazy, restartable iteration in ascending index order.
    pub fn iter(&self) -> impl Iterator<Item = &Block> {
        self.blocks.iter()
    }

    /// Recompute every block's hash and check every link, returning the first
    /// mismatch found. Pure scan, no side effects, never fails for data
    /// reasons.
    pub fn verify_integrity(&self) -> IntegrityReport {
        for (i, block) in self.blocks.iter().enumerate() {
            let i = i as u64;
            if block.index != i || !block.verify() {
                return IntegrityReport::broken_at(i);
            }
            let link_ok = match i {
                0 => block.previous_hash == GENESIS_PREVIOUS_HASH,
                _ => block.previous_hash == self.blocks[i as usize - 1].content_hash,
            };
            if !link_ok {
                return IntegrityReport::broken_at(i);
            }
        }
        IntegrityReport::intact()
    }
}
