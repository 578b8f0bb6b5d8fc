use crate::error::Result;
use crate::ticket::Transaction;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// SHA-256 hash as hex string, linking each block to its predecessor.
pub type BlockHash = String;

/// Sentinel `previous_hash` for the genesis block.
pub const GENESIS_PREVIOUS_HASH: &str = "0";

/// One immutable, hash-linked record in the ledger.
///
/// The `content_hash` covers all other fields; recomputing it from the
/// block's own fields must always reproduce the stored value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Block {
    /// Position in the chain (0 = genesis).
    pub index: u64,
    /// When the block was created; non-decreasing across the chain.
    pub timestamp: DateTime<Utc>,
    /// The ticket transaction (or the genesis sentinel at index 0).
    pub transaction: Transaction,
    /// `content_hash` of the block at `index - 1`, `"0"` for genesis.
    pub previous_hash: BlockHash,
    /// SHA-256 hex digest over (index, timestamp, payload, previous_hash).
    pub content_hash: BlockHash,
}

impl Block {
    /// Create a new block. The `content_hash` is computed from all other fields.
    pub fn new(index: u64, transaction: Transaction, previous_hash: BlockHash) -> Result<Self> {
        Self::with_timestamp(index, transaction, previous_hash, Utc::now())
    }

    /// Create a block with an explicit timestamp (for clamping / determinism).
    pub fn with_timestamp(
        index: u64,
        transaction: Transaction,
        previous_hash: BlockHash,
        timestamp: DateTime<Utc>,
    ) -> Result<Self> {
        let content_hash = compute_content_hash(index, &timestamp, &transaction, &previous_hash)?;
        Ok(Self {
            index,
            timestamp,
            transaction,
            previous_hash,
            content_hash,
        })
    }

    /// The fixed first block anchoring the chain.
    pub fn genesis() -> Result<Self> {
        Self::new(0, Transaction::genesis(), GENESIS_PREVIOUS_HASH.into())
    }

    /// Recompute the digest from the block's own fields and compare.
    pub fn verify(&self) -> bool {
        compute_content_hash(
            self.index,
            &self.timestamp,
            &self.transaction,
            &self.previous_hash,
        )
        .map(|h| h == self.content_hash)
        .unwrap_or(false)
    }
}

/// Digest over the block header fields, with the payload in canonical
/// (sorted-key) JSON so semantically-equal payloads hash identically.
pub fn compute_content_hash(
    index: u64,
    timestamp: &DateTime<Utc>,
    transaction: &Transaction,
    previous_hash: &str,
) -> Result<BlockHash> {
    let payload = format!(
        "index:{}\ntime:{}\ntx:{}\nprev:{}",
        index,
        timestamp.to_rfc3339(),
        transaction.canonical_json()?,
        previous_hash,
    );
    Ok(compute_hash(payload.as_bytes()))
}

/// Compute the SHA-256 hex digest of some data.
pub fn compute_hash(data: &[u8]) -> BlockHash {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn genesis_anchors_chain() {
        let g = Block::genesis().unwrap();
        assert_eq!(g.index, 0);
        assert_eq!(g.previous_hash, GENESIS_PREVIOUS_HASH);
        assert!(g.verify());
    }

    #[test]
    fn hash_is_deterministic() {
        let ts = Utc::now();
        let tx = Transaction::new("TKT-1", "Alice");
        let b1 = Block::with_timestamp(1, tx.clone(), "abc".into(), ts).unwrap();
        let b2 = Block::with_timestamp(1, tx, "abc".into(), ts).unwrap();
        assert_eq!(b1.content_hash, b2.content_hash);
    }

    #[test]
    fn payload_field_order_does_not_matter() {
        let ts = Utc::now();
        let mut tx1 = Transaction::new("TKT-1", "Alice");
        tx1.set_field("seat", "A1");
        tx1.set_field("event", "EventA");
        let mut tx2 = Transaction::new("TKT-1", "Alice");
        tx2.set_field("event", "EventA");
        tx2.set_field("seat", "A1");

        let b1 = Block::with_timestamp(1, tx1, "abc".into(), ts).unwrap();
        let b2 = Block::with_timestamp(1, tx2, "abc".into(), ts).unwrap();
        assert_eq!(b1.content_hash, b2.content_hash);
    }

    #[test]
    fn tampered_block_fails_verify() {
        let mut b = Block::new(1, Transaction::new("TKT-1", "Alice"), "abc".into()).unwrap();
        assert!(b.verify());
        b.transaction = Transaction::new("TKT-1", "Mallory");
        assert!(!b.verify());
    }

    #[test]
    fn any_field_change_changes_hash() {
        let ts = Utc::now();
        let tx = Transaction::new("TKT-1", "Alice");
        let base = Block::with_timestamp(1, tx.clone(), "abc".into(), ts).unwrap();
        let other_index = Block::with_timestamp(2, tx.clone(), "abc".into(), ts).unwrap();
        let other_prev = Block::with_timestamp(1, tx, "def".into(), ts).unwrap();
        assert_ne!(base.content_hash, other_index.content_hash);
        assert_ne!(base.content_hash, other_prev.content_hash);
    }
}
