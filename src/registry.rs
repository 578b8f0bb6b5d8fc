use crate::block::Block;
use crate::chain::{Chain, IntegrityReport};
use crate::error::{LedgerError, Result};
use crate::ticket::{generate_ticket_id, normalize_buyer, Transaction};
use log::{info, warn};
use std::collections::BTreeMap;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Indexing layer over a [`Chain`]: enforces ticket-id uniqueness at issuance
/// and answers lookups without re-scanning the chain per query.
///
/// The registry holds only derived, rebuildable index structures; the chain
/// remains the authoritative record.
#[derive(Debug, Default)]
pub struct Registry {
    chain: Chain,
    /// ticket_id → block index. At most one entry per id.
    by_ticket: HashMap<String, u64>,
    /// normalized buyer identity → block indices, ascending.
    by_buyer: HashMap<String, Vec<u64>>,
}

impl Registry {
    /// Create a registry over an empty, uninitialized chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the genesis block. Fails with `AlreadyInitialized` on a second
    /// call; the genesis sentinel is never indexed.
    pub fn initialize(&mut self) -> Result<()> {
        self.chain.initialize()?;
        Ok(())
    }

    /// Adopt a previously exported chain and rebuild both indexes from it.
    pub fn from_chain(chain: Chain) -> Self {
        let mut registry = Self {
            chain,
            ..Self::default()
        };
        registry.rebuild_index();
        registry
    }

    /// Issue a ticket: uniqueness check, append, index update — one critical
    /// section under `&mut self`.
    ///
    /// With `ticket_id: None` an id is generated from the event hint with a
    /// bounded collision-retry loop. An explicit id that is already indexed
    /// fails with `DuplicateTicket`; the chain is left exactly as it was.
    pub fn issue(
        &mut self,
        ticket_id: Option<String>,
        buyer: &str,
        fields: impl IntoIterator<Item = (String, String)>,
    ) -> Result<Block> {
        let fields: BTreeMap<String, String> = fields.into_iter().collect();
        let ticket_id = match ticket_id {
            Some(id) => id,
            None => {
                let hint = fields.get("event").or_else(|| fields.get("artist"));
                generate_ticket_id(hint.map(String::as_str), |candidate| {
                    self.by_ticket.contains_key(candidate)
                })
            }
        };
        // Covers generated ids too: the index is never silently overwritten.
        if self.by_ticket.contains_key(&ticket_id) {
            return Err(LedgerError::DuplicateTicket(ticket_id));
        }

        let mut transaction = Transaction::new(ticket_id, buyer);
        transaction.fields = fields;
        let block = self.chain.append(transaction)?;
        self.index_block(&block);
        info!(
            "issued ticket {} to {} (block {})",
            block.transaction.ticket_id, block.transaction.buyer, block.index
        );
        Ok(block)
    }

    /// True if a ticket id is already indexed.
    pub fn contains_ticket(&self, ticket_id: &str) -> bool {
        self.by_ticket.contains_key(ticket_id)
    }

    /// The unique block holding this ticket, if issued. Exact-match,
    /// case-sensitive: ticket ids are opaque tokens.
    pub fn find_by_ticket_id(&self, ticket_id: &str) -> Option<&Block> {
        self.by_ticket
            .get(ticket_id)
            .and_then(|&i| self.chain.get(i))
    }

    /// All blocks whose buyer matches, compared case-insensitively after
    /// trimming. May be empty.
    pub fn find_by_buyer(&self, identity: &str) -> Vec<&Block> {
        self.by_buyer
            .get(&normalize_buyer(identity))
            .map(|indices| indices.iter().filter_map(|&i| self.chain.get(i)).collect())
            .unwrap_or_default()
    }

    /// Reconstruct both indexes from a full chain scan. Idempotent; yields
    /// the same contents the incremental path maintains.
    pub fn rebuild_index(&mut self) {
        self.by_ticket.clear();
        self.by_buyer.clear();
        // Genesis is positional, not name-based: a caller-chosen id that
        // happens to equal the sentinel is still a real ticket.
        let indexed: Vec<Block> = self.chain.iter().filter(|b| b.index != 0).cloned().collect();
        for block in &indexed {
            self.index_block(block);
        }
    }

    /// Read-only view of the full chain, genesis-first.
    pub fn list_chain(&self) -> impl Iterator<Item = &Block> {
        self.chain.iter()
    }

    /// The underlying ledger store.
    pub fn chain(&self) -> &Chain {
        &self.chain
    }

    /// Full-chain integrity scan; a broken link is fatal to trust in the
    /// ledger and is never repaired automatically.
    pub fn check_integrity(&self) -> IntegrityReport {
        let report = self.chain.verify_integrity();
        if let Some(i) = report.first_broken_index {
            warn!("ledger integrity violation at block {}", i);
        }
        report
    }

    /// Summary counters for status displays.
    pub fn stats(&self) -> LedgerStats {
        LedgerStats {
            block_count: self.chain.len(),
            ticket_count: self.by_ticket.len(),
            buyer_count: self.by_buyer.len(),
        }
    }

    fn index_block(&mut self, block: &Block) {
        self.by_ticket
            .insert(block.transaction.ticket_id.clone(), block.index);
        self.by_buyer
            .entry(normalize_buyer(&block.transaction.buyer))
            .or_default()
            .push(block.index);
    }
}

/// Ledger summary counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerStats {
    pub block_count: usize,
    pub ticket_count: usize,
    pub buyer_count: usize,
}

impl std::fmt::Display for LedgerStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Blocks:  {}", self.block_count)?;
        writeln!(f, "Tickets: {}", self.ticket_count)?;
        writeln!(f, "Buyers:  {}", self.buyer_count)?;
        Ok(())
    }
}

/// Thread-safe handle over a [`Registry`].
///
/// One writer at a time: `issue` holds the write lock across the uniqueness
/// check, append, and index update, so a racing writer observes the earlier
/// writer's committed id. Readers share the read lock and see a consistent
/// snapshot; blocks come out as owned clones.
#[derive(Clone, Default)]
pub struct SharedRegistry {
    inner: Arc<RwLock<Registry>>,
}

impl SharedRegistry {
    pub fn new(registry: Registry) -> Self {
        Self {
            inner: Arc::new(RwLock::new(registry)),
        }
    }

    pub fn initialize(&self) -> Result<()> {
        self.write().initialize()
    }

    pub fn issue(
        &self,
        ticket_id: Option<String>,
        buyer: &str,
        fields: impl IntoIterator<Item = (String, String)>,
    ) -> Result<Block> {
        self.write().issue(ticket_id, buyer, fields)
    }

    pub fn find_by_ticket_id(&self, ticket_id: &str) -> Option<Block> {
        self.read().find_by_ticket_id(ticket_id).cloned()
    }

    pub fn find_by_buyer(&self, identity: &str) -> Vec<Block> {
        self.read()
            .find_by_buyer(identity)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn list_chain(&self) -> Vec<Block> {
        self.read().list_chain().cloned().collect()
    }

    pub fn check_integrity(&self) -> IntegrityReport {
        self.read().check_integrity()
    }

    pub fn stats(&self) -> LedgerStats {
        self.read().stats()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Registry> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Registry> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }
}
