use crate::error::Result;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Ticket id of the genesis sentinel payload.
pub const GENESIS_TICKET_ID: &str = "GENESIS";

/// Bounded attempts for random id generation before the time-derived fallback.
const MAX_ID_ATTEMPTS: usize = 10;

/// A ticket-issuance payload stored inside a block.
///
/// `ticket_id` and `buyer` are the fixed required fields; everything
/// descriptive (event, city, date, seat, price, perks…) lives in the open
/// `fields` map. A `BTreeMap` keeps serialization sorted-key deterministic,
/// so hashing never depends on insertion order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Transaction {
    /// Opaque token, globally unique among non-genesis blocks. Exact-match,
    /// case-sensitive.
    pub ticket_id: String,
    /// Buyer name and/or email; not required unique.
    pub buyer: String,
    /// Open extension map for descriptive fields.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, String>,
}

impl Transaction {
    /// Create a transaction with no descriptive fields.
    pub fn new(ticket_id: impl Into<String>, buyer: impl Into<String>) -> Self {
        Self {
            ticket_id: ticket_id.into(),
            buyer: buyer.into(),
            fields: BTreeMap::new(),
        }
    }

    /// The sentinel payload of the genesis block.
    pub fn genesis() -> Self {
        let mut tx = Self::new(GENESIS_TICKET_ID, "SYSTEM");
        tx.set_field("note", "genesis");
        tx
    }

    /// Set a descriptive field.
    pub fn set_field(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(key.into(), value.into());
    }

    /// Get a descriptive field.
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// True for the index-0 sentinel payload.
    pub fn is_genesis(&self) -> bool {
        self.ticket_id == GENESIS_TICKET_ID
    }

    /// Canonical sorted-key JSON used for content hashing. Identical for
    /// semantically-equal payloads regardless of field insertion order.
    pub fn canonical_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Normalize a buyer identity for searching: trim surrounding whitespace and
/// lowercase. Buyer names are human-entered, so matching is forgiving.
pub fn normalize_buyer(identity: &str) -> String {
    identity.trim().to_lowercase()
}

/// Generate a ticket id of the form `PREFIX-XXXXX`.
///
/// The prefix derives from the caller-supplied hint (e.g. an artist or event
/// name), the token from a random UUID. `is_taken` is consulted on each
/// attempt; after [`MAX_ID_ATTEMPTS`] collisions the token falls back to a
/// time-derived suffix, guaranteeing termination. The fallback is checked
/// against `is_taken` as well, widening to microsecond precision on a clash.
pub fn generate_ticket_id(hint: Option<&str>, is_taken: impl Fn(&str) -> bool) -> String {
    let prefix = id_prefix(hint);
    for _ in 0..MAX_ID_ATTEMPTS {
        let token: String = Uuid::new_v4()
            .simple()
            .to_string()
            .chars()
            .take(5)
            .collect::<String>()
            .to_uppercase();
        let candidate = format!("{}-{}", prefix, token);
        if !is_taken(&candidate) {
            return candidate;
        }
    }
    let fallback = format!("{}-{}", prefix, Utc::now().timestamp());
    if !is_taken(&fallback) {
        return fallback;
    }
    format!("{}-{}", prefix, Utc::now().timestamp_micros())
}

fn id_prefix(hint: Option<&str>) -> String {
    let letters: String = hint
        .unwrap_or("")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(3)
        .collect::<String>()
        .to_uppercase();
    if letters.is_empty() {
        "TKT".into()
    } else {
        letters
    }
}
