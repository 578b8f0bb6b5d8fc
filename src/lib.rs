//! Tamper-evident ticket ledger.
//!
//! An append-only chain of hash-linked blocks records every issued ticket;
//! a registry layer on top enforces ticket-id uniqueness and answers
//! verification queries through maintained indexes instead of chain scans.
//!
//! ```
//! use ticketchain::registry::Registry;
//!
//! let mut ledger = Registry::new();
//! ledger.initialize().unwrap();
//! let block = ledger
//!     .issue(Some("TKT-001".into()), "Alice", vec![("event".into(), "EventA".into())])
//!     .unwrap();
//! assert!(ledger.find_by_ticket_id("TKT-001").is_some());
//! assert!(ledger.check_integrity().ok);
//! assert_eq!(block.index, 1);
//! ```

pub mod block;
pub mod chain;
pub mod error;
pub mod persist;
pub mod registry;
pub mod ticket;
