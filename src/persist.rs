//! JSON snapshot persistence for the ledger.
//!
//! The snapshot is exactly the exported chain (genesis-first block array);
//! both indexes are rebuilt on load rather than persisted.

use crate::block::Block;
use crate::chain::Chain;
use crate::error::Result;
use crate::registry::Registry;
use log::info;
use std::fs;
use std::path::Path;

/// Write the full chain to `path` as pretty-printed JSON.
pub fn save(registry: &Registry, path: &Path) -> Result<()> {
    let blocks: Vec<&Block> = registry.list_chain().collect();
    let data = serde_json::to_vec_pretty(&blocks)?;
    fs::write(path, data)?;
    Ok(())
}

/// Load a snapshot and rebuild the registry indexes from it.
pub fn load(path: &Path) -> Result<Registry> {
    let data = fs::read(path)?;
    let blocks: Vec<Block> = serde_json::from_slice(&data)?;
    let registry = Registry::from_chain(Chain::from_blocks(blocks));
    info!(
        "loaded ledger from {} ({} blocks)",
        path.display(),
        registry.chain().len()
    );
    Ok(registry)
}

/// Load an existing snapshot, or start a freshly initialized ledger if none
/// exists yet.
pub fn load_or_init(path: &Path) -> Result<Registry> {
    if path.exists() {
        load(path)
    } else {
        let mut registry = Registry::new();
        registry.initialize()?;
        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot_path(tmp: &tempfile::TempDir) -> std::path::PathBuf {
        tmp.path().join("ledger.json")
    }

    #[test]
    fn round_trip_preserves_chain_and_indexes() {
        let tmp = tempfile::tempdir().unwrap();
        let path = snapshot_path(&tmp);

        let mut registry = Registry::new();
        registry.initialize().unwrap();
        registry
            .issue(
                Some("TKT-001".into()),
                "Alice",
                vec![("event".into(), "EventA".into())],
            )
            .unwrap();
        registry.issue(Some("TKT-002".into()), "Bob", vec![]).unwrap();
        save(&registry, &path).unwrap();

        let reloaded = load(&path).unwrap();
        assert_eq!(reloaded.chain().len(), 3);
        assert!(reloaded.check_integrity().ok);
        let found = reloaded.find_by_ticket_id("TKT-001").unwrap();
        assert_eq!(found.transaction.buyer, "Alice");
        assert_eq!(reloaded.find_by_buyer("bob").len(), 1);
    }

    #[test]
    fn load_or_init_creates_genesis() {
        let tmp = tempfile::tempdir().unwrap();
        let registry = load_or_init(&snapshot_path(&tmp)).unwrap();
        assert_eq!(registry.chain().len(), 1);
        assert!(registry.check_integrity().ok);
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(load(&snapshot_path(&tmp)).is_err());
    }

    #[test]
    fn duplicate_survives_reload() {
        let tmp = tempfile::tempdir().unwrap();
        let path = snapshot_path(&tmp);

        let mut registry = Registry::new();
        registry.initialize().unwrap();
        registry.issue(Some("TKT-001".into()), "Alice", vec![]).unwrap();
        save(&registry, &path).unwrap();

        let mut reloaded = load(&path).unwrap();
        assert!(reloaded
            .issue(Some("TKT-001".into()), "Bob", vec![])
            .is_err());
    }
}
