//! Journal durability tests
//!
//! - Committed documents survive reopening the journal
//! - Rolled back writes never reach the journal
//! - Corrupted or truncated journals are reported, never silently skipped

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use pathdoc::config::StoreConfig;
use pathdoc::document::Node;
use pathdoc::engine::{EngineError, JournalReader, JournaledEngine};
use pathdoc::query::{Query, WhereStatement};
use pathdoc::store::{DocumentStore, StoreError};
use serde_json::json;
use tempfile::TempDir;

// =============================================================================
// Test Utilities
// =============================================================================

fn journal_path(dir: &TempDir) -> PathBuf {
    dir.path().join("data").join("pathdoc.journal")
}

fn open_store(path: &Path) -> DocumentStore<JournaledEngine> {
    let engine = JournaledEngine::open(path).expect("journal opens");
    let mut store = DocumentStore::new(engine);
    store.init_data_structure().expect("schema bootstrap");
    store
}

fn eyes(color: &str) -> Query {
    Query::new().where_and(WhereStatement::eq("person.head.eyes", color))
}

// =============================================================================
// Durability
// =============================================================================

#[test]
fn test_committed_documents_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let path = journal_path(&dir);
    let blue = Node::from(json!({"person": {"head": {"eyes": "blue"}}}));
    let red = Node::from(json!({"person": {"head": {"eyes": "red"}}}));

    let (blue_id, red_id) = {
        let mut store = open_store(&path);
        let blue_id = store.store(&blue).unwrap();
        let red_id = store.store(&red).unwrap();
        (blue_id, red_id)
    };

    let store = open_store(&path);
    assert_eq!(store.search_by_id(&blue_id).unwrap(), Some(blue));
    assert_eq!(store.search_by_id(&red_id).unwrap(), Some(red.clone()));

    let found = store.search_by_query(&eyes("red")).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[&red_id], red);
}

#[test]
fn test_update_and_delete_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let path = journal_path(&dir);

    let (kept, removed) = {
        let mut store = open_store(&path);
        let kept = store.store(&Node::from(json!({"test": 0}))).unwrap();
        let removed = store.store(&Node::from(json!({"test": 0}))).unwrap();
        assert!(store.update(&kept, &Node::from(json!({"test": 1}))).unwrap());
        assert!(store.delete(&removed).unwrap());
        (kept, removed)
    };

    let store = open_store(&path);
    assert_eq!(store.search_by_id(&removed).unwrap(), None);
    assert_eq!(store.count_index_entries(&removed).unwrap(), 0);
    assert_eq!(store.search_by_id(&kept).unwrap(), Some(Node::from(json!({"test": 1}))));

    let zero = Query::new().where_and(WhereStatement::eq("test", 0));
    assert!(store.search_by_query(&zero).unwrap().is_empty());
}

#[test]
fn test_one_journal_record_per_write() {
    let dir = TempDir::new().unwrap();
    let path = journal_path(&dir);
    {
        let mut store = open_store(&path);
        store.store(&Node::from(json!({"a": 1, "b": 2, "c": 3}))).unwrap();
        // unsupported leaf never opens a transaction
        assert!(store.store(&Node::mapping([("f", Node::opaque("socket"))])).is_err());
    }

    let records = JournalReader::open(&path).unwrap().read_all().unwrap();
    // two table creations, one document
    assert_eq!(records.len(), 3);
    assert_eq!(records[2].ops.len(), 4);
    assert!(records.windows(2).all(|w| w[0].sequence + 1 == w[1].sequence));
}

#[test]
fn test_reopen_does_not_recreate_tables() {
    let dir = TempDir::new().unwrap();
    let path = journal_path(&dir);
    drop(open_store(&path));
    drop(open_store(&path));

    let records = JournalReader::open(&path).unwrap().read_all().unwrap();
    assert_eq!(records.len(), 2);
}

#[test]
fn test_open_from_config_file() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("pathdoc.json");
    let journal = dir.path().join("journal.log");
    fs::write(
        &config_path,
        json!({"journal_path": journal, "data_table": "docs", "path_table": "paths"}).to_string(),
    )
    .unwrap();

    let config = StoreConfig::load(&config_path).unwrap();
    let id = {
        let engine = JournaledEngine::open_with_config(&config).unwrap();
        let mut store = DocumentStore::with_config(engine, config.clone()).unwrap();
        store.init_data_structure().unwrap();
        store.store(&Node::from(json!({"k": "v"}))).unwrap()
    };

    let engine = JournaledEngine::open_with_config(&config).unwrap();
    assert_eq!(engine.memory().row_count("docs"), Some(1));
    assert_eq!(engine.memory().row_count("paths"), Some(1));
    let store = DocumentStore::with_config(engine, config).unwrap();
    assert!(store.search_by_id(&id).unwrap().is_some());
}

// =============================================================================
// Corruption
// =============================================================================

#[test]
fn test_flipped_byte_is_reported() {
    let dir = TempDir::new().unwrap();
    let path = journal_path(&dir);
    {
        let mut store = open_store(&path);
        store.store(&Node::from(json!({"a": "b"}))).unwrap();
    }

    let mut bytes = fs::read(&path).unwrap();
    let middle = bytes.len() / 2;
    bytes[middle] ^= 0x20;
    fs::write(&path, &bytes).unwrap();

    let err = JournaledEngine::open(&path).err().expect("corruption must be reported");
    assert!(matches!(err, EngineError::Corruption { .. }));
    assert!(err.is_fatal());

    let wrapped = StoreError::from(err);
    assert!(wrapped.is_fatal());
}

#[test]
fn test_partial_tail_is_reported() {
    let dir = TempDir::new().unwrap();
    let path = journal_path(&dir);
    drop(open_store(&path));

    let mut file = OpenOptions::new().append(true).open(&path).unwrap();
    file.write_all(&[0x10, 0x00]).unwrap();
    drop(file);

    let err = JournaledEngine::open(&path).err().expect("truncation must be reported");
    assert_eq!(err.code(), "PATHDOC_DATA_CORRUPTION");
}
