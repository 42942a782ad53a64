//! Durable engine: a `MemoryEngine` backed by the commit journal
//!
//! Work is applied to memory first and appended to the journal at commit.
//! The journal record is fsynced before `commit` returns; if the append
//! fails the in-memory work is rolled back, so memory never runs ahead of
//! disk.

use std::io;
use std::path::Path;

use chrono::Utc;

use super::errors::{EngineError, EngineResult};
use super::journal::{JournalOp, JournalReader, JournalRecord, JournalWriter};
use super::memory::MemoryEngine;
use super::relational::RelationalStore;
use super::select::SelectQuery;
use super::types::{Row, TableDefinition, Value};
use crate::config::StoreConfig;
use crate::observability::{log_event_with_fields, Event};

/// Relational engine persisted through an append-only journal
pub struct JournaledEngine {
    inner: MemoryEngine,
    writer: JournalWriter,
    /// Operations of the open transaction
    pending: Option<Vec<JournalOp>>,
    next_sequence: u64,
}

impl JournaledEngine {
    /// Opens the journal at `path`, replaying every committed record.
    ///
    /// # Errors
    ///
    /// Returns `PATHDOC_DATA_CORRUPTION` if any record is truncated, fails
    /// its checksum or cannot be replayed.
    pub fn open(path: &Path) -> EngineResult<Self> {
        let mut inner = MemoryEngine::new();
        let mut next_sequence = 1;
        let mut replayed = 0u64;

        if path.exists() {
            let mut reader = JournalReader::open(path)?;
            loop {
                let offset = reader.offset();
                let record = match reader.read_next() {
                    Ok(Some(record)) => record,
                    Ok(None) => break,
                    Err(e) => return Err(report_corruption(path, e)),
                };
                replay(&mut inner, &record)
                    .map_err(|e| {
                        EngineError::corruption(
                            offset,
                            format!("record {} does not replay: {}", record.sequence, e),
                        )
                    })
                    .map_err(|e| report_corruption(path, e))?;
                next_sequence = record.sequence + 1;
                replayed += 1;
            }
        }

        let writer = JournalWriter::open(path)?;
        log_event_with_fields(
            Event::JournalReplayed,
            &[
                ("path", &path.display().to_string()),
                ("records", &replayed.to_string()),
            ],
        );

        Ok(Self {
            inner,
            writer,
            pending: None,
            next_sequence,
        })
    }

    /// Opens the journal named by `config.journal_path`
    pub fn open_with_config(config: &StoreConfig) -> EngineResult<Self> {
        match &config.journal_path {
            Some(path) => Self::open(path),
            None => Err(EngineError::io(
                "journal_path is not configured",
                io::Error::new(io::ErrorKind::InvalidInput, "missing journal_path"),
            )),
        }
    }

    /// In-memory state
    pub fn memory(&self) -> &MemoryEngine {
        &self.inner
    }

    pub fn journal_path(&self) -> &Path {
        self.writer.path()
    }

    /// Sequence number the next committed record receives
    pub fn next_sequence(&self) -> u64 {
        self.next_sequence
    }

    fn append(&mut self, ops: Vec<JournalOp>) -> EngineResult<()> {
        let record = JournalRecord {
            sequence: self.next_sequence,
            committed_at: Utc::now(),
            ops,
        };
        self.writer.append(&record)?;
        self.next_sequence += 1;
        Ok(())
    }

    /// Runs one statement as its own journaled transaction
    fn autocommit<T>(
        &mut self,
        statement: impl FnOnce(&mut MemoryEngine) -> EngineResult<T>,
        op: impl FnOnce(&T) -> Option<JournalOp>,
    ) -> EngineResult<T> {
        self.inner.begin_transaction()?;
        let result = match statement(&mut self.inner) {
            Ok(result) => result,
            Err(e) => {
                self.inner.rollback()?;
                return Err(e);
            }
        };
        if let Some(op) = op(&result) {
            if let Err(e) = self.append(vec![op]) {
                self.inner.rollback()?;
                return Err(e);
            }
        }
        self.inner.commit()?;
        Ok(result)
    }

    fn record(&mut self, op: JournalOp) {
        if let Some(pending) = self.pending.as_mut() {
            pending.push(op);
        }
    }
}

fn report_corruption(path: &Path, error: EngineError) -> EngineError {
    if let EngineError::Corruption { offset, reason } = &error {
        log_event_with_fields(
            Event::JournalCorruption,
            &[
                ("offset", &offset.to_string()),
                ("path", &path.display().to_string()),
                ("reason", reason),
            ],
        );
    }
    error
}

fn replay(engine: &mut MemoryEngine, record: &JournalRecord) -> EngineResult<()> {
    engine.begin_transaction()?;
    for op in &record.ops {
        if let Err(e) = apply(engine, op) {
            engine.rollback()?;
            return Err(e);
        }
    }
    engine.commit()
}

fn apply(engine: &mut MemoryEngine, op: &JournalOp) -> EngineResult<()> {
    fn borrowed(pairs: &[(String, Value)]) -> Vec<(&str, Value)> {
        pairs.iter().map(|(c, v)| (c.as_str(), v.clone())).collect()
    }

    match op {
        JournalOp::CreateTable { definition } => engine.ensure_table_exists(definition).map(|_| ()),
        JournalOp::Insert { table, values } => engine.insert_row(table, &borrowed(values)),
        JournalOp::Delete { table, matches } => engine.delete_rows(table, &borrowed(matches)).map(|_| ()),
    }
}

impl RelationalStore for JournaledEngine {
    fn begin_transaction(&mut self) -> EngineResult<()> {
        self.inner.begin_transaction()?;
        self.pending = Some(Vec::new());
        Ok(())
    }

    fn commit(&mut self) -> EngineResult<()> {
        let ops = self.pending.take().ok_or(EngineError::NoActiveTransaction)?;
        if !ops.is_empty() {
            if let Err(e) = self.append(ops) {
                self.inner.rollback()?;
                return Err(e);
            }
        }
        self.inner.commit()
    }

    fn rollback(&mut self) -> EngineResult<()> {
        self.pending = None;
        self.inner.rollback()
    }

    fn in_transaction(&self) -> bool {
        self.inner.in_transaction()
    }

    fn insert_row(&mut self, table: &str, values: &[(&str, Value)]) -> EngineResult<()> {
        if self.in_transaction() {
            self.inner.insert_row(table, values)?;
            self.record(JournalOp::insert(table, values));
            return Ok(());
        }
        self.autocommit(
            |inner| inner.insert_row(table, values),
            |_| Some(JournalOp::insert(table, values)),
        )
    }

    fn delete_rows(&mut self, table: &str, matches: &[(&str, Value)]) -> EngineResult<usize> {
        if self.in_transaction() {
            let deleted = self.inner.delete_rows(table, matches)?;
            if deleted > 0 {
                self.record(JournalOp::delete(table, matches));
            }
            return Ok(deleted);
        }
        self.autocommit(
            |inner| inner.delete_rows(table, matches),
            |deleted| (*deleted > 0).then(|| JournalOp::delete(table, matches)),
        )
    }

    fn execute_query(&self, query: &SelectQuery) -> EngineResult<Vec<Row>> {
        self.inner.execute_query(query)
    }

    fn ensure_table_exists(&mut self, definition: &TableDefinition) -> EngineResult<bool> {
        if self.in_transaction() {
            let created = self.inner.ensure_table_exists(definition)?;
            if created {
                self.record(JournalOp::CreateTable {
                    definition: definition.clone(),
                });
            }
            return Ok(created);
        }
        self.autocommit(
            |inner| inner.ensure_table_exists(definition),
            |created| {
                created.then(|| JournalOp::CreateTable {
                    definition: definition.clone(),
                })
            },
        )
    }
}
