//! Document store over a relational engine

use std::collections::BTreeMap;
use std::fmt;

use super::errors::{StoreError, StoreResult};
use super::schema::{
    StoreSchema, DATA_ALIAS, DATA_COLUMN, DATA_ID_COLUMN, ID_COLUMN, PATH_ALIAS, PATH_COLUMN, VALUE_COLUMN,
};
use crate::config::{ConfigError, StoreConfig};
use crate::document::{BlobCodec, JsonCodec, Node};
use crate::engine::{
    ColumnRef, EngineResult, Expr, Join, Operand, ParameterBindings, RelationalStore, Row, SelectQuery, TableRef,
    Value,
};
use crate::flatten::{flatten_all, IndexEntry};
use crate::ids::{IdGenerator, UuidGenerator};
use crate::observability::{log_event_with_fields, Event, Logger, MetricsRegistry};
use crate::query::Query;
use crate::translate::QueryTranslator;

/// Identity of a stored document
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for DocumentId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for DocumentId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Column/value pairs of one path table row
type IndexRow = [(&'static str, Value); 4];

/// Stores documents as blobs plus one index row per flattened leaf.
///
/// Every write is a single engine transaction: either the blob and all of
/// its index rows are committed, or nothing is.
pub struct DocumentStore<E, C = JsonCodec, G = UuidGenerator> {
    engine: E,
    codec: C,
    ids: G,
    schema: StoreSchema,
    translator: QueryTranslator,
    config: StoreConfig,
    metrics: MetricsRegistry,
}

impl<E: RelationalStore> DocumentStore<E> {
    /// Store with default configuration, JSON blobs and UUID identities
    pub fn new(engine: E) -> Self {
        Self::assemble(engine, JsonCodec, UuidGenerator, StoreConfig::default())
    }

    /// Store with validated configuration, JSON blobs and UUID identities
    pub fn with_config(engine: E, config: StoreConfig) -> Result<Self, ConfigError> {
        Self::with_parts(engine, JsonCodec, UuidGenerator, config)
    }
}

impl<E: RelationalStore, C: BlobCodec, G: IdGenerator> DocumentStore<E, C, G> {
    /// Store with every collaborator supplied.
    ///
    /// Validates `config` and applies its log level. The log threshold is
    /// process-wide, so the most recently constructed store sets it for
    /// every store in the process.
    pub fn with_parts(engine: E, codec: C, ids: G, config: StoreConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Logger::set_min_severity(config.log_severity()?);
        Ok(Self::assemble(engine, codec, ids, config))
    }

    fn assemble(engine: E, codec: C, ids: G, config: StoreConfig) -> Self {
        Self {
            engine,
            codec,
            ids,
            schema: StoreSchema::from_config(&config),
            translator: QueryTranslator::for_path_table(PATH_ALIAS),
            config,
            metrics: MetricsRegistry::new(),
        }
    }

    /// Creates both store tables unless they exist
    pub fn init_data_structure(&mut self) -> StoreResult<()> {
        for definition in self.schema.definitions() {
            let created = self.engine.ensure_table_exists(&definition)?;
            log_event_with_fields(
                Event::SchemaEnsured,
                &[("created", &created.to_string()), ("table", &definition.name)],
            );
        }
        Ok(())
    }

    /// Stores a new document under a fresh identity.
    ///
    /// # Errors
    ///
    /// - `UnsupportedLeafType` if the document holds an opaque value; the
    ///   engine is not touched
    /// - `TransactionFailure` if any write fails; nothing is persisted
    pub fn store(&mut self, document: &Node) -> StoreResult<DocumentId> {
        let entries = flatten_all(document)?;
        let blob = self.codec.encode(document)?;
        let id = DocumentId::new(self.ids.next_id());
        let rows = self.index_rows(&id, &entries);

        let schema = &self.schema;
        transact(&mut self.engine, &self.metrics, "store", &id, |engine| {
            insert_document(engine, schema, &id, blob, &rows)
        })?;

        self.metrics.increment_documents_stored();
        self.metrics.add_index_entries(rows.len() as u64);
        log_event_with_fields(
            Event::DocumentStored,
            &[("entries", &rows.len().to_string()), ("id", id.as_str())],
        );
        Ok(id)
    }

    /// Replaces the document and its index rows, keeping its identity.
    ///
    /// Whatever is held under `id` is deleted and the document written as
    /// `store` would; an unknown identity is simply created. Always
    /// `Ok(true)` once committed.
    ///
    /// # Errors
    ///
    /// Same as `store`; on failure the previous version is left intact.
    pub fn update(&mut self, id: &DocumentId, document: &Node) -> StoreResult<bool> {
        let entries = flatten_all(document)?;
        let blob = self.codec.encode(document)?;
        let rows = self.index_rows(id, &entries);

        let schema = &self.schema;
        transact(&mut self.engine, &self.metrics, "update", id, |engine| {
            let key = [(ID_COLUMN, Value::from(id.as_str()))];
            let owned = [(DATA_ID_COLUMN, Value::from(id.as_str()))];
            engine.delete_rows(schema.data_table(), &key)?;
            // Cascade normally leaves nothing here
            engine.delete_rows(schema.path_table(), &owned)?;
            insert_document(engine, schema, id, blob, &rows)
        })?;

        self.metrics.increment_documents_updated();
        self.metrics.add_index_entries(rows.len() as u64);
        log_event_with_fields(
            Event::DocumentUpdated,
            &[("entries", &rows.len().to_string()), ("id", id.as_str())],
        );
        Ok(true)
    }

    /// Removes a document and its index rows; `false` if it did not exist
    pub fn delete(&mut self, id: &DocumentId) -> StoreResult<bool> {
        let schema = &self.schema;
        let deleted = transact(&mut self.engine, &self.metrics, "delete", id, |engine| {
            engine.delete_rows(schema.path_table(), &[(DATA_ID_COLUMN, Value::from(id.as_str()))])?;
            let removed = engine.delete_rows(schema.data_table(), &[(ID_COLUMN, Value::from(id.as_str()))])?;
            Ok(removed > 0)
        })?;

        if deleted {
            self.metrics.increment_documents_deleted();
            log_event_with_fields(Event::DocumentDeleted, &[("id", id.as_str())]);
        }
        Ok(deleted)
    }

    /// Documents with at least one index row matching the query.
    ///
    /// An empty query matches every document that has index rows. The cap
    /// is the query's own, else the configured default.
    pub fn search_by_query(&self, query: &Query) -> StoreResult<BTreeMap<DocumentId, Node>> {
        let id = ColumnRef::new(DATA_ALIAS, ID_COLUMN);
        let mut select = SelectQuery::new(TableRef::new(self.schema.data_table(), DATA_ALIAS))
            .join(Join::inner(
                TableRef::new(self.schema.path_table(), PATH_ALIAS),
                id.clone(),
                ColumnRef::new(PATH_ALIAS, DATA_ID_COLUMN),
            ))
            .select(id.clone())
            .select(ColumnRef::new(DATA_ALIAS, DATA_COLUMN))
            .group_by(id);

        if let Some(translation) = self.translator.translate(query, &self.ids) {
            select = select.filter(translation.predicate, translation.bindings);
        }
        let limit = query
            .max_document_count()
            .or(self.config.default_max_document_count);
        if let Some(limit) = limit {
            select = select.limit(limit);
        }

        let rows = self.engine.execute_query(&select)?;
        let mut documents = BTreeMap::new();
        for row in rows {
            let (id, document) = self.decode_row(row)?;
            documents.insert(id, document);
        }

        self.metrics.increment_queries_executed();
        log_event_with_fields(
            Event::QueryExecuted,
            &[
                ("documents", &documents.len().to_string()),
                ("limit", &limit.map_or_else(|| "none".to_string(), |l| l.to_string())),
            ],
        );
        Ok(documents)
    }

    /// Point lookup by identity
    pub fn search_by_id(&self, id: &DocumentId) -> StoreResult<Option<Node>> {
        let select = SelectQuery::new(TableRef::new(self.schema.data_table(), DATA_ALIAS))
            .select(ColumnRef::new(DATA_ALIAS, ID_COLUMN))
            .select(ColumnRef::new(DATA_ALIAS, DATA_COLUMN))
            .filter(id_equals(DATA_ALIAS, ID_COLUMN, id), ParameterBindings::new())
            .limit(1);

        match self.engine.execute_query(&select)?.into_iter().next() {
            Some(row) => Ok(Some(self.decode_row(row)?.1)),
            None => Ok(None),
        }
    }

    /// Number of index rows held for a document
    pub fn count_index_entries(&self, id: &DocumentId) -> StoreResult<usize> {
        let select = SelectQuery::new(TableRef::new(self.schema.path_table(), PATH_ALIAS))
            .select(ColumnRef::new(PATH_ALIAS, PATH_COLUMN))
            .filter(id_equals(PATH_ALIAS, DATA_ID_COLUMN, id), ParameterBindings::new());
        Ok(self.engine.execute_query(&select)?.len())
    }

    pub fn metrics(&self) -> &MetricsRegistry {
        &self.metrics
    }

    pub fn schema(&self) -> &StoreSchema {
        &self.schema
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn into_engine(self) -> E {
        self.engine
    }

    /// One path table row per entry, each with a fresh row id
    fn index_rows(&self, id: &DocumentId, entries: &[IndexEntry]) -> Vec<IndexRow> {
        entries
            .iter()
            .map(|entry| {
                [
                    (ID_COLUMN, Value::from(self.ids.next_id())),
                    (DATA_ID_COLUMN, Value::from(id.as_str())),
                    (PATH_COLUMN, Value::from(entry.path.as_str())),
                    (VALUE_COLUMN, Value::from(entry.value.raw_text())),
                ]
            })
            .collect()
    }

    /// `(id, data)` row into an identity and decoded document
    fn decode_row(&self, row: Row) -> StoreResult<(DocumentId, Node)> {
        let table = self.schema.data_table();
        let mut cells = row.into_iter();
        let id = match cells.next() {
            Some(Value::Text(id)) => DocumentId::new(id),
            other => return Err(StoreError::malformed(table, format!("expected text id, got {:?}", other))),
        };
        let document = match cells.next() {
            Some(Value::Blob(blob)) => self.codec.decode(&blob)?,
            other => return Err(StoreError::malformed(table, format!("expected blob data, got {:?}", other))),
        };
        Ok((id, document))
    }
}

/// Runs `work` in one transaction, rolling back on any failure
fn transact<E, T>(
    engine: &mut E,
    metrics: &MetricsRegistry,
    operation: &str,
    id: &DocumentId,
    work: impl FnOnce(&mut E) -> EngineResult<T>,
) -> StoreResult<T>
where
    E: RelationalStore,
{
    engine
        .begin_transaction()
        .map_err(|source| StoreError::TransactionFailure { source })?;

    let outcome = work(&mut *engine).and_then(|value| engine.commit().map(|()| value));
    let source = match outcome {
        Ok(value) => return Ok(value),
        Err(source) => source,
    };

    let mut fields = vec![
        ("code", source.code().to_string()),
        ("error", source.to_string()),
        ("id", id.to_string()),
        ("operation", operation.to_string()),
    ];
    if engine.in_transaction() {
        if let Err(e) = engine.rollback() {
            fields.push(("rollback_error", e.to_string()));
        }
    }
    let fields: Vec<(&str, &str)> = fields.iter().map(|(k, v)| (*k, v.as_str())).collect();
    log_event_with_fields(Event::WriteRolledBack, &fields);
    metrics.increment_writes_rolled_back();

    Err(StoreError::TransactionFailure { source })
}

fn insert_document<E: RelationalStore>(
    engine: &mut E,
    schema: &StoreSchema,
    id: &DocumentId,
    blob: Vec<u8>,
    rows: &[IndexRow],
) -> EngineResult<()> {
    engine.insert_row(
        schema.data_table(),
        &[(ID_COLUMN, Value::from(id.as_str())), (DATA_COLUMN, Value::Blob(blob))],
    )?;
    for row in rows {
        engine.insert_row(schema.path_table(), row)?;
    }
    Ok(())
}

fn id_equals(alias: &str, column: &str, id: &DocumentId) -> Expr {
    Expr::compare(
        Operand::Column(ColumnRef::new(alias, column)),
        "=",
        Operand::Literal(Value::from(id.as_str())),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Scalar;
    use crate::engine::{EngineError, MemoryEngine, TableDefinition};
    use crate::flatten::FlattenError;
    use crate::ids::SequentialIdGenerator;
    use crate::query::WhereStatement;
    use serde_json::json;

    type TestStore<E = MemoryEngine> = DocumentStore<E, JsonCodec, SequentialIdGenerator>;

    fn store_with<E: RelationalStore>(engine: E) -> TestStore<E> {
        let mut store =
            DocumentStore::with_parts(engine, JsonCodec, SequentialIdGenerator::new(), StoreConfig::default()).unwrap();
        store.init_data_structure().unwrap();
        store
    }

    fn memory_store() -> TestStore {
        store_with(MemoryEngine::new())
    }

    /// Memory engine whose path table inserts start failing after a budget
    struct FlakyEngine {
        inner: MemoryEngine,
        path_inserts_left: usize,
    }

    impl RelationalStore for FlakyEngine {
        fn begin_transaction(&mut self) -> EngineResult<()> {
            self.inner.begin_transaction()
        }
        fn commit(&mut self) -> EngineResult<()> {
            self.inner.commit()
        }
        fn rollback(&mut self) -> EngineResult<()> {
            self.inner.rollback()
        }
        fn in_transaction(&self) -> bool {
            self.inner.in_transaction()
        }
        fn insert_row(&mut self, table: &str, values: &[(&str, Value)]) -> EngineResult<()> {
            if table == "pathdoc_path" {
                if self.path_inserts_left == 0 {
                    return Err(EngineError::io(
                        "insert",
                        std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
                    ));
                }
                self.path_inserts_left -= 1;
            }
            self.inner.insert_row(table, values)
        }
        fn delete_rows(&mut self, table: &str, matches: &[(&str, Value)]) -> EngineResult<usize> {
            self.inner.delete_rows(table, matches)
        }
        fn execute_query(&self, query: &SelectQuery) -> EngineResult<Vec<Row>> {
            self.inner.execute_query(query)
        }
        fn ensure_table_exists(&mut self, definition: &TableDefinition) -> EngineResult<bool> {
            self.inner.ensure_table_exists(definition)
        }
    }

    #[test]
    fn test_init_is_idempotent() {
        let mut store = memory_store();
        store.init_data_structure().unwrap();
        assert_eq!(store.engine().table_names(), vec!["pathdoc_data", "pathdoc_path"]);
    }

    #[test]
    fn test_store_writes_blob_and_index_rows() {
        let mut store = memory_store();
        let document = Node::from(json!({"person": {"name": "Bob", "age": 26}}));

        let id = store.store(&document).unwrap();
        assert_eq!(id.as_str().len(), 32);
        assert_eq!(store.count_index_entries(&id).unwrap(), 2);
        assert_eq!(store.search_by_id(&id).unwrap(), Some(document));

        let snapshot = store.metrics().snapshot();
        assert_eq!(snapshot.documents_stored, 1);
        assert_eq!(snapshot.index_entries_written, 2);
    }

    #[test]
    fn test_null_leaf_indexed_as_null() {
        let mut store = memory_store();
        let id = store.store(&Node::mapping([("gone", Node::null())])).unwrap();
        assert_eq!(store.count_index_entries(&id).unwrap(), 1);

        // NULL never compares equal, not even to a null parameter
        let query = Query::new().where_and(WhereStatement::eq("gone", Scalar::Null));
        assert!(store.search_by_query(&query).unwrap().is_empty());
    }

    #[test]
    fn test_unsupported_leaf_touches_nothing() {
        let mut store = memory_store();
        let document = Node::mapping([("name", Node::from("x")), ("files", Node::opaque("stream"))]);

        let err = store.store(&document).unwrap_err();
        assert!(matches!(
            err,
            StoreError::UnsupportedLeafType(FlattenError::UnsupportedLeafType { ref path, .. }) if path == "files"
        ));
        assert_eq!(store.engine().row_count("pathdoc_data"), Some(0));
        assert_eq!(store.engine().row_count("pathdoc_path"), Some(0));
    }

    #[test]
    fn test_failed_write_rolls_back() {
        let mut store = store_with(FlakyEngine {
            inner: MemoryEngine::new(),
            path_inserts_left: 1,
        });
        let document = Node::from(json!({"a": 1, "b": 2}));

        let err = store.store(&document).unwrap_err();
        assert!(matches!(err, StoreError::TransactionFailure { .. }));
        assert_eq!(err.code(), "PATHDOC_TRANSACTION_FAILED");
        assert!(!store.engine().in_transaction());
        assert_eq!(store.engine().inner.row_count("pathdoc_data"), Some(0));
        assert_eq!(store.engine().inner.row_count("pathdoc_path"), Some(0));
        assert_eq!(store.metrics().snapshot().writes_rolled_back, 1);
    }

    #[test]
    fn test_failed_update_keeps_previous_version() {
        let mut store = store_with(FlakyEngine {
            inner: MemoryEngine::new(),
            path_inserts_left: 1,
        });
        let original = Node::from(json!({"test": 0}));
        let id = store.store(&original).unwrap();

        let err = store.update(&id, &Node::from(json!({"test": 1}))).unwrap_err();
        assert!(matches!(err, StoreError::TransactionFailure { .. }));
        assert_eq!(store.search_by_id(&id).unwrap(), Some(original));
        assert_eq!(store.count_index_entries(&id).unwrap(), 1);
    }

    #[test]
    fn test_update_unknown_id_creates_document() {
        let mut store = memory_store();
        let fresh = DocumentId::from("abc");
        let document = Node::from(json!({"test": 1}));

        assert!(store.update(&fresh, &document).unwrap());
        assert_eq!(store.search_by_id(&fresh).unwrap(), Some(document));
        assert_eq!(store.count_index_entries(&fresh).unwrap(), 1);
        assert_eq!(store.metrics().snapshot().documents_updated, 1);

        let query = Query::new().where_and(WhereStatement::eq("test", 1));
        assert!(store.search_by_query(&query).unwrap().contains_key(&fresh));
    }

    #[test]
    fn test_delete() {
        let mut store = memory_store();
        let id = store.store(&Node::from(json!({"a": [1, 2, 3]}))).unwrap();
        assert_eq!(store.count_index_entries(&id).unwrap(), 3);

        assert!(store.delete(&id).unwrap());
        assert!(!store.delete(&id).unwrap());
        assert_eq!(store.search_by_id(&id).unwrap(), None);
        assert_eq!(store.count_index_entries(&id).unwrap(), 0);
        assert_eq!(store.metrics().snapshot().documents_deleted, 1);
    }

    #[test]
    fn test_configured_default_cap() {
        let config = StoreConfig {
            default_max_document_count: Some(2),
            ..StoreConfig::default()
        };
        let mut store =
            DocumentStore::with_parts(MemoryEngine::new(), JsonCodec, SequentialIdGenerator::new(), config).unwrap();
        store.init_data_structure().unwrap();
        for i in 0..4 {
            store.store(&Node::from(json!({"n": i}))).unwrap();
        }

        assert_eq!(store.search_by_query(&Query::new()).unwrap().len(), 2);
        let own_cap = Query::new().with_max_document_count(3);
        assert_eq!(store.search_by_query(&own_cap).unwrap().len(), 3);
    }

    #[test]
    fn test_custom_table_names() {
        let config = StoreConfig {
            data_table: "docs".into(),
            path_table: "paths".into(),
            ..StoreConfig::default()
        };
        let mut store = DocumentStore::with_config(MemoryEngine::new(), config).unwrap();
        store.init_data_structure().unwrap();
        let id = store.store(&Node::from(json!({"k": "v"}))).unwrap();

        assert_eq!(store.engine().row_count("docs"), Some(1));
        assert_eq!(store.engine().row_count("paths"), Some(1));
        let query = Query::new().where_and(WhereStatement::eq("k", "v"));
        assert!(store.search_by_query(&query).unwrap().contains_key(&id));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = StoreConfig {
            path_table: "pathdoc_data".into(),
            ..StoreConfig::default()
        };
        assert!(DocumentStore::with_config(MemoryEngine::new(), config).is_err());
    }
}
