//! In-memory relational engine
//!
//! Tables keep rows in insertion order. Every statement validates fully
//! before mutating, so a failed statement changes nothing even outside a
//! transaction. Transactions snapshot the table map on begin.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use super::errors::{EngineError, EngineResult};
use super::eval::Evaluator;
use super::expr::ColumnRef;
use super::relational::RelationalStore;
use super::select::SelectQuery;
use super::types::{OnDelete, Row, TableDefinition, Value};
use crate::observability::{log_event_with_fields, Event};

#[derive(Debug, Clone)]
struct Table {
    definition: TableDefinition,
    rows: Vec<Row>,
    /// Primary key values present in `rows`
    keys: HashSet<Value>,
}

impl Table {
    fn new(definition: TableDefinition) -> Self {
        Self {
            definition,
            rows: Vec::new(),
            keys: HashSet::new(),
        }
    }

    fn column_index(&self, column: &str) -> EngineResult<usize> {
        self.definition
            .column_index(column)
            .ok_or_else(|| EngineError::UnknownColumn {
                table: self.definition.name.clone(),
                column: column.to_string(),
            })
    }

    fn primary_key_index(&self) -> Option<usize> {
        self.definition
            .primary_key
            .as_deref()
            .and_then(|pk| self.definition.column_index(pk))
    }

    /// True if any row holds `value` in `column`
    fn contains(&self, column: usize, value: &Value) -> bool {
        if self.primary_key_index() == Some(column) {
            return self.keys.contains(value);
        }
        self.rows.iter().any(|row| &row[column] == value)
    }
}

/// In-memory implementation of `RelationalStore`
#[derive(Debug, Default)]
pub struct MemoryEngine {
    tables: BTreeMap<String, Table>,
    /// Table state at `begin_transaction`
    snapshot: Option<BTreeMap<String, Table>>,
}

impl MemoryEngine {
    /// Creates an engine with no tables
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of all tables
    pub fn table_names(&self) -> Vec<&str> {
        self.tables.keys().map(String::as_str).collect()
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    /// Number of rows in a table, `None` if it does not exist
    pub fn row_count(&self, name: &str) -> Option<usize> {
        self.tables.get(name).map(|t| t.rows.len())
    }

    fn table(&self, name: &str) -> EngineResult<&Table> {
        self.tables
            .get(name)
            .ok_or_else(|| EngineError::TableNotFound(name.to_string()))
    }

    /// Collects the rows a delete removes, following cascades and
    /// rejecting restricted references, without mutating anything.
    fn plan_delete(
        &self,
        table_name: &str,
        doomed: Vec<usize>,
        plan: &mut BTreeMap<String, BTreeSet<usize>>,
    ) -> EngineResult<()> {
        let table = self.table(table_name)?;
        let fresh: Vec<usize> = {
            let planned = plan.entry(table_name.to_string()).or_default();
            doomed.into_iter().filter(|i| planned.insert(*i)).collect()
        };
        if fresh.is_empty() {
            return Ok(());
        }

        for (child_name, child) in &self.tables {
            for fk in child
                .definition
                .foreign_keys
                .iter()
                .filter(|fk| fk.references_table == table_name)
            {
                let parent_column = table.column_index(&fk.references_column)?;
                let child_column = child.column_index(&fk.column)?;
                let removed: HashSet<&Value> = fresh
                    .iter()
                    .map(|&i| &table.rows[i][parent_column])
                    .filter(|v| !v.is_null())
                    .collect();

                let referencing: Vec<usize> = child
                    .rows
                    .iter()
                    .enumerate()
                    .filter(|(_, row)| removed.contains(&row[child_column]))
                    .map(|(i, _)| i)
                    .collect();
                if referencing.is_empty() {
                    continue;
                }

                match fk.on_delete {
                    OnDelete::Restrict => {
                        return Err(EngineError::ForeignKeyViolation {
                            table: child_name.clone(),
                            column: fk.column.clone(),
                            reason: format!("{} row(s) still reference {}", referencing.len(), table_name),
                        })
                    }
                    OnDelete::Cascade => self.plan_delete(child_name, referencing, plan)?,
                }
            }
        }
        Ok(())
    }
}

/// Position of a query source and column within it
fn locate(sources: &[(&str, &Table)], column: &ColumnRef) -> EngineResult<(usize, usize)> {
    let position = sources
        .iter()
        .position(|(alias, _)| *alias == column.table)
        .ok_or_else(|| EngineError::UnknownAlias(column.table.clone()))?;
    let index = sources[position].1.column_index(&column.column)?;
    Ok((position, index))
}

/// Cell of a joined row; `combo[i]` is the row index within `sources[i]`
fn cell<'t>(sources: &[(&str, &'t Table)], combo: &[usize], column: &ColumnRef) -> EngineResult<&'t Value> {
    let (position, index) = locate(sources, column)?;
    let table: &'t Table = sources[position].1;
    Ok(&table.rows[combo[position]][index])
}

impl RelationalStore for MemoryEngine {
    fn begin_transaction(&mut self) -> EngineResult<()> {
        if self.snapshot.is_some() {
            return Err(EngineError::TransactionActive);
        }
        self.snapshot = Some(self.tables.clone());
        Ok(())
    }

    fn commit(&mut self) -> EngineResult<()> {
        self.snapshot
            .take()
            .map(|_| ())
            .ok_or(EngineError::NoActiveTransaction)
    }

    fn rollback(&mut self) -> EngineResult<()> {
        let snapshot = self.snapshot.take().ok_or(EngineError::NoActiveTransaction)?;
        self.tables = snapshot;
        Ok(())
    }

    fn in_transaction(&self) -> bool {
        self.snapshot.is_some()
    }

    fn insert_row(&mut self, table_name: &str, values: &[(&str, Value)]) -> EngineResult<()> {
        let table = self.table(table_name)?;
        let definition = &table.definition;

        let mut row: Row = vec![Value::Null; definition.columns.len()];
        for (column, value) in values {
            row[table.column_index(column)?] = value.clone();
        }

        for (column, value) in definition.columns.iter().zip(&row) {
            if !column.nullable && value.is_null() {
                return Err(EngineError::NotNullViolation {
                    table: table_name.to_string(),
                    column: column.name.clone(),
                });
            }
        }

        let key_index = table.primary_key_index();
        if let Some(index) = key_index {
            if table.keys.contains(&row[index]) {
                return Err(EngineError::DuplicateKey {
                    table: table_name.to_string(),
                    key: row[index].to_string(),
                });
            }
        }

        for fk in &definition.foreign_keys {
            let value = &row[table.column_index(&fk.column)?];
            if value.is_null() {
                continue;
            }
            let parent = self.tables.get(&fk.references_table).ok_or_else(|| {
                EngineError::ForeignKeyViolation {
                    table: table_name.to_string(),
                    column: fk.column.clone(),
                    reason: format!("referenced table {} does not exist", fk.references_table),
                }
            })?;
            if !parent.contains(parent.column_index(&fk.references_column)?, value) {
                return Err(EngineError::ForeignKeyViolation {
                    table: table_name.to_string(),
                    column: fk.column.clone(),
                    reason: format!("no {} row with {} = {}", fk.references_table, fk.references_column, value),
                });
            }
        }

        if let Some(table) = self.tables.get_mut(table_name) {
            if let Some(index) = key_index {
                table.keys.insert(row[index].clone());
            }
            table.rows.push(row);
        }
        Ok(())
    }

    fn delete_rows(&mut self, table_name: &str, matches: &[(&str, Value)]) -> EngineResult<usize> {
        let table = self.table(table_name)?;
        let mut criteria = Vec::with_capacity(matches.len());
        for (column, value) in matches {
            criteria.push((table.column_index(column)?, value));
        }

        // NULL never equals anything, including NULL
        let doomed: Vec<usize> = table
            .rows
            .iter()
            .enumerate()
            .filter(|(_, row)| {
                criteria
                    .iter()
                    .all(|(index, value)| !value.is_null() && &row[*index] == *value)
            })
            .map(|(i, _)| i)
            .collect();
        let deleted = doomed.len();
        if deleted == 0 {
            return Ok(0);
        }

        let mut plan = BTreeMap::new();
        self.plan_delete(table_name, doomed, &mut plan)?;

        for (name, indices) in plan {
            if let Some(table) = self.tables.get_mut(&name) {
                let key_index = table.primary_key_index();
                let rows = std::mem::take(&mut table.rows);
                for (i, row) in rows.into_iter().enumerate() {
                    if indices.contains(&i) {
                        if let Some(index) = key_index {
                            table.keys.remove(&row[index]);
                        }
                    } else {
                        table.rows.push(row);
                    }
                }
            }
        }

        Ok(deleted)
    }

    fn execute_query(&self, query: &SelectQuery) -> EngineResult<Vec<Row>> {
        let from = self.table(&query.from.name)?;
        let mut sources: Vec<(&str, &Table)> = vec![(query.from.alias.as_str(), from)];
        let mut combos: Vec<Vec<usize>> = (0..from.rows.len()).map(|i| vec![i]).collect();

        for join in &query.joins {
            let table = self.table(&join.table.name)?;
            let alias = join.table.alias.as_str();
            let (joined, existing) = if join.right.table == alias {
                (&join.right, &join.left)
            } else if join.left.table == alias {
                (&join.left, &join.right)
            } else {
                return Err(EngineError::UnknownAlias(alias.to_string()));
            };

            let joined_index = table.column_index(&joined.column)?;
            let (existing_position, existing_index) = locate(&sources, existing)?;

            let mut lookup: HashMap<&Value, Vec<usize>> = HashMap::new();
            for (i, row) in table.rows.iter().enumerate() {
                let key = &row[joined_index];
                if !key.is_null() {
                    lookup.entry(key).or_default().push(i);
                }
            }

            let mut next = Vec::new();
            for combo in combos {
                let key = &sources[existing_position].1.rows[combo[existing_position]][existing_index];
                if let Some(hits) = lookup.get(key) {
                    for &hit in hits {
                        let mut extended = combo.clone();
                        extended.push(hit);
                        next.push(extended);
                    }
                }
            }
            combos = next;
            sources.push((alias, table));
        }

        let selected = query
            .columns
            .iter()
            .map(|c| locate(&sources, c))
            .collect::<EngineResult<Vec<_>>>()?;
        let grouped = query
            .group_by
            .iter()
            .map(|c| locate(&sources, c))
            .collect::<EngineResult<Vec<_>>>()?;

        let mut evaluator = Evaluator::new(&query.bindings);
        let mut groups: HashSet<Vec<Value>> = HashSet::new();
        let mut rows = Vec::new();

        for combo in &combos {
            if let Some(max) = query.max_results {
                if rows.len() as u64 >= max {
                    break;
                }
            }

            if let Some(predicate) = &query.predicate {
                let resolve = |column: &ColumnRef| cell(&sources, combo, column);
                if !evaluator.matches(predicate, &resolve)? {
                    continue;
                }
            }

            if !grouped.is_empty() {
                let key: Vec<Value> = grouped
                    .iter()
                    .map(|&(p, i)| sources[p].1.rows[combo[p]][i].clone())
                    .collect();
                if !groups.insert(key) {
                    continue;
                }
            }

            rows.push(
                selected
                    .iter()
                    .map(|&(p, i)| sources[p].1.rows[combo[p]][i].clone())
                    .collect(),
            );
        }

        if !evaluator.unknown_operators().is_empty() {
            let operators: Vec<&str> = evaluator.unknown_operators().iter().map(String::as_str).collect();
            log_event_with_fields(Event::UnknownOperator, &[("operators", &operators.join(","))]);
        }

        Ok(rows)
    }

    fn ensure_table_exists(&mut self, definition: &TableDefinition) -> EngineResult<bool> {
        if self.tables.contains_key(&definition.name) {
            return Ok(false);
        }
        self.tables
            .insert(definition.name.clone(), Table::new(definition.clone()));
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{ColumnDefinition, Expr, Join, Operand, ParameterBindings, TableRef};

    fn parents() -> TableDefinition {
        TableDefinition::new("parents")
            .column(ColumnDefinition::text("id"))
            .column(ColumnDefinition::text("name").nullable())
            .primary_key("id")
    }

    fn children(on_delete: OnDelete) -> TableDefinition {
        TableDefinition::new("children")
            .column(ColumnDefinition::text("id"))
            .column(ColumnDefinition::text("parent_id"))
            .column(ColumnDefinition::text("tag").nullable())
            .primary_key("id")
            .foreign_key("parent_id", "parents", "id", on_delete)
    }

    fn engine(on_delete: OnDelete) -> MemoryEngine {
        let mut engine = MemoryEngine::new();
        assert!(engine.ensure_table_exists(&parents()).unwrap());
        assert!(engine.ensure_table_exists(&children(on_delete)).unwrap());
        engine
    }

    fn insert_parent(engine: &mut MemoryEngine, id: &str, name: &str) {
        engine
            .insert_row("parents", &[("id", Value::from(id)), ("name", Value::from(name))])
            .unwrap();
    }

    fn insert_child(engine: &mut MemoryEngine, id: &str, parent: &str, tag: &str) {
        engine
            .insert_row(
                "children",
                &[("id", Value::from(id)), ("parent_id", Value::from(parent)), ("tag", Value::from(tag))],
            )
            .unwrap();
    }

    fn join_query() -> SelectQuery {
        SelectQuery::new(TableRef::new("parents", "p"))
            .join(Join::inner(
                TableRef::new("children", "c"),
                ColumnRef::new("p", "id"),
                ColumnRef::new("c", "parent_id"),
            ))
            .select(ColumnRef::new("p", "id"))
            .select(ColumnRef::new("c", "tag"))
    }

    #[test]
    fn test_ensure_table_is_idempotent() {
        let mut engine = engine(OnDelete::Cascade);
        assert!(!engine.ensure_table_exists(&parents()).unwrap());
        assert_eq!(engine.table_names(), vec!["children", "parents"]);
    }

    #[test]
    fn test_constraints() {
        let mut engine = engine(OnDelete::Cascade);
        insert_parent(&mut engine, "a", "Alice");

        let dup = engine.insert_row("parents", &[("id", Value::from("a"))]);
        assert!(matches!(dup, Err(EngineError::DuplicateKey { .. })));

        let orphan = engine.insert_row("children", &[("id", Value::from("c1")), ("parent_id", Value::from("zz"))]);
        assert!(matches!(orphan, Err(EngineError::ForeignKeyViolation { .. })));

        let missing = engine.insert_row("children", &[("id", Value::from("c1"))]);
        assert!(matches!(missing, Err(EngineError::NotNullViolation { .. })));

        let unknown = engine.insert_row("parents", &[("id", Value::from("b")), ("age", Value::from("3"))]);
        assert!(matches!(unknown, Err(EngineError::UnknownColumn { .. })));

        assert_eq!(engine.row_count("parents"), Some(1));
        assert_eq!(engine.row_count("children"), Some(0));
    }

    #[test]
    fn test_cascade_delete() {
        let mut engine = engine(OnDelete::Cascade);
        insert_parent(&mut engine, "a", "Alice");
        insert_parent(&mut engine, "b", "Bob");
        insert_child(&mut engine, "c1", "a", "x");
        insert_child(&mut engine, "c2", "a", "y");
        insert_child(&mut engine, "c3", "b", "z");

        assert_eq!(engine.delete_rows("parents", &[("id", Value::from("a"))]).unwrap(), 1);
        assert_eq!(engine.row_count("parents"), Some(1));
        assert_eq!(engine.row_count("children"), Some(1));

        // key freed for reuse
        insert_parent(&mut engine, "a", "Alice again");
    }

    #[test]
    fn test_restrict_delete_changes_nothing() {
        let mut engine = engine(OnDelete::Restrict);
        insert_parent(&mut engine, "a", "Alice");
        insert_child(&mut engine, "c1", "a", "x");

        let result = engine.delete_rows("parents", &[("id", Value::from("a"))]);
        assert!(matches!(result, Err(EngineError::ForeignKeyViolation { .. })));
        assert_eq!(engine.row_count("parents"), Some(1));
        assert_eq!(engine.row_count("children"), Some(1));
    }

    #[test]
    fn test_rollback_restores_state() {
        let mut engine = engine(OnDelete::Cascade);
        insert_parent(&mut engine, "a", "Alice");

        engine.begin_transaction().unwrap();
        assert!(engine.in_transaction());
        assert!(matches!(engine.begin_transaction(), Err(EngineError::TransactionActive)));
        insert_parent(&mut engine, "b", "Bob");
        engine.delete_rows("parents", &[("id", Value::from("a"))]).unwrap();
        engine.rollback().unwrap();

        assert!(!engine.in_transaction());
        assert_eq!(engine.row_count("parents"), Some(1));
        assert!(matches!(engine.commit(), Err(EngineError::NoActiveTransaction)));

        engine.begin_transaction().unwrap();
        insert_parent(&mut engine, "b", "Bob");
        engine.commit().unwrap();
        assert_eq!(engine.row_count("parents"), Some(2));
    }

    #[test]
    fn test_join_filter_group_limit() {
        let mut engine = engine(OnDelete::Cascade);
        insert_parent(&mut engine, "a", "Alice");
        insert_parent(&mut engine, "b", "Bob");
        insert_parent(&mut engine, "c", "Carol");
        insert_child(&mut engine, "c1", "a", "red");
        insert_child(&mut engine, "c2", "a", "red");
        insert_child(&mut engine, "c3", "b", "red");
        insert_child(&mut engine, "c4", "c", "blue");

        let all = engine.execute_query(&join_query()).unwrap();
        assert_eq!(all.len(), 4);

        let mut bindings = ParameterBindings::new();
        bindings.bind("p1", Value::from("red"));
        let red = join_query()
            .filter(
                Expr::compare(Operand::Column(ColumnRef::new("c", "tag")), "=", Operand::Param("p1".into())),
                bindings,
            )
            .group_by(ColumnRef::new("p", "id"));

        let rows = engine.execute_query(&red).unwrap();
        assert_eq!(
            rows,
            vec![
                vec![Value::from("a"), Value::from("red")],
                vec![Value::from("b"), Value::from("red")],
            ]
        );

        assert_eq!(engine.execute_query(&red.clone().limit(1)).unwrap().len(), 1);
        assert!(engine.execute_query(&red.limit(0)).unwrap().is_empty());
    }

    #[test]
    fn test_query_unknown_table_and_alias() {
        let engine = engine(OnDelete::Cascade);
        let missing = SelectQuery::new(TableRef::new("nope", "n"));
        assert!(matches!(engine.execute_query(&missing), Err(EngineError::TableNotFound(_))));

        let bad_alias = SelectQuery::new(TableRef::new("parents", "p")).select(ColumnRef::new("x", "id"));
        assert!(matches!(engine.execute_query(&bad_alias), Err(EngineError::UnknownAlias(_))));
    }
}
