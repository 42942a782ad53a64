//! Query tree to predicate translation

use crate::engine::{ColumnRef, Expr, Operand, ParameterBindings, Value};
use crate::ids::IdGenerator;
use crate::observability::{log_event_with_fields, Event};
use crate::query::{Query, Statement, WhereStatement};
use crate::store::{PATH_COLUMN, VALUE_COLUMN};

/// Predicate plus the values of its named parameters
#[derive(Debug, Clone, PartialEq)]
pub struct Translation {
    pub predicate: Expr,
    pub bindings: ParameterBindings,
}

/// Translates `Query` trees into engine predicates over the path table
#[derive(Debug, Clone, PartialEq)]
pub struct QueryTranslator {
    path_column: ColumnRef,
    value_column: ColumnRef,
}

struct State<'g> {
    ids: &'g dyn IdGenerator,
    bindings: ParameterBindings,
}

impl State<'_> {
    /// `p` + a fresh id reduced to alphanumerics, unique within the translation
    fn parameter_name(&self) -> String {
        let id: String = self.ids.next_id().chars().filter(|c| c.is_ascii_alphanumeric()).collect();
        let base = format!("p{}", id);
        let mut name = base.clone();
        let mut suffix = 1;
        while self.bindings.contains(&name) {
            name = format!("{}_{}", base, suffix);
            suffix += 1;
        }
        name
    }
}

impl QueryTranslator {
    pub fn new(path_column: ColumnRef, value_column: ColumnRef) -> Self {
        Self {
            path_column,
            value_column,
        }
    }

    /// Translator for the path table joined under `alias`
    pub fn for_path_table(alias: &str) -> Self {
        Self::new(ColumnRef::new(alias, PATH_COLUMN), ColumnRef::new(alias, VALUE_COLUMN))
    }

    /// Translates the query's root conjunction.
    ///
    /// Returns `None` when no leaf survives, meaning "no constraint".
    pub fn translate(&self, query: &Query, ids: &dyn IdGenerator) -> Option<Translation> {
        let mut state = State {
            ids,
            bindings: ParameterBindings::new(),
        };
        let predicate = self.group(query.root_and().terms(), Expr::And, &mut state)?;

        log_event_with_fields(
            Event::QueryTranslated,
            &[
                ("leaves", &predicate.leaf_count().to_string()),
                ("parameters", &state.bindings.len().to_string()),
            ],
        );

        Some(Translation {
            predicate,
            bindings: state.bindings,
        })
    }

    fn statement(&self, statement: &Statement, state: &mut State<'_>) -> Option<Expr> {
        match statement {
            Statement::And(and) => self.group(and.terms(), Expr::And, state),
            Statement::Or(or) => self.group(or.terms(), Expr::Or, state),
            Statement::Where(leaf) => Some(self.leaf(leaf, state)),
        }
    }

    /// Empty groups vanish; a single survivor stays wrapped
    fn group(&self, terms: &[Statement], join: fn(Vec<Expr>) -> Expr, state: &mut State<'_>) -> Option<Expr> {
        let mut children = Vec::with_capacity(terms.len());
        for term in terms {
            if let Some(child) = self.statement(term, state) {
                children.push(child);
            }
        }
        if children.is_empty() {
            None
        } else {
            Some(join(children))
        }
    }

    /// `path = '<path>' AND value_raw <op> :param`
    fn leaf(&self, leaf: &WhereStatement, state: &mut State<'_>) -> Expr {
        let name = state.parameter_name();
        state.bindings.bind(name.clone(), Value::from(leaf.value().raw_text()));

        Expr::And(vec![
            Expr::compare(
                Operand::Column(self.path_column.clone()),
                "=",
                Operand::Literal(Value::from(leaf.path())),
            ),
            Expr::compare(
                Operand::Column(self.value_column.clone()),
                leaf.operator(),
                Operand::Param(name),
            ),
        ])
    }
}
