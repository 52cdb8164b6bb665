//! In-memory store, catalog, and fixtures shared by unit tests.
//!
//! `MemStore` interprets the conventional op vocabulary from `filter::ops`
//! and counts every grouped query and materialization it executes, so tests
//! can observe the at-most-once property directly.

use crate::{
    descriptor::{AggregateColumn, AggregateFunction},
    filter::{FilterOp, ops},
    relation::{EntityIdentity, JoinHop, RelationCatalog, RelationModel},
    store::{GroupedQueryPlan, ParentScopePlan, RelationStore, Row, StoreError},
    value::Value,
};
use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    sync::atomic::{AtomicU64, Ordering},
};

///
/// MemCatalog
///

#[derive(Default)]
pub(crate) struct MemCatalog {
    relations: HashMap<(String, String), RelationModel>,
    primary_keys: HashMap<String, String>,
}

impl MemCatalog {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn entity(mut self, name: &str, primary_key: &str) -> Self {
        self.primary_keys
            .insert(name.to_string(), primary_key.to_string());
        self
    }

    pub(crate) fn with_relation(mut self, entity: &str, model: RelationModel) -> Self {
        self.relations
            .insert((entity.to_string(), model.name.clone()), model);
        self
    }
}

impl RelationCatalog for MemCatalog {
    fn relation(&self, entity: &str, name: &str) -> Option<&RelationModel> {
        self.relations.get(&(entity.to_string(), name.to_string()))
    }

    fn primary_key(&self, entity: &str) -> Option<&str> {
        self.primary_keys.get(entity).map(String::as_str)
    }
}

///
/// MemScope
///

#[derive(Clone, Debug)]
pub(crate) struct MemScope {
    entity: String,
    ops: Vec<FilterOp>,
}

///
/// MemStore
///

#[derive(Default)]
pub(crate) struct MemStore {
    tables: HashMap<String, Vec<Row>>,
    grouped_queries: AtomicU64,
    materializations: AtomicU64,
}

impl MemStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_table(mut self, entity: &str, rows: Vec<Row>) -> Self {
        self.tables.insert(entity.to_string(), rows);
        self
    }

    /// Grouped queries executed so far, the observable execution counter.
    pub(crate) fn grouped_queries(&self) -> u64 {
        self.grouped_queries.load(Ordering::SeqCst)
    }

    pub(crate) fn materializations(&self) -> u64 {
        self.materializations.load(Ordering::SeqCst)
    }

    fn rows(&self, entity: &str) -> Result<&Vec<Row>, StoreError> {
        self.tables
            .get(entity)
            .ok_or_else(|| StoreError::UnknownEntity {
                entity: entity.to_string(),
            })
    }

    // (group key, target row) pairs before parent scoping and filtering.
    fn candidates(
        &self,
        scope: &MemScope,
        join: Option<&JoinHop>,
        group_column: &str,
    ) -> Result<Vec<(Value, Row)>, StoreError> {
        let mut pairs = Vec::new();

        match join {
            None => {
                for row in self.rows(&scope.entity)? {
                    pairs.push((row.get(group_column).clone(), row.clone()));
                }
            }
            Some(hop) => {
                let targets = self.rows(&scope.entity)?;
                for join_row in self.rows(&hop.entity)? {
                    let target_ref = join_row.get(&hop.source_key);
                    if target_ref.is_null() {
                        continue;
                    }
                    if let Some(target) = targets
                        .iter()
                        .find(|row| row.get(&hop.target_primary_key) == target_ref)
                    {
                        pairs.push((join_row.get(&hop.parent_key).clone(), target.clone()));
                    }
                }
            }
        }

        let mut kept = Vec::new();
        for (key, row) in pairs {
            if row_passes(&scope.ops, &row)? {
                kept.push((key, row));
            }
        }

        Ok(kept)
    }
}

fn field_arg(op: &FilterOp) -> Result<&str, StoreError> {
    match op.args().first() {
        Some(Value::Text(field)) => Ok(field),
        _ => Err(StoreError::UnsupportedOperation {
            operation: op.operation().to_string(),
        }),
    }
}

fn row_passes(filter_ops: &[FilterOp], row: &Row) -> Result<bool, StoreError> {
    for op in filter_ops {
        let keep = match op.operation() {
            ops::WHERE_EQ => row.get(field_arg(op)?) == op.args().get(1).unwrap_or(&Value::Null),
            ops::WHERE_NE => row.get(field_arg(op)?) != op.args().get(1).unwrap_or(&Value::Null),
            ops::WHERE_GT => {
                let value = row.get(field_arg(op)?);
                !value.is_null() && value > op.args().get(1).unwrap_or(&Value::Null)
            }
            ops::WHERE_LT => {
                let value = row.get(field_arg(op)?);
                !value.is_null() && value < op.args().get(1).unwrap_or(&Value::Null)
            }
            ops::WHERE_IN => {
                let value = row.get(field_arg(op)?);
                op.args().iter().skip(1).any(|candidate| candidate == value)
            }
            ops::ORDER_BY | ops::ORDER_BY_DESC => true,
            _ => {
                return Err(StoreError::UnsupportedOperation {
                    operation: op.operation().to_string(),
                });
            }
        };

        if !keep {
            return Ok(false);
        }
    }

    Ok(true)
}

fn sort_rows(filter_ops: &[FilterOp], rows: &mut [Row]) -> Result<(), StoreError> {
    for op in filter_ops {
        match op.operation() {
            ops::ORDER_BY => {
                let field = field_arg(op)?.to_string();
                rows.sort_by(|a, b| a.get(&field).cmp(b.get(&field)));
            }
            ops::ORDER_BY_DESC => {
                let field = field_arg(op)?.to_string();
                rows.sort_by(|a, b| b.get(&field).cmp(a.get(&field)));
            }
            _ => {}
        }
    }

    Ok(())
}

fn concrete_column(column: &AggregateColumn) -> Result<&str, StoreError> {
    column.as_field().ok_or_else(|| StoreError::UnknownColumn {
        column: "*".to_string(),
    })
}

fn aggregate_group(
    function: AggregateFunction,
    column: &AggregateColumn,
    distinct: bool,
    rows: &[Row],
) -> Result<Option<Value>, StoreError> {
    match function {
        AggregateFunction::Count => {
            let count = match column {
                AggregateColumn::Wildcard => rows.len() as u64,
                AggregateColumn::Field(field) => {
                    let values = rows.iter().map(|row| row.get(field)).filter(|v| !v.is_null());
                    if distinct {
                        values.cloned().collect::<BTreeSet<_>>().len() as u64
                    } else {
                        values.count() as u64
                    }
                }
            };

            Ok(Some(Value::Uint(count)))
        }
        AggregateFunction::Exists => Ok(Some(Value::Bool(!rows.is_empty()))),
        AggregateFunction::Sum => {
            let field = concrete_column(column)?;
            let mut acc: Option<Value> = None;
            for row in rows {
                let value = row.get(field);
                if value.is_null() {
                    continue;
                }
                acc = Some(match acc {
                    None => value.clone(),
                    Some(sum) => {
                        sum.numeric_add(value)
                            .ok_or_else(|| StoreError::TypeMismatch {
                                column: field.to_string(),
                                message: format!("cannot sum {value}"),
                            })?
                    }
                });
            }

            Ok(acc)
        }
        AggregateFunction::Average => {
            let field = concrete_column(column)?;
            let mut total = 0.0;
            let mut seen = 0u64;
            for row in rows {
                let value = row.get(field);
                if value.is_null() {
                    continue;
                }
                total += value.as_f64().ok_or_else(|| StoreError::TypeMismatch {
                    column: field.to_string(),
                    message: format!("cannot average {value}"),
                })?;
                seen += 1;
            }

            Ok((seen > 0).then(|| Value::Float(total / seen as f64)))
        }
        AggregateFunction::Minimum => {
            let field = concrete_column(column)?;
            Ok(rows
                .iter()
                .map(|row| row.get(field))
                .filter(|value| !value.is_null())
                .min()
                .cloned())
        }
        AggregateFunction::Maximum => {
            let field = concrete_column(column)?;
            Ok(rows
                .iter()
                .map(|row| row.get(field))
                .filter(|value| !value.is_null())
                .max()
                .cloned())
        }
    }
}

impl RelationStore for MemStore {
    type Scope = MemScope;

    fn base_scope(&self, entity: &str) -> Result<Self::Scope, StoreError> {
        if !self.tables.contains_key(entity) {
            return Err(StoreError::UnknownEntity {
                entity: entity.to_string(),
            });
        }

        Ok(MemScope {
            entity: entity.to_string(),
            ops: Vec::new(),
        })
    }

    fn apply(&self, mut scope: Self::Scope, op: &FilterOp) -> Result<Self::Scope, StoreError> {
        const KNOWN: [&str; 7] = [
            ops::WHERE_EQ,
            ops::WHERE_NE,
            ops::WHERE_GT,
            ops::WHERE_LT,
            ops::WHERE_IN,
            ops::ORDER_BY,
            ops::ORDER_BY_DESC,
        ];

        if !KNOWN.contains(&op.operation()) {
            return Err(StoreError::UnsupportedOperation {
                operation: op.operation().to_string(),
            });
        }
        field_arg(op)?;

        scope.ops.push(op.clone());

        Ok(scope)
    }

    fn grouped_aggregate(
        &self,
        scope: Self::Scope,
        plan: &GroupedQueryPlan<'_>,
    ) -> Result<BTreeMap<Value, Value>, StoreError> {
        self.grouped_queries.fetch_add(1, Ordering::SeqCst);

        let mut pairs = self.candidates(&scope, plan.join, plan.group_column)?;
        pairs.retain(|(key, _)| plan.parent_ids.contains(key));

        if plan.distinct {
            if let Some(hop) = plan.join {
                let mut seen = BTreeSet::new();
                pairs.retain(|(key, row)| {
                    seen.insert((key.clone(), row.get(&hop.target_primary_key).clone()))
                });
            }
        }

        let mut groups: BTreeMap<Value, Vec<Row>> = BTreeMap::new();
        for (key, row) in pairs {
            groups.entry(key).or_default().push(row);
        }

        let mut mapping = BTreeMap::new();
        for (key, rows) in groups {
            if let Some(value) = aggregate_group(plan.function, plan.column, plan.distinct, &rows)?
            {
                mapping.insert(key, value);
            }
        }

        Ok(mapping)
    }

    fn materialize(
        &self,
        scope: Self::Scope,
        plan: &ParentScopePlan<'_>,
    ) -> Result<Vec<Row>, StoreError> {
        self.materializations.fetch_add(1, Ordering::SeqCst);

        let mut pairs = self.candidates(&scope, plan.join, plan.group_column)?;
        pairs.retain(|(key, _)| key == plan.parent_id);

        if plan.distinct {
            if let Some(hop) = plan.join {
                let mut seen = BTreeSet::new();
                pairs.retain(|(_, row)| seen.insert(row.get(&hop.target_primary_key).clone()));
            }
        }

        let mut rows: Vec<Row> = pairs.into_iter().map(|(_, row)| row).collect();
        sort_rows(&scope.ops, &mut rows)?;

        Ok(rows)
    }
}

// ----------------------------------------------------------------------
// Fixtures
// ----------------------------------------------------------------------

pub(crate) struct Author {
    pub(crate) id: u64,
}

impl EntityIdentity for Author {
    fn entity(&self) -> &'static str {
        "authors"
    }

    fn id(&self) -> Value {
        Value::Uint(self.id)
    }
}

/// Catalog for the shared fixture schema:
/// authors --posts--> posts (direct, author_id)
/// authors --tags--> tags through taggings (taggings.author_id / taggings.tag)
pub(crate) fn fixture_catalog() -> MemCatalog {
    MemCatalog::new()
        .entity("authors", "id")
        .entity("posts", "id")
        .entity("tags", "id")
        .entity("taggings", "id")
        .with_relation("authors", RelationModel::has_many("posts", "posts", "author_id"))
        .with_relation(
            "authors",
            RelationModel::has_many_through("tags", "tags", "taggings", "author_id", "tag"),
        )
        .with_relation("taggings", RelationModel::belongs_to("tag", "tags", "tag_id"))
}

fn post(id: u64, author_id: u64, label: &str, score: i64) -> Row {
    Row::new()
        .with("id", id)
        .with("author_id", author_id)
        .with("label", label)
        .with("score", score)
}

/// Five authors (1..=5) with five posts each, labels alternating so every
/// author has 3 "Even" and 2 "Odd" posts; author 6 exists with no posts.
pub(crate) fn posts_table() -> Vec<Row> {
    let mut rows = Vec::new();
    for author_id in 1..=5u64 {
        for index in 0..5u64 {
            let label = if index % 2 == 0 { "Even" } else { "Odd" };
            rows.push(post(
                author_id * 10 + index,
                author_id,
                label,
                i64::try_from(index).unwrap_or(0),
            ));
        }
    }

    rows
}

fn tagging(id: u64, author_id: u64, tag_id: u64) -> Row {
    Row::new()
        .with("id", id)
        .with("author_id", author_id)
        .with("tag_id", tag_id)
}

/// Author 1 reaches tags 1..=3 via two taggings each (six join rows);
/// author 2 reaches tag 1 once; author 3 has no taggings.
pub(crate) fn taggings_table() -> Vec<Row> {
    vec![
        tagging(1, 1, 1),
        tagging(2, 1, 1),
        tagging(3, 1, 2),
        tagging(4, 1, 2),
        tagging(5, 1, 3),
        tagging(6, 1, 3),
        tagging(7, 2, 1),
    ]
}

pub(crate) fn tags_table() -> Vec<Row> {
    vec![
        Row::new().with("id", 1u64).with("label", "rust"),
        Row::new().with("id", 2u64).with("label", "sql"),
        Row::new().with("id", 3u64).with("label", "batch"),
    ]
}

pub(crate) fn fixture_store() -> MemStore {
    MemStore::new()
        .with_table("posts", posts_table())
        .with_table("taggings", taggings_table())
        .with_table("tags", tags_table())
        .with_table("authors", Vec::new())
}
