//! Foreign key, index and primary key resolution

use crate::model::{
    ColumnPair, ForeignKey, ForeignKeyId, Index, IndexColumn, PrimaryKey, ReferenceStatus,
    UnresolvedReason,
};
use crate::report::{DuplicateRecord, RecordKind};
use schemagraph_core::{ForeignKeyAction, QualifiedKey, SortDirection};
use serde::Serialize;
use std::collections::BTreeMap;

/// Existence checks the resolver needs from the graph under construction
pub trait ReferenceLookup {
    fn has_table(&self, table: &QualifiedKey) -> bool;

    fn has_column(&self, column: &QualifiedKey) -> bool;

    /// Whether the key, or one of its ancestors, was removed by the inclusion policy
    fn is_excluded(&self, key: &QualifiedKey) -> bool;
}

/// One normalized foreign key column pair
#[derive(Debug, Clone)]
pub struct StagedForeignKeyColumn {
    /// Canonical key name, `None` when the source left it unnamed
    pub name: Option<String>,
    /// Column key in the declaring table
    pub child: QualifiedKey,
    /// Column key in the referenced table
    pub parent: QualifiedKey,
    pub key_sequence: usize,
    pub update_rule: Option<ForeignKeyAction>,
    pub delete_rule: Option<ForeignKeyAction>,
}

/// One normalized index column
#[derive(Debug, Clone)]
pub struct StagedIndexColumn {
    pub table: QualifiedKey,
    pub name: String,
    pub unique: Option<bool>,
    pub column: QualifiedKey,
    pub ordinal: usize,
    pub direction: SortDirection,
}

/// One normalized primary key column
#[derive(Debug, Clone)]
pub struct StagedPrimaryKeyColumn {
    pub table: QualifiedKey,
    pub name: Option<String>,
    pub column: QualifiedKey,
    pub key_sequence: usize,
}

/// Everything staged during ingestion, partitioned by reference kind
#[derive(Debug, Clone, Default)]
pub struct StagedReferences {
    pub foreign_keys: Vec<StagedForeignKeyColumn>,
    pub indexes: Vec<StagedIndexColumn>,
    pub primary_keys: Vec<StagedPrimaryKeyColumn>,
}

impl StagedReferences {
    pub fn is_empty(&self) -> bool {
        self.foreign_keys.is_empty() && self.indexes.is_empty() && self.primary_keys.is_empty()
    }
}

/// A foreign key kept in unresolved form
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnresolvedReference {
    pub foreign_key: ForeignKeyId,
    pub reason: UnresolvedReason,
    /// Endpoint columns that could not be located
    pub missing: Vec<QualifiedKey>,
}

/// A staged reference excluded from the graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DroppedReference {
    pub kind: RecordKind,
    pub table: QualifiedKey,
    pub name: String,
    pub missing: Vec<QualifiedKey>,
}

/// Outcome of the resolution pass, in (catalog, schema, table, name) order
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResolutionReport {
    pub resolved: Vec<ForeignKeyId>,
    pub unresolved: Vec<UnresolvedReference>,
    pub dropped: Vec<DroppedReference>,
}

impl ResolutionReport {
    pub fn resolved_count(&self) -> usize {
        self.resolved.len()
    }

    pub fn unresolved_count(&self) -> usize {
        self.unresolved.len()
    }

    pub fn dropped_count(&self) -> usize {
        self.dropped.len()
    }
}

/// Linked references ready to attach to their tables
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    pub foreign_keys: Vec<ForeignKey>,
    pub indexes: Vec<Index>,
    pub primary_keys: Vec<PrimaryKey>,
    /// Staged columns that replaced an earlier one at the same position
    pub duplicates: Vec<DuplicateRecord>,
    pub report: ResolutionReport,
}

#[derive(Debug, Default)]
struct ForeignKeyGroup {
    synthetic_name: bool,
    pairs: BTreeMap<usize, ColumnPair>,
    update_rule: Option<ForeignKeyAction>,
    delete_rule: Option<ForeignKeyAction>,
}

#[derive(Debug, Default)]
struct IndexGroup {
    unique: Option<bool>,
    columns: BTreeMap<usize, IndexColumn>,
}

#[derive(Debug, Default)]
struct PrimaryKeyGroup {
    name: Option<String>,
    columns: BTreeMap<usize, QualifiedKey>,
}

/// Turns staged references into linked graph entities
#[derive(Debug, Clone, Default)]
pub struct ReferenceResolver;

impl ReferenceResolver {
    pub fn new() -> Self {
        Self
    }

    /// Resolve all staged references in a single deterministic pass
    pub fn resolve(&self, staged: StagedReferences, lookup: &dyn ReferenceLookup) -> Resolution {
        let mut resolution = Resolution::default();
        self.resolve_foreign_keys(staged.foreign_keys, lookup, &mut resolution);
        self.resolve_indexes(staged.indexes, lookup, &mut resolution);
        self.resolve_primary_keys(staged.primary_keys, lookup, &mut resolution);

        tracing::debug!(
            resolved = resolution.report.resolved_count(),
            unresolved = resolution.report.unresolved_count(),
            dropped = resolution.report.dropped_count(),
            duplicates = resolution.duplicates.len(),
            "resolved references"
        );
        resolution
    }

    fn resolve_foreign_keys(
        &self,
        mut staged: Vec<StagedForeignKeyColumn>,
        lookup: &dyn ReferenceLookup,
        resolution: &mut Resolution,
    ) {
        // Unnamed keys are numbered in this order, independent of arrival
        staged.sort_by(|a, b| {
            a.key_sequence
                .cmp(&b.key_sequence)
                .then_with(|| a.child.cmp(&b.child))
                .then_with(|| a.parent.cmp(&b.parent))
        });

        // BTreeMap keyed by id gives the (catalog, schema, table, name) order
        let mut groups: BTreeMap<ForeignKeyId, ForeignKeyGroup> = BTreeMap::new();

        for column in staged {
            let Some(child_table) = column.child.object_key() else {
                continue;
            };
            let pair = ColumnPair {
                child: column.child,
                parent: column.parent,
            };
            let named = column
                .name
                .as_deref()
                .map(str::trim)
                .filter(|name| !name.is_empty());
            let (id, synthetic_name) = match named {
                Some(name) => {
                    let id = ForeignKeyId {
                        table: child_table,
                        name: name.to_string(),
                    };
                    (id, false)
                }
                None => {
                    let id =
                        unnamed_foreign_key_id(&groups, child_table, column.key_sequence, &pair);
                    (id, true)
                }
            };
            let group = groups.entry(id).or_default();
            group.synthetic_name = synthetic_name;
            group.update_rule = group.update_rule.or(column.update_rule);
            group.delete_rule = group.delete_rule.or(column.delete_rule);

            let child = pair.child.clone();
            if let Some(previous) = group.pairs.insert(column.key_sequence, pair) {
                tracing::warn!(
                    column = %previous.child,
                    key_sequence = column.key_sequence,
                    "duplicate foreign key column, keeping the last one"
                );
                resolution.duplicates.push(DuplicateRecord {
                    kind: RecordKind::ForeignKey,
                    key: child,
                });
            }
        }

        for (id, group) in groups {
            if !lookup.has_table(&id.table) {
                tracing::warn!(foreign_key = %id, "declaring table missing, dropping foreign key");
                resolution.report.dropped.push(DroppedReference {
                    kind: RecordKind::ForeignKey,
                    table: id.table.clone(),
                    name: id.name.clone(),
                    missing: vec![id.table.clone()],
                });
                continue;
            }

            let column_pairs: Vec<ColumnPair> = group.pairs.into_values().collect();
            let parent_table = column_pairs
                .first()
                .and_then(|pair| pair.parent.object_key())
                .unwrap_or_else(|| id.table.clone());

            let mut missing = Vec::new();
            for pair in &column_pairs {
                if !lookup.has_column(&pair.child) {
                    missing.push(pair.child.clone());
                }
                if !lookup.has_column(&pair.parent) {
                    missing.push(pair.parent.clone());
                }
            }

            let status = if missing.is_empty() {
                resolution.report.resolved.push(id.clone());
                ReferenceStatus::Resolved
            } else {
                let reason = if lookup.is_excluded(&parent_table) {
                    UnresolvedReason::TargetExcluded
                } else if missing
                    .iter()
                    .filter_map(QualifiedKey::object_key)
                    .any(|table| !lookup.has_table(&table))
                {
                    UnresolvedReason::TableNotFound
                } else {
                    UnresolvedReason::ColumnNotFound
                };
                tracing::warn!(
                    foreign_key = %id,
                    ?reason,
                    missing = missing.len(),
                    "unresolved foreign key"
                );
                resolution.report.unresolved.push(UnresolvedReference {
                    foreign_key: id.clone(),
                    reason,
                    missing: missing.clone(),
                });
                ReferenceStatus::Unresolved { reason, missing }
            };

            resolution.foreign_keys.push(ForeignKey {
                child_table: id.table.clone(),
                id,
                synthetic_name: group.synthetic_name,
                parent_table,
                column_pairs,
                update_rule: group.update_rule,
                delete_rule: group.delete_rule,
                status,
            });
        }
    }

    fn resolve_indexes(
        &self,
        staged: Vec<StagedIndexColumn>,
        lookup: &dyn ReferenceLookup,
        resolution: &mut Resolution,
    ) {
        let mut groups: BTreeMap<(QualifiedKey, String), IndexGroup> = BTreeMap::new();
        for column in staged {
            let group = groups
                .entry((column.table.clone(), column.name.clone()))
                .or_default();
            group.unique = group.unique.or(column.unique);
            let key = column.column.clone();
            let replaced = group.columns.insert(
                column.ordinal,
                IndexColumn {
                    column: column.column,
                    direction: column.direction,
                },
            );
            if replaced.is_some() {
                tracing::warn!(
                    index = %column.name,
                    ordinal = column.ordinal,
                    "duplicate index column, keeping the last one"
                );
                resolution.duplicates.push(DuplicateRecord {
                    kind: RecordKind::Index,
                    key,
                });
            }
        }

        for ((table, name), group) in groups {
            let columns: Vec<IndexColumn> = group.columns.into_values().collect();
            let missing = missing_columns(&table, columns.iter().map(|c| &c.column), lookup);
            if !missing.is_empty() {
                tracing::warn!(
                    table = %table,
                    index = %name,
                    "index columns missing, dropping index"
                );
                resolution.report.dropped.push(DroppedReference {
                    kind: RecordKind::Index,
                    table,
                    name,
                    missing,
                });
                continue;
            }
            resolution.indexes.push(Index {
                name,
                table,
                unique: group.unique.unwrap_or(false),
                columns,
            });
        }
    }

    fn resolve_primary_keys(
        &self,
        staged: Vec<StagedPrimaryKeyColumn>,
        lookup: &dyn ReferenceLookup,
        resolution: &mut Resolution,
    ) {
        let mut groups: BTreeMap<QualifiedKey, PrimaryKeyGroup> = BTreeMap::new();
        for column in staged {
            let group = groups.entry(column.table.clone()).or_default();
            if group.name.is_none() {
                group.name = column.name;
            }
            let key = column.column.clone();
            if group.columns.insert(column.key_sequence, column.column).is_some() {
                tracing::warn!(
                    table = %column.table,
                    key_sequence = column.key_sequence,
                    "duplicate primary key column, keeping the last one"
                );
                resolution.duplicates.push(DuplicateRecord {
                    kind: RecordKind::PrimaryKey,
                    key,
                });
            }
        }

        for (table, group) in groups {
            let columns: Vec<QualifiedKey> = group.columns.into_values().collect();
            let missing = missing_columns(&table, columns.iter(), lookup);
            if !missing.is_empty() {
                tracing::warn!(table = %table, "primary key columns missing, dropping primary key");
                resolution.report.dropped.push(DroppedReference {
                    kind: RecordKind::PrimaryKey,
                    table,
                    name: group.name.unwrap_or_default(),
                    missing,
                });
                continue;
            }
            resolution.primary_keys.push(PrimaryKey {
                name: group.name,
                table,
                columns,
            });
        }
    }
}

/// Missing columns of a table-scoped reference; the table itself when absent
fn missing_columns<'a>(
    table: &QualifiedKey,
    columns: impl Iterator<Item = &'a QualifiedKey>,
    lookup: &dyn ReferenceLookup,
) -> Vec<QualifiedKey> {
    if !lookup.has_table(table) {
        return vec![table.clone()];
    }
    columns
        .filter(|column| !lookup.has_column(column))
        .cloned()
        .collect()
}

fn synthetic_foreign_key_name(child: &QualifiedKey, parent: &QualifiedKey) -> String {
    let child_table = child.object().map(|n| n.as_str()).unwrap_or("unknown");
    let parent_table = parent.object().map(|n| n.as_str()).unwrap_or("unknown");
    format!("fk_{}_{}", child_table, parent_table)
}

/// Group an unnamed foreign key column belongs to
///
/// Unnamed keys between the same two tables share a synthetic name. A pair
/// whose key sequence is already taken by a different pair starts the next
/// numbered key, so `fk_orders_users` is followed by `fk_orders_users_2`.
fn unnamed_foreign_key_id(
    groups: &BTreeMap<ForeignKeyId, ForeignKeyGroup>,
    table: QualifiedKey,
    key_sequence: usize,
    pair: &ColumnPair,
) -> ForeignKeyId {
    let base = synthetic_foreign_key_name(&pair.child, &pair.parent);
    let mut number = 1;
    loop {
        let name = match number {
            1 => base.clone(),
            n => format!("{}_{}", base, n),
        };
        let id = ForeignKeyId {
            table: table.clone(),
            name,
        };
        match groups.get(&id).and_then(|group| group.pairs.get(&key_sequence)) {
            Some(existing) if existing != pair => number += 1,
            _ => return id,
        }
    }
}
