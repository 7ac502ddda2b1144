//! Tests for reference resolution

use super::*;
use crate::model::{ReferenceStatus, UnresolvedReason};
use crate::report::RecordKind;
use schemagraph_core::{CanonicalName, IdentifierResolver, QualifiedKey, SortDirection};
use std::collections::HashSet;

fn name(value: &str) -> CanonicalName {
    IdentifierResolver::default().normalize(value, false).unwrap()
}

fn table(schema: &str, table: &str) -> QualifiedKey {
    QualifiedKey::for_object(None, Some(name(schema)), name(table))
}

fn column(schema: &str, table_name: &str, column: &str) -> QualifiedKey {
    table(schema, table_name).with_column(name(column))
}

#[derive(Default)]
struct FakeLookup {
    tables: HashSet<QualifiedKey>,
    columns: HashSet<QualifiedKey>,
    excluded: HashSet<QualifiedKey>,
}

impl FakeLookup {
    fn with_table(mut self, schema: &str, table_name: &str, columns: &[&str]) -> Self {
        self.tables.insert(table(schema, table_name));
        for c in columns {
            self.columns.insert(column(schema, table_name, c));
        }
        self
    }

    fn with_excluded(mut self, key: QualifiedKey) -> Self {
        self.excluded.insert(key);
        self
    }
}

impl ReferenceLookup for FakeLookup {
    fn has_table(&self, table: &QualifiedKey) -> bool {
        self.tables.contains(table)
    }

    fn has_column(&self, column: &QualifiedKey) -> bool {
        self.columns.contains(column)
    }

    fn is_excluded(&self, key: &QualifiedKey) -> bool {
        self.excluded.contains(key)
    }
}

fn fk_column(
    name: Option<&str>,
    child: QualifiedKey,
    parent: QualifiedKey,
    key_sequence: usize,
) -> StagedForeignKeyColumn {
    StagedForeignKeyColumn {
        name: name.map(str::to_string),
        child,
        parent,
        key_sequence,
        update_rule: None,
        delete_rule: None,
    }
}

fn shop_lookup() -> FakeLookup {
    FakeLookup::default()
        .with_table("sales", "customers", &["id", "region"])
        .with_table("sales", "orders", &["id", "customer_id", "customer_region"])
}

// ============ Foreign Key Tests ============

mod foreign_key_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_resolves_when_both_endpoints_exist() {
        let staged = StagedReferences {
            foreign_keys: vec![fk_column(
                Some("fk_orders_customer"),
                column("sales", "orders", "customer_id"),
                column("sales", "customers", "id"),
                1,
            )],
            ..Default::default()
        };

        let resolution = ReferenceResolver::new().resolve(staged, &shop_lookup());

        assert_eq!(resolution.foreign_keys.len(), 1);
        let fk = &resolution.foreign_keys[0];
        assert!(fk.is_resolved());
        assert!(!fk.synthetic_name);
        assert_eq!(fk.name(), "fk_orders_customer");
        assert_eq!(fk.child_table, table("sales", "orders"));
        assert_eq!(fk.parent_table, table("sales", "customers"));
        assert_eq!(resolution.report.resolved_count(), 1);
        assert_eq!(resolution.report.unresolved_count(), 0);
    }

    #[test]
    fn test_column_pairs_follow_key_sequence() {
        let staged = StagedReferences {
            foreign_keys: vec![
                fk_column(
                    Some("fk_composite"),
                    column("sales", "orders", "customer_region"),
                    column("sales", "customers", "region"),
                    2,
                ),
                fk_column(
                    Some("fk_composite"),
                    column("sales", "orders", "customer_id"),
                    column("sales", "customers", "id"),
                    1,
                ),
            ],
            ..Default::default()
        };

        let resolution = ReferenceResolver::new().resolve(staged, &shop_lookup());

        let fk = &resolution.foreign_keys[0];
        let children: Vec<String> = fk.column_pairs.iter().map(|p| p.child.to_string()).collect();
        assert_eq!(
            children,
            vec!["sales.orders.customer_id", "sales.orders.customer_region"]
        );
    }

    #[test]
    fn test_missing_parent_column_is_unresolved() {
        let staged = StagedReferences {
            foreign_keys: vec![fk_column(
                Some("fk_orders_customer"),
                column("sales", "orders", "customer_id"),
                column("sales", "customers", "uuid"),
                1,
            )],
            ..Default::default()
        };

        let resolution = ReferenceResolver::new().resolve(staged, &shop_lookup());

        let fk = &resolution.foreign_keys[0];
        assert_eq!(
            fk.status,
            ReferenceStatus::Unresolved {
                reason: UnresolvedReason::ColumnNotFound,
                missing: vec![column("sales", "customers", "uuid")],
            }
        );
        assert_eq!(resolution.report.unresolved_count(), 1);
        assert_eq!(resolution.report.unresolved[0].foreign_key, fk.id);
    }

    #[test]
    fn test_missing_parent_table_is_unresolved() {
        let staged = StagedReferences {
            foreign_keys: vec![fk_column(
                Some("fk_orders_invoice"),
                column("sales", "orders", "id"),
                column("billing", "invoices", "order_id"),
                1,
            )],
            ..Default::default()
        };

        let resolution = ReferenceResolver::new().resolve(staged, &shop_lookup());

        let fk = &resolution.foreign_keys[0];
        assert!(!fk.is_resolved());
        assert_eq!(resolution.report.unresolved[0].reason, UnresolvedReason::TableNotFound);
    }

    #[test]
    fn test_excluded_parent_table_is_target_excluded() {
        let lookup = shop_lookup().with_excluded(table("audit", "events"));
        let staged = StagedReferences {
            foreign_keys: vec![fk_column(
                Some("fk_orders_event"),
                column("sales", "orders", "id"),
                column("audit", "events", "order_id"),
                1,
            )],
            ..Default::default()
        };

        let resolution = ReferenceResolver::new().resolve(staged, &lookup);

        assert_eq!(
            resolution.report.unresolved[0].reason,
            UnresolvedReason::TargetExcluded
        );
    }

    #[test]
    fn test_missing_child_table_drops_foreign_key() {
        let staged = StagedReferences {
            foreign_keys: vec![fk_column(
                Some("fk_refunds_order"),
                column("sales", "refunds", "order_id"),
                column("sales", "orders", "id"),
                1,
            )],
            ..Default::default()
        };

        let resolution = ReferenceResolver::new().resolve(staged, &shop_lookup());

        assert!(resolution.foreign_keys.is_empty());
        assert_eq!(resolution.report.dropped_count(), 1);
        assert_eq!(resolution.report.dropped[0].kind, RecordKind::ForeignKey);
        assert_eq!(resolution.report.dropped[0].missing, vec![table("sales", "refunds")]);
    }

    #[test]
    fn test_unnamed_foreign_key_gets_synthetic_name() {
        let staged = StagedReferences {
            foreign_keys: vec![fk_column(
                None,
                column("sales", "orders", "customer_id"),
                column("sales", "customers", "id"),
                1,
            )],
            ..Default::default()
        };

        let resolution = ReferenceResolver::new().resolve(staged, &shop_lookup());

        let fk = &resolution.foreign_keys[0];
        assert!(fk.synthetic_name);
        assert_eq!(fk.name(), "fk_orders_customers");
        assert!(fk.is_resolved());
    }

    #[test]
    fn test_unnamed_foreign_keys_to_same_table_stay_separate() {
        let rows = vec![
            fk_column(
                None,
                column("sales", "orders", "customer_region"),
                column("sales", "customers", "region"),
                1,
            ),
            fk_column(
                None,
                column("sales", "orders", "customer_id"),
                column("sales", "customers", "id"),
                1,
            ),
        ];
        let mut reversed = rows.clone();
        reversed.reverse();

        for rows in [rows, reversed] {
            let staged = StagedReferences {
                foreign_keys: rows,
                ..Default::default()
            };
            let resolution = ReferenceResolver::new().resolve(staged, &shop_lookup());

            let keys: Vec<(&str, String)> = resolution
                .foreign_keys
                .iter()
                .map(|fk| (fk.name(), fk.column_pairs[0].child.to_string()))
                .collect();
            assert_eq!(
                keys,
                vec![
                    ("fk_orders_customers", "sales.orders.customer_id".to_string()),
                    ("fk_orders_customers_2", "sales.orders.customer_region".to_string()),
                ]
            );
            assert!(resolution.foreign_keys.iter().all(|fk| fk.synthetic_name));
            assert!(resolution.duplicates.is_empty());
        }
    }

    #[test]
    fn test_repeated_unnamed_row_is_reported_once() {
        let row = fk_column(
            None,
            column("sales", "orders", "customer_id"),
            column("sales", "customers", "id"),
            1,
        );
        let staged = StagedReferences {
            foreign_keys: vec![row.clone(), row],
            ..Default::default()
        };

        let resolution = ReferenceResolver::new().resolve(staged, &shop_lookup());

        assert_eq!(resolution.foreign_keys.len(), 1);
        assert_eq!(resolution.duplicates.len(), 1);
        assert_eq!(resolution.duplicates[0].kind, RecordKind::ForeignKey);
    }

    #[test]
    fn test_replaced_named_pair_is_reported() {
        let staged = StagedReferences {
            foreign_keys: vec![
                fk_column(
                    Some("fk_customer"),
                    column("sales", "orders", "customer_id"),
                    column("sales", "customers", "id"),
                    1,
                ),
                fk_column(
                    Some("fk_customer"),
                    column("sales", "orders", "customer_region"),
                    column("sales", "customers", "region"),
                    1,
                ),
            ],
            ..Default::default()
        };

        let resolution = ReferenceResolver::new().resolve(staged, &shop_lookup());

        assert_eq!(resolution.foreign_keys.len(), 1);
        assert_eq!(resolution.foreign_keys[0].column_pairs.len(), 1);
        assert_eq!(resolution.duplicates.len(), 1);
        assert_eq!(resolution.duplicates[0].kind, RecordKind::ForeignKey);
        assert_eq!(
            resolution.duplicates[0].key,
            column("sales", "orders", "customer_region")
        );
    }

    #[test]
    fn test_processing_order_is_independent_of_input_order() {
        let rows = vec![
            fk_column(
                Some("fk_b"),
                column("sales", "orders", "customer_id"),
                column("sales", "customers", "id"),
                1,
            ),
            fk_column(
                Some("fk_a"),
                column("sales", "orders", "customer_region"),
                column("sales", "customers", "region"),
                1,
            ),
        ];
        let mut reversed = rows.clone();
        reversed.reverse();

        let forward = ReferenceResolver::new().resolve(
            StagedReferences {
                foreign_keys: rows,
                ..Default::default()
            },
            &shop_lookup(),
        );
        let backward = ReferenceResolver::new().resolve(
            StagedReferences {
                foreign_keys: reversed,
                ..Default::default()
            },
            &shop_lookup(),
        );

        assert_eq!(forward.report.resolved, backward.report.resolved);
        let names: Vec<&str> = forward.foreign_keys.iter().map(|fk| fk.name()).collect();
        assert_eq!(names, vec!["fk_a", "fk_b"]);
    }
}

// ============ Index and Primary Key Tests ============

mod index_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn index_column(index: &str, col: &str, ordinal: usize) -> StagedIndexColumn {
        StagedIndexColumn {
            table: table("sales", "orders"),
            name: index.to_string(),
            unique: None,
            column: column("sales", "orders", col),
            ordinal,
            direction: SortDirection::Ascending,
        }
    }

    #[test]
    fn test_index_columns_are_ordered() {
        let mut second = index_column("idx_customer", "customer_region", 2);
        second.unique = Some(true);
        let staged = StagedReferences {
            indexes: vec![second, index_column("idx_customer", "customer_id", 1)],
            ..Default::default()
        };

        let resolution = ReferenceResolver::new().resolve(staged, &shop_lookup());

        assert_eq!(resolution.indexes.len(), 1);
        let index = &resolution.indexes[0];
        assert!(index.unique);
        assert_eq!(index.columns[0].column, column("sales", "orders", "customer_id"));
        assert_eq!(index.columns[1].column, column("sales", "orders", "customer_region"));
    }

    #[test]
    fn test_replaced_index_ordinal_is_reported() {
        let staged = StagedReferences {
            indexes: vec![
                index_column("idx_customer", "customer_id", 1),
                index_column("idx_customer", "customer_region", 1),
            ],
            ..Default::default()
        };

        let resolution = ReferenceResolver::new().resolve(staged, &shop_lookup());

        assert_eq!(resolution.indexes[0].columns.len(), 1);
        assert_eq!(resolution.duplicates.len(), 1);
        assert_eq!(resolution.duplicates[0].kind, RecordKind::Index);
        assert_eq!(
            resolution.duplicates[0].key,
            column("sales", "orders", "customer_region")
        );
    }

    #[test]
    fn test_index_with_missing_column_is_dropped() {
        let staged = StagedReferences {
            indexes: vec![
                index_column("idx_status", "status", 1),
                index_column("idx_id", "id", 1),
            ],
            ..Default::default()
        };

        let resolution = ReferenceResolver::new().resolve(staged, &shop_lookup());

        assert_eq!(resolution.indexes.len(), 1);
        assert_eq!(resolution.indexes[0].name, "idx_id");
        assert!(!resolution.indexes[0].unique);
        assert_eq!(resolution.report.dropped[0].kind, RecordKind::Index);
        assert_eq!(resolution.report.dropped[0].name, "idx_status");
    }

    #[test]
    fn test_primary_key_grouped_by_table() {
        let staged = StagedReferences {
            primary_keys: vec![
                StagedPrimaryKeyColumn {
                    table: table("sales", "customers"),
                    name: Some("pk_customers".to_string()),
                    column: column("sales", "customers", "region"),
                    key_sequence: 2,
                },
                StagedPrimaryKeyColumn {
                    table: table("sales", "customers"),
                    name: Some("pk_customers".to_string()),
                    column: column("sales", "customers", "id"),
                    key_sequence: 1,
                },
            ],
            ..Default::default()
        };

        let resolution = ReferenceResolver::new().resolve(staged, &shop_lookup());

        assert_eq!(resolution.primary_keys.len(), 1);
        let pk = &resolution.primary_keys[0];
        assert_eq!(pk.name.as_deref(), Some("pk_customers"));
        assert_eq!(
            pk.columns,
            vec![
                column("sales", "customers", "id"),
                column("sales", "customers", "region")
            ]
        );
    }

    #[test]
    fn test_empty_input_resolves_to_nothing() {
        let resolution =
            ReferenceResolver::new().resolve(StagedReferences::default(), &shop_lookup());
        assert!(resolution.foreign_keys.is_empty());
        assert!(resolution.indexes.is_empty());
        assert_eq!(resolution.report.dropped_count(), 0);
    }
}
