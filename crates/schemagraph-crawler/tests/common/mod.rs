//! Common test utilities for crawler integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use schemagraph_core::*;
use schemagraph_crawler::CrawlCancelHandle;
use std::sync::Arc;
use std::sync::Once;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Route crawler logs through the test writer; `RUST_LOG` overrides the level
pub fn init_tracing() {
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .finish();

        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}

/// Compare keys by the spelling the source reported
///
/// Scopes come back folded by whatever policy the crawl uses, so a source
/// matches them on [`CanonicalName::raw`] rather than on canonical values.
fn same_spelling(left: &QualifiedKey, right: &QualifiedKey) -> bool {
    let raw = |key: &QualifiedKey| -> Vec<String> {
        key.parts().iter().map(|part| part.raw().to_string()).collect()
    };
    left.level() == right.level() && raw(left) == raw(right)
}

/// In-memory metadata source serving fixed records
///
/// Every call is appended to `call_log` as `"<operation> <scope>"`, and the
/// peak number of concurrent calls is tracked in `max_in_flight`.
#[derive(Clone, Default)]
pub struct MockSource {
    pub policy: IdentifierPolicy,
    pub catalogs: Vec<CatalogRecord>,
    pub schemas: Vec<SchemaRecord>,
    pub tables: Vec<TableRecord>,
    pub columns: Vec<ColumnRecord>,
    pub foreign_keys: Vec<ForeignKeyRecord>,
    pub indexes: Vec<IndexRecord>,
    pub primary_keys: Vec<PrimaryKeyRecord>,
    pub procedures: Vec<ProcedureRecord>,
    pub parameters: Vec<ParameterRecord>,
    /// Operations that fail with a query error
    pub failing: Vec<&'static str>,
    /// Cancel the given handle whenever the operation is called
    pub cancel_on: Option<(&'static str, CrawlCancelHandle)>,
    /// Panic inside the operation for scopes containing the given text
    pub panic_on: Option<(&'static str, &'static str)>,
    pub delay: Option<Duration>,
    pub call_log: Arc<Mutex<Vec<String>>>,
    pub in_flight: Arc<AtomicUsize>,
    pub max_in_flight: Arc<AtomicUsize>,
}

impl MockSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(mut self, policy: IdentifierPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_catalogs(mut self, catalogs: Vec<CatalogRecord>) -> Self {
        self.catalogs = catalogs;
        self
    }

    pub fn with_schemas(mut self, schemas: Vec<SchemaRecord>) -> Self {
        self.schemas = schemas;
        self
    }

    pub fn with_tables(mut self, tables: Vec<TableRecord>) -> Self {
        self.tables = tables;
        self
    }

    pub fn with_columns(mut self, columns: Vec<ColumnRecord>) -> Self {
        self.columns = columns;
        self
    }

    pub fn with_foreign_keys(mut self, foreign_keys: Vec<ForeignKeyRecord>) -> Self {
        self.foreign_keys = foreign_keys;
        self
    }

    pub fn with_indexes(mut self, indexes: Vec<IndexRecord>) -> Self {
        self.indexes = indexes;
        self
    }

    pub fn with_primary_keys(mut self, primary_keys: Vec<PrimaryKeyRecord>) -> Self {
        self.primary_keys = primary_keys;
        self
    }

    pub fn with_procedures(mut self, procedures: Vec<ProcedureRecord>) -> Self {
        self.procedures = procedures;
        self
    }

    pub fn with_parameters(mut self, parameters: Vec<ParameterRecord>) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn failing_on(mut self, operation: &'static str) -> Self {
        self.failing.push(operation);
        self
    }

    pub fn cancelling_on(mut self, operation: &'static str, handle: CrawlCancelHandle) -> Self {
        self.cancel_on = Some((operation, handle));
        self
    }

    pub fn panicking_on(mut self, operation: &'static str, scope: &'static str) -> Self {
        self.panic_on = Some((operation, scope));
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Same records, served in reverse order
    pub fn reversed(mut self) -> Self {
        self.catalogs.reverse();
        self.schemas.reverse();
        self.tables.reverse();
        self.columns.reverse();
        self.foreign_keys.reverse();
        self.indexes.reverse();
        self.primary_keys.reverse();
        self.procedures.reverse();
        self.parameters.reverse();
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.call_log.lock().clone()
    }

    pub fn calls_to(&self, operation: &str) -> usize {
        self.call_log
            .lock()
            .iter()
            .filter(|call| call.starts_with(operation))
            .count()
    }

    pub fn peak_concurrency(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn resolver(&self) -> IdentifierResolver {
        IdentifierResolver::new(self.policy.clone())
    }

    fn in_schema(
        &self,
        catalog: &RawIdentifier,
        schema: &RawIdentifier,
        scope: &QualifiedKey,
    ) -> bool {
        self.resolver()
            .schema_key(catalog, schema)
            .is_ok_and(|key| same_spelling(&key, scope))
    }

    fn is_table(&self, table: &TableRef, scope: &QualifiedKey) -> bool {
        self.resolver()
            .object_key(&table.catalog, &table.schema, &table.name, NamePosition::Table)
            .is_ok_and(|key| same_spelling(&key, scope))
    }

    async fn serve<T>(
        &self,
        operation: &'static str,
        scope: String,
        records: Vec<T>,
    ) -> SourceResult<Vec<T>> {
        self.call_log.lock().push(format!("{} {}", operation, scope));
        if let Some((panic_operation, panic_scope)) = self.panic_on {
            if panic_operation == operation && scope.contains(panic_scope) {
                panic!("{} crashed for {}", operation, scope);
            }
        }

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        if let Some((cancel_operation, handle)) = &self.cancel_on {
            if *cancel_operation == operation {
                handle.cancel();
            }
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing.contains(&operation) {
            return Err(SourceError::Query(format!("{} unavailable", operation)));
        }
        Ok(records)
    }
}

#[async_trait]
impl MetadataSource for MockSource {
    fn name(&self) -> &str {
        "mock"
    }

    fn identifier_policy(&self) -> IdentifierPolicy {
        self.policy.clone()
    }

    async fn fetch_catalogs(&self) -> SourceResult<Vec<CatalogRecord>> {
        self.serve("fetch_catalogs", String::new(), self.catalogs.clone())
            .await
    }

    async fn fetch_schemas(&self, catalog: &QualifiedKey) -> SourceResult<Vec<SchemaRecord>> {
        let resolver = self.resolver();
        let records = self
            .schemas
            .iter()
            .filter(|s| {
                resolver
                    .normalize_at(&s.catalog, NamePosition::Catalog)
                    .is_ok_and(|name| same_spelling(&QualifiedKey::for_catalog(name), catalog))
            })
            .cloned()
            .collect();
        self.serve("fetch_schemas", catalog.to_string(), records).await
    }

    async fn fetch_tables(&self, schema: &QualifiedKey) -> SourceResult<Vec<TableRecord>> {
        let records = self
            .tables
            .iter()
            .filter(|t| self.in_schema(&t.catalog, &t.schema, schema))
            .cloned()
            .collect();
        self.serve("fetch_tables", schema.to_string(), records).await
    }

    async fn fetch_columns(&self, table: &QualifiedKey) -> SourceResult<Vec<ColumnRecord>> {
        let records = self
            .columns
            .iter()
            .filter(|c| {
                let owner = TableRef::new(c.catalog.clone(), c.schema.clone(), c.table.clone());
                self.is_table(&owner, table)
            })
            .cloned()
            .collect();
        self.serve("fetch_columns", table.to_string(), records).await
    }

    async fn fetch_foreign_keys(
        &self,
        schema: &QualifiedKey,
    ) -> SourceResult<Vec<ForeignKeyRecord>> {
        let records = self
            .foreign_keys
            .iter()
            .filter(|fk| {
                let child = &fk.child.table;
                self.in_schema(&child.catalog, &child.schema, schema)
            })
            .cloned()
            .collect();
        self.serve("fetch_foreign_keys", schema.to_string(), records)
            .await
    }

    async fn fetch_indexes(&self, table: &QualifiedKey) -> SourceResult<Vec<IndexRecord>> {
        let records = self
            .indexes
            .iter()
            .filter(|index| self.is_table(&index.table, table))
            .cloned()
            .collect();
        self.serve("fetch_indexes", table.to_string(), records).await
    }

    async fn fetch_primary_keys(
        &self,
        table: &QualifiedKey,
    ) -> SourceResult<Vec<PrimaryKeyRecord>> {
        let records = self
            .primary_keys
            .iter()
            .filter(|pk| self.is_table(&pk.table, table))
            .cloned()
            .collect();
        self.serve("fetch_primary_keys", table.to_string(), records)
            .await
    }

    async fn fetch_procedures(
        &self,
        schema: &QualifiedKey,
    ) -> SourceResult<Vec<ProcedureRecord>> {
        let records = self
            .procedures
            .iter()
            .filter(|p| self.in_schema(&p.catalog, &p.schema, schema))
            .cloned()
            .collect();
        self.serve("fetch_procedures", schema.to_string(), records)
            .await
    }

    async fn fetch_parameters(
        &self,
        procedure: &QualifiedKey,
        specific_name: Option<&str>,
    ) -> SourceResult<Vec<ParameterRecord>> {
        let resolver = self.resolver();
        let records = self
            .parameters
            .iter()
            .filter(|p| {
                resolver
                    .object_key(&p.catalog, &p.schema, &p.procedure, NamePosition::Procedure)
                    .is_ok_and(|key| same_spelling(&key, procedure))
            })
            .filter(|p| specific_name.is_none() || p.specific_name.as_deref() == specific_name)
            .cloned()
            .collect();
        self.serve("fetch_parameters", procedure.to_string(), records)
            .await
    }
}

/// One catalog `shop` with a `sales` schema of two linked tables
///
/// `orders.customer_id` references `customers.id`; both tables have a
/// primary key and `orders` has an index on `placed_at`.
pub fn shop_source() -> MockSource {
    let customers = TableRef::new("shop", "sales", "customers");
    let orders = TableRef::new("shop", "sales", "orders");
    let refresh = ProcedureRecord::new("shop", "sales", "refresh_totals")
        .with_specific_name("refresh_totals_1");

    MockSource::new()
        .with_catalogs(vec![CatalogRecord::new("shop")])
        .with_schemas(vec![
            SchemaRecord::new("shop", "sales"),
            SchemaRecord::new("shop", "audit"),
        ])
        .with_tables(vec![
            TableRecord::new("shop", "sales", "customers"),
            TableRecord::new("shop", "sales", "orders"),
            TableRecord::new("shop", "audit", "events"),
        ])
        .with_columns(vec![
            ColumnRecord::new(customers.clone(), "id", 1, "integer").nullable(false),
            ColumnRecord::new(customers.clone(), "name", 2, "varchar"),
            ColumnRecord::new(orders.clone(), "id", 1, "integer").nullable(false),
            ColumnRecord::new(orders.clone(), "customer_id", 2, "integer"),
            ColumnRecord::new(orders.clone(), "placed_at", 3, "timestamp"),
            ColumnRecord::new(TableRef::new("shop", "audit", "events"), "id", 1, "bigint"),
        ])
        .with_primary_keys(vec![
            PrimaryKeyRecord::new(customers.clone(), "id", 1),
            PrimaryKeyRecord::new(orders.clone(), "id", 1),
        ])
        .with_indexes(vec![
            IndexRecord::new(orders.clone(), "idx_orders_placed_at", "placed_at", 1),
        ])
        .with_foreign_keys(vec![ForeignKeyRecord::new(
            Some("fk_orders_customer"),
            ColumnRef::new(orders, "customer_id"),
            ColumnRef::new(customers, "id"),
            1,
        )])
        .with_parameters(vec![
            ParameterRecord::new(&refresh, "since", 1, "date"),
            ParameterRecord::new(&refresh, "dry_run", 2, "boolean"),
        ])
        .with_procedures(vec![refresh])
}
