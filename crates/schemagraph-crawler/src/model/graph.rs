//! The sealed, read-only schema graph

use super::entities::{
    Catalog, Column, ForeignKey, ForeignKeyId, HasColumns, Procedure, Schema, Table,
};
use crate::report::CrawlReport;
use schemagraph_core::{CanonicalName, IdentifierResolver, QualifiedKey};
use serde::Serialize;
use std::collections::BTreeMap;

/// Why a graph is incomplete
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PartialReason {
    Cancelled,
}

/// Whether the crawl that produced a graph ran to completion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum Completeness {
    #[default]
    Complete,
    Partial { reason: PartialReason },
}

impl Completeness {
    pub fn is_complete(&self) -> bool {
        matches!(self, Completeness::Complete)
    }
}

/// Immutable catalog → schema → table → column graph
///
/// Produced only by sealing a [`GraphBuilder`](crate::GraphBuilder); there
/// is no way to mutate it afterwards. Every collection is kept in a
/// deterministic order, and columns and parameters are always in ordinal
/// order. Name arguments are normalized with the identifier policy of the
/// crawl that built the graph.
#[derive(Debug, Clone, Serialize)]
pub struct SchemaGraph {
    #[serde(serialize_with = "super::values_as_seq")]
    catalogs: BTreeMap<QualifiedKey, Catalog>,
    #[serde(skip)]
    resolver: IdentifierResolver,
    completeness: Completeness,
    report: CrawlReport,
}

impl SchemaGraph {
    pub(crate) fn new(
        catalogs: BTreeMap<QualifiedKey, Catalog>,
        resolver: IdentifierResolver,
        completeness: Completeness,
        report: CrawlReport,
    ) -> Self {
        Self {
            catalogs,
            resolver,
            completeness,
            report,
        }
    }

    /// Catalogs ordered by name, the default catalog first
    pub fn catalogs(&self) -> Vec<&Catalog> {
        self.catalogs.values().collect()
    }

    /// Catalog by name; `None` addresses the default catalog
    pub fn get_catalog(&self, name: Option<&str>) -> Option<&Catalog> {
        self.candidates(name)
            .into_iter()
            .find_map(|name| self.catalogs.get(&QualifiedKey::for_catalog(name)))
    }

    pub fn get_schema(&self, catalog: Option<&str>, name: Option<&str>) -> Option<&Schema> {
        let catalog = self.get_catalog(catalog)?;
        self.candidates(name).into_iter().find_map(|name| {
            catalog
                .schemas
                .get(&QualifiedKey::for_schema(catalog.name.clone(), name))
        })
    }

    /// Tables of a schema ordered by name
    pub fn get_tables<'a>(&self, schema: &'a Schema) -> Vec<&'a Table> {
        schema.tables().collect()
    }

    pub fn get_table<'a>(&self, schema: &'a Schema, name: &str) -> Option<&'a Table> {
        self.candidates(Some(name))
            .into_iter()
            .flatten()
            .find_map(|name| schema.table(&name))
    }

    /// Procedures of a schema ordered by name, then parameter count
    pub fn get_procedures<'a>(&self, schema: &'a Schema) -> Vec<&'a Procedure> {
        schema.procedures().collect()
    }

    /// First overload of a procedure name
    pub fn get_procedure<'a>(&self, schema: &'a Schema, name: &str) -> Option<&'a Procedure> {
        self.get_procedure_overloads(schema, name).into_iter().next()
    }

    pub fn get_procedure_overloads<'a>(
        &self,
        schema: &'a Schema,
        name: &str,
    ) -> Vec<&'a Procedure> {
        self.candidates(Some(name))
            .into_iter()
            .flatten()
            .map(|name| {
                schema
                    .procedures
                    .values()
                    .filter(|procedure| procedure.name == name)
                    .collect::<Vec<_>>()
            })
            .find(|overloads| !overloads.is_empty())
            .unwrap_or_default()
    }

    /// Catalog enclosing a key
    pub fn lookup_catalog(&self, key: &QualifiedKey) -> Option<&Catalog> {
        self.catalogs.get(&key.catalog_key())
    }

    /// Schema enclosing a key
    pub fn lookup_schema(&self, key: &QualifiedKey) -> Option<&Schema> {
        self.lookup_catalog(key)?.schemas.get(&key.schema_key())
    }

    /// Table or view addressed by an object or column key
    pub fn lookup_table(&self, key: &QualifiedKey) -> Option<&Table> {
        self.lookup_schema(key)?.table(key.object()?)
    }

    pub fn lookup_column(&self, key: &QualifiedKey) -> Option<&Column> {
        self.lookup_table(key)?.column(key.column()?)
    }

    pub fn table_of(&self, column: &Column) -> Option<&Table> {
        self.lookup_table(&column.table)
    }

    pub fn schema_of(&self, table: &Table) -> Option<&Schema> {
        self.lookup_schema(&table.schema)
    }

    pub fn catalog_of(&self, schema: &Schema) -> Option<&Catalog> {
        self.lookup_catalog(&schema.catalog)
    }

    pub fn foreign_key(&self, id: &ForeignKeyId) -> Option<&ForeignKey> {
        self.lookup_table(&id.table)?
            .foreign_keys
            .iter()
            .find(|fk| &fk.id == id)
    }

    /// Resolved foreign keys of other tables that reference `table`
    pub fn exported_foreign_keys(&self, table: &Table) -> Vec<&ForeignKey> {
        table
            .exported_keys
            .iter()
            .filter_map(|id| self.foreign_key(id))
            .collect()
    }

    /// Every table of the graph in (catalog, schema, name) order
    pub fn all_tables(&self) -> impl Iterator<Item = &Table> {
        self.catalogs
            .values()
            .flat_map(|catalog| catalog.schemas.values())
            .flat_map(|schema| schema.tables.values())
    }

    pub fn table_count(&self) -> usize {
        self.all_tables().count()
    }

    pub fn completeness(&self) -> Completeness {
        self.completeness
    }

    pub fn is_complete(&self) -> bool {
        self.completeness.is_complete()
    }

    pub fn report(&self) -> &CrawlReport {
        &self.report
    }

    pub fn identifier_resolver(&self) -> &IdentifierResolver {
        &self.resolver
    }

    /// Lookup names to try for a consumer-supplied name: folded first, then verbatim
    ///
    /// `None` stands for the unnamed (default) namespace. A name that cannot
    /// be normalized yields no candidate.
    fn candidates(&self, name: Option<&str>) -> Vec<Option<CanonicalName>> {
        let Some(name) = name else {
            return vec![None];
        };
        let mut names = Vec::with_capacity(2);
        if let Some(folded) = self.resolver.lookup(name) {
            names.push(Some(folded));
        }
        if let Ok(verbatim) = self.resolver.normalize(name, true) {
            if !names.contains(&Some(verbatim.clone())) {
                names.push(Some(verbatim));
            }
        }
        names
    }
}
