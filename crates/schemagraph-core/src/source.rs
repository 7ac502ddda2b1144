//! Metadata source trait

use crate::identifier::{IdentifierPolicy, QualifiedKey};
use crate::records::*;
use crate::SourceResult;
use async_trait::async_trait;

/// Raw metadata retrieval interface implemented by database drivers
///
/// Every call returns a finite, possibly empty list of records. Scopes are
/// passed as canonical keys built with the source's own
/// [`identifier_policy`](MetadataSource::identifier_policy); a source that
/// needs the spelling it originally reported can use
/// [`CanonicalName::raw`](crate::CanonicalName::raw).
#[async_trait]
pub trait MetadataSource: Send + Sync {
    /// Human-readable name used in logs (e.g., "postgres", "sqlite")
    fn name(&self) -> &str {
        "metadata-source"
    }

    /// Case folding and quoting rules of this source
    fn identifier_policy(&self) -> IdentifierPolicy {
        IdentifierPolicy::default()
    }

    /// List all catalogs
    async fn fetch_catalogs(&self) -> SourceResult<Vec<CatalogRecord>>;

    /// List schemas of a catalog
    async fn fetch_schemas(&self, catalog: &QualifiedKey) -> SourceResult<Vec<SchemaRecord>>;

    /// List tables of a schema
    async fn fetch_tables(&self, schema: &QualifiedKey) -> SourceResult<Vec<TableRecord>>;

    /// Get columns of a table
    async fn fetch_columns(&self, table: &QualifiedKey) -> SourceResult<Vec<ColumnRecord>>;

    /// Get foreign key column pairs declared by tables of a schema
    async fn fetch_foreign_keys(&self, schema: &QualifiedKey)
        -> SourceResult<Vec<ForeignKeyRecord>>;

    /// Get index columns of a table
    async fn fetch_indexes(&self, table: &QualifiedKey) -> SourceResult<Vec<IndexRecord>>;

    /// Get primary key columns of a table.
    /// Default returns an empty list since not all drivers expose them separately.
    async fn fetch_primary_keys(
        &self,
        _table: &QualifiedKey,
    ) -> SourceResult<Vec<PrimaryKeyRecord>> {
        Ok(Vec::new())
    }

    /// List procedures of a schema
    async fn fetch_procedures(&self, schema: &QualifiedKey) -> SourceResult<Vec<ProcedureRecord>>;

    /// Get parameters of a procedure
    async fn fetch_parameters(
        &self,
        procedure: &QualifiedKey,
        specific_name: Option<&str>,
    ) -> SourceResult<Vec<ParameterRecord>>;
}
