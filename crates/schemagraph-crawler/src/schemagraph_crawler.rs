//! schemagraph crawler - builds a sealed schema graph from a metadata source
//!
//! This crate provides:
//! - Crawl orchestration over a `MetadataSource` (bounded concurrency, cancellation)
//! - The graph builder that ingests raw records and stages cross-references
//! - The reference resolver that links foreign keys, indexes and primary keys
//! - The sealed, read-only `SchemaGraph` consumed by renderers
//! - Include/exclude filtering of catalogs, schemas, tables and procedures
//! - The crawl report enumerating every gap and unresolved reference

pub mod builder;
pub mod crawl;
pub mod filter;
pub mod model;
mod report;
pub mod resolver;

pub use builder::GraphBuilder;
pub use crawl::{CrawlCancelHandle, CrawlOptions, Crawler, InfoLevel};
pub use filter::{
    FilterConfig, IncludeAll, InclusionFilter, InclusionPolicy, KindRules, NamePattern, ObjectKind,
};
pub use model::{
    Catalog, Column, ColumnPair, Completeness, DatabaseObject, ForeignKey, ForeignKeyId,
    HasColumns, HasOrdinal, Index, IndexColumn, Parameter, PartialReason, PrimaryKey, Procedure,
    ProcedureKey, ReferenceStatus, Schema, SchemaGraph, Table, UnresolvedReason,
};
pub use report::{
    AmbiguousProcedure, CrawlReport, DuplicateRecord, InvalidRecord, OrdinalIssue,
    OrdinalViolation, RecordKind, SourceFailure, StructuralGap,
};
pub use resolver::{
    DroppedReference, ReferenceResolver, Resolution, ResolutionReport, UnresolvedReference,
};

// Re-export the core contracts so consumers need a single dependency
pub use schemagraph_core::{
    CanonicalName, CaseFolding, IdentifierPolicy, IdentifierResolver, MetadataSource,
    QualifiedKey, SchemaGraphError,
};
