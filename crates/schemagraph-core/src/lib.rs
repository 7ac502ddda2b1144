//! schemagraph core - contracts shared by metadata sources and the crawler
//!
//! This crate provides the fundamental types that the crawler and every
//! metadata source depend on. It defines:
//!
//! - `MetadataSource` - Trait a database driver implements to expose raw metadata
//! - `IdentifierResolver` - Name normalization and qualified-key construction
//! - Raw record types (`TableRecord`, `ColumnRecord`, ...) as returned by drivers
//! - `SchemaGraphError` / `SourceError` - The error taxonomy

mod error;
pub mod identifier;
mod records;
mod source;

pub use error::*;
pub use identifier::{
    CanonicalName, CaseFolding, IdentifierPolicy, IdentifierResolver, KeyLevel, NamePosition,
    QualifiedKey, RawIdentifier,
};
pub use records::*;
pub use source::*;
