//! Reference resolution
//!
//! Second pass over staged foreign keys, indexes and primary keys, run once
//! every node of the crawl exists. Resolution never fails: references that
//! cannot be linked are kept in unresolved form or dropped, and reported.

mod linker;

#[cfg(test)]
mod tests;

pub use linker::{
    DroppedReference, ReferenceLookup, ReferenceResolver, Resolution, ResolutionReport,
    StagedForeignKeyColumn, StagedIndexColumn, StagedPrimaryKeyColumn, StagedReferences,
    UnresolvedReference,
};
