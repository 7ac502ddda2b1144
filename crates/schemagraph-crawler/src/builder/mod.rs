//! Graph construction
//!
//! The builder ingests raw record batches from a metadata source, holds
//! orphans until their parent arrives, stages cross-table references, and
//! produces the sealed [`SchemaGraph`](crate::SchemaGraph).

mod graph_builder;
mod pending;


pub use graph_builder::GraphBuilder;
pub(crate) use graph_builder::ProcedureSlot;
