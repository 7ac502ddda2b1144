//! Sealed schema graph and its entities

mod entities;
mod graph;


pub use entities::*;
pub use graph::{Completeness, PartialReason, SchemaGraph};

use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

/// Serialize a keyed map as the sequence of its values, in key order
pub(crate) fn values_as_seq<S, K, V>(map: &BTreeMap<K, V>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    V: Serialize,
{
    serializer.collect_seq(map.values())
}
