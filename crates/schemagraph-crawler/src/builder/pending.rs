//! Records waiting for a parent that has not been ingested yet

use super::graph_builder::ProcedureSlot;
use crate::model::{Column, Parameter, Procedure, Schema, Table};
use crate::report::RecordKind;
use schemagraph_core::QualifiedKey;
use std::collections::BTreeMap;

/// A normalized record held until its parent arrives
#[derive(Debug, Clone)]
pub(crate) enum PendingRecord {
    Schema(Schema),
    Table(Table),
    Column(Column),
    Procedure(Procedure),
    Parameter { slot: ProcedureSlot, parameter: Parameter },
}

impl PendingRecord {
    pub fn kind(&self) -> RecordKind {
        match self {
            PendingRecord::Schema(_) => RecordKind::Schema,
            PendingRecord::Table(_) => RecordKind::Table,
            PendingRecord::Column(_) => RecordKind::Column,
            PendingRecord::Procedure(_) => RecordKind::Procedure,
            PendingRecord::Parameter { .. } => RecordKind::Parameter,
        }
    }

    /// Qualified name of the record for the crawl report
    pub fn describe(&self) -> String {
        match self {
            PendingRecord::Schema(schema) => schema.key.to_string(),
            PendingRecord::Table(table) => table.key.to_string(),
            PendingRecord::Column(column) => column.key.to_string(),
            PendingRecord::Procedure(procedure) => procedure.key.to_string(),
            PendingRecord::Parameter { slot, parameter } => match &parameter.name {
                Some(name) => format!("{}({})", slot.key, name),
                None => format!("{}(#{})", slot.key, parameter.ordinal),
            },
        }
    }
}

/// Orphans keyed by the parent key they are waiting for
#[derive(Debug, Default)]
pub(crate) struct PendingBuffer {
    records: BTreeMap<QualifiedKey, Vec<PendingRecord>>,
}

impl PendingBuffer {
    pub fn hold(&mut self, parent: QualifiedKey, record: PendingRecord) {
        tracing::trace!(parent = %parent, record = %record.describe(), "holding orphan record");
        self.records.entry(parent).or_default().push(record);
    }

    pub fn contains(&self, parent: &QualifiedKey) -> bool {
        self.records.contains_key(parent)
    }

    /// Remove and return everything waiting for `parent`, in arrival order
    pub fn take(&mut self, parent: &QualifiedKey) -> Vec<PendingRecord> {
        self.records.remove(parent).unwrap_or_default()
    }

    /// Drop every record waiting on `key` or anything below it
    ///
    /// Returns the number of records dropped.
    pub fn discard_within(&mut self, key: &QualifiedKey) -> usize {
        let mut dropped = 0;
        self.records.retain(|parent, records| {
            if parent.is_within(key) {
                dropped += records.len();
                false
            } else {
                true
            }
        });
        dropped
    }

    /// Remove all remaining orphans in parent key order
    pub fn drain(&mut self) -> Vec<(QualifiedKey, PendingRecord)> {
        std::mem::take(&mut self.records)
            .into_iter()
            .flat_map(|(parent, records)| {
                records.into_iter().map(move |record| (parent.clone(), record))
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.values().map(Vec::len).sum()
    }
}
