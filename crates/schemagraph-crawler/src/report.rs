//! Crawl report
//!
//! Everything the crawl could not determine ends up here: the graph is
//! always returned, and this report says what is missing from it and why.

use crate::resolver::ResolutionReport;
use chrono::{DateTime, Utc};
use schemagraph_core::QualifiedKey;
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

/// Kind of raw record a report entry refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Catalog,
    Schema,
    Table,
    Column,
    Procedure,
    Parameter,
    ForeignKey,
    Index,
    PrimaryKey,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RecordKind::Catalog => "catalog",
            RecordKind::Schema => "schema",
            RecordKind::Table => "table",
            RecordKind::Column => "column",
            RecordKind::Procedure => "procedure",
            RecordKind::Parameter => "parameter",
            RecordKind::ForeignKey => "foreign key",
            RecordKind::Index => "index",
            RecordKind::PrimaryKey => "primary key",
        };
        f.write_str(label)
    }
}

/// A child record whose parent never arrived
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct StructuralGap {
    pub missing_parent: QualifiedKey,
    pub kind: RecordKind,
    /// Qualified name of the excluded record
    pub record: String,
}

/// A record rejected because a mandatory name was missing or malformed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvalidRecord {
    pub kind: RecordKind,
    pub reason: String,
}

/// A record that replaced an earlier record with the same key
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateRecord {
    pub kind: RecordKind,
    pub key: QualifiedKey,
}

/// How an ordinal sequence breaks the 1..n rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OrdinalIssue {
    Gap { expected: usize, found: usize },
    Duplicate { ordinal: usize },
}

/// Ordinal problem in the columns of a table or parameters of a procedure
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrdinalViolation {
    pub owner: QualifiedKey,
    pub kind: RecordKind,
    pub issue: OrdinalIssue,
}

/// Overloads that cannot be told apart by (schema, name, parameter count)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AmbiguousProcedure {
    pub key: QualifiedKey,
    pub parameter_count: usize,
    /// Specific names of the colliding overloads, in graph order
    pub specific_names: Vec<Option<String>>,
}

/// A metadata source call that failed and was treated as empty
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceFailure {
    pub operation: String,
    pub scope: String,
    pub error: String,
}

/// Summary of one crawl
#[derive(Debug, Clone, Serialize)]
pub struct CrawlReport {
    pub crawl_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub structural_gaps: Vec<StructuralGap>,
    pub invalid_records: Vec<InvalidRecord>,
    pub duplicates: Vec<DuplicateRecord>,
    pub ordinal_violations: Vec<OrdinalViolation>,
    pub ambiguous_procedures: Vec<AmbiguousProcedure>,
    pub source_failures: Vec<SourceFailure>,
    /// Records dropped by the inclusion policy or because an ancestor was
    pub filtered: usize,
    pub resolution: ResolutionReport,
}

impl CrawlReport {
    pub fn new() -> Self {
        Self {
            crawl_id: Uuid::new_v4(),
            started_at: Utc::now(),
            finished_at: None,
            structural_gaps: Vec::new(),
            invalid_records: Vec::new(),
            duplicates: Vec::new(),
            ordinal_violations: Vec::new(),
            ambiguous_procedures: Vec::new(),
            source_failures: Vec::new(),
            filtered: 0,
            resolution: ResolutionReport::default(),
        }
    }

    /// Whether anything was lost, guessed or left unresolved
    pub fn has_issues(&self) -> bool {
        !self.structural_gaps.is_empty()
            || !self.invalid_records.is_empty()
            || !self.duplicates.is_empty()
            || !self.ordinal_violations.is_empty()
            || !self.ambiguous_procedures.is_empty()
            || !self.source_failures.is_empty()
            || self.resolution.unresolved_count() > 0
            || self.resolution.dropped_count() > 0
    }

    /// Gaps reported for a given missing parent
    pub fn gaps_for(&self, parent: &QualifiedKey) -> Vec<&StructuralGap> {
        self.structural_gaps
            .iter()
            .filter(|gap| &gap.missing_parent == parent)
            .collect()
    }

    pub(crate) fn finish(&mut self) {
        self.structural_gaps.sort();
        self.finished_at = Some(Utc::now());
    }
}

impl Default for CrawlReport {
    fn default() -> Self {
        Self::new()
    }
}
