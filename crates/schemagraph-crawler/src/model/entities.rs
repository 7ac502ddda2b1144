//! Schema graph entities
//!
//! Entities are plain structs owned by their parent. Back-references
//! (column to table, table to schema, schema to catalog) are qualified keys
//! resolved through [`SchemaGraph`](super::SchemaGraph), never pointers.

use schemagraph_core::{
    CanonicalName, ForeignKeyAction, ParameterDirection, QualifiedKey, SortDirection, TableType,
};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Common read interface of named graph objects
pub trait DatabaseObject {
    fn key(&self) -> &QualifiedKey;

    /// Name, `None` for the default catalog or schema
    fn name(&self) -> Option<&CanonicalName>;

    fn remarks(&self) -> Option<&str>;

    /// Qualified display name
    fn full_name(&self) -> String {
        self.key().to_string()
    }
}

/// Objects with a significant ordinal position
pub trait HasOrdinal {
    fn ordinal(&self) -> usize;
}

/// Objects owning an ordered sequence of columns
pub trait HasColumns {
    /// Columns in ordinal order
    fn columns(&self) -> &[Column];

    fn column(&self, name: &CanonicalName) -> Option<&Column> {
        self.columns().iter().find(|c| &c.name == name)
    }

    fn column_names(&self) -> Vec<&str> {
        self.columns().iter().map(|c| c.name.as_str()).collect()
    }
}

/// Top-level namespace
#[derive(Debug, Clone, Serialize)]
pub struct Catalog {
    pub key: QualifiedKey,
    pub name: Option<CanonicalName>,
    pub remarks: Option<String>,
    #[serde(serialize_with = "super::values_as_seq")]
    pub(crate) schemas: BTreeMap<QualifiedKey, Schema>,
}

impl Catalog {
    pub(crate) fn new(key: QualifiedKey, remarks: Option<String>) -> Self {
        Self {
            name: key.catalog().cloned(),
            key,
            remarks,
            schemas: BTreeMap::new(),
        }
    }

    /// Schemas ordered by name
    pub fn schemas(&self) -> impl Iterator<Item = &Schema> {
        self.schemas.values()
    }

    pub fn schema_count(&self) -> usize {
        self.schemas.len()
    }
}

impl DatabaseObject for Catalog {
    fn key(&self) -> &QualifiedKey {
        &self.key
    }

    fn name(&self) -> Option<&CanonicalName> {
        self.name.as_ref()
    }

    fn remarks(&self) -> Option<&str> {
        self.remarks.as_deref()
    }
}

/// Identity of a procedure within its schema
///
/// Overloads share a name; they are told apart by parameter count and,
/// where the source provides one, the specific name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ProcedureKey {
    pub name: CanonicalName,
    pub parameter_count: usize,
    pub specific_name: Option<String>,
}

/// Namespace within a catalog
#[derive(Debug, Clone, Serialize)]
pub struct Schema {
    pub key: QualifiedKey,
    pub name: Option<CanonicalName>,
    /// Back-reference to the owning catalog
    pub catalog: QualifiedKey,
    pub remarks: Option<String>,
    #[serde(serialize_with = "super::values_as_seq")]
    pub(crate) tables: BTreeMap<CanonicalName, Table>,
    #[serde(serialize_with = "super::values_as_seq")]
    pub(crate) procedures: BTreeMap<ProcedureKey, Procedure>,
}

impl Schema {
    pub(crate) fn new(key: QualifiedKey, remarks: Option<String>) -> Self {
        Self {
            name: key.schema().cloned(),
            catalog: key.catalog_key(),
            key,
            remarks,
            tables: BTreeMap::new(),
            procedures: BTreeMap::new(),
        }
    }

    /// Tables ordered by name
    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.tables.values()
    }

    pub fn table(&self, name: &CanonicalName) -> Option<&Table> {
        self.tables.get(name)
    }

    /// Procedures ordered by name, then parameter count
    pub fn procedures(&self) -> impl Iterator<Item = &Procedure> {
        self.procedures.values()
    }

    /// All overloads of a procedure name
    pub fn procedure_overloads(&self, name: &CanonicalName) -> Vec<&Procedure> {
        self.procedures.values().filter(|p| &p.name == name).collect()
    }
}

impl DatabaseObject for Schema {
    fn key(&self) -> &QualifiedKey {
        &self.key
    }

    fn name(&self) -> Option<&CanonicalName> {
        self.name.as_ref()
    }

    fn remarks(&self) -> Option<&str> {
        self.remarks.as_deref()
    }
}

/// Table or view
#[derive(Debug, Clone, Serialize)]
pub struct Table {
    pub key: QualifiedKey,
    pub name: CanonicalName,
    pub table_type: TableType,
    /// Back-reference to the owning schema
    pub schema: QualifiedKey,
    pub remarks: Option<String>,
    pub(crate) columns: Vec<Column>,
    /// Column name to position in `columns`
    #[serde(skip)]
    pub(crate) column_index: HashMap<CanonicalName, usize>,
    pub(crate) primary_key: Option<PrimaryKey>,
    pub(crate) foreign_keys: Vec<ForeignKey>,
    pub(crate) exported_keys: Vec<ForeignKeyId>,
    pub(crate) indexes: Vec<Index>,
}

impl Table {
    pub(crate) fn new(
        key: QualifiedKey,
        name: CanonicalName,
        table_type: TableType,
        remarks: Option<String>,
    ) -> Self {
        Self {
            schema: key.schema_key(),
            key,
            name,
            table_type,
            remarks,
            columns: Vec::new(),
            column_index: HashMap::new(),
            primary_key: None,
            foreign_keys: Vec::new(),
            exported_keys: Vec::new(),
            indexes: Vec::new(),
        }
    }

    /// Replace the columns, already in ordinal order, and rebuild the name index
    pub(crate) fn set_columns(&mut self, columns: Vec<Column>) {
        self.column_index = columns
            .iter()
            .enumerate()
            .map(|(position, column)| (column.name.clone(), position))
            .collect();
        self.columns = columns;
    }

    pub fn primary_key(&self) -> Option<&PrimaryKey> {
        self.primary_key.as_ref()
    }

    /// Foreign keys declared by this table, resolved or not, ordered by name
    pub fn foreign_keys(&self) -> &[ForeignKey] {
        &self.foreign_keys
    }

    /// Ids of resolved foreign keys of other tables that reference this table
    pub fn exported_keys(&self) -> &[ForeignKeyId] {
        &self.exported_keys
    }

    /// Indexes ordered by name
    pub fn indexes(&self) -> &[Index] {
        &self.indexes
    }

    pub fn is_view(&self) -> bool {
        self.table_type.is_view()
    }
}

impl HasColumns for Table {
    fn columns(&self) -> &[Column] {
        &self.columns
    }

    fn column(&self, name: &CanonicalName) -> Option<&Column> {
        self.columns.get(*self.column_index.get(name)?)
    }
}

impl DatabaseObject for Table {
    fn key(&self) -> &QualifiedKey {
        &self.key
    }

    fn name(&self) -> Option<&CanonicalName> {
        Some(&self.name)
    }

    fn remarks(&self) -> Option<&str> {
        self.remarks.as_deref()
    }
}

/// Table column
#[derive(Debug, Clone, Serialize)]
pub struct Column {
    pub key: QualifiedKey,
    pub name: CanonicalName,
    pub ordinal: usize,
    pub data_type: Option<String>,
    /// `None` when the source does not report nullability
    pub nullable: Option<bool>,
    pub default_value: Option<String>,
    pub remarks: Option<String>,
    /// Back-reference to the owning table
    pub table: QualifiedKey,
}

impl HasOrdinal for Column {
    fn ordinal(&self) -> usize {
        self.ordinal
    }
}

impl DatabaseObject for Column {
    fn key(&self) -> &QualifiedKey {
        &self.key
    }

    fn name(&self) -> Option<&CanonicalName> {
        Some(&self.name)
    }

    fn remarks(&self) -> Option<&str> {
        self.remarks.as_deref()
    }
}

/// Identity of a foreign key: declaring table and name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ForeignKeyId {
    pub table: QualifiedKey,
    pub name: String,
}

impl fmt::Display for ForeignKeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.table, self.name)
    }
}

/// Child column to parent column link
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnPair {
    pub child: QualifiedKey,
    pub parent: QualifiedKey,
}

/// Why a foreign key could not be linked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UnresolvedReason {
    /// The referenced table was removed by the inclusion filter
    TargetExcluded,
    /// A referenced table never appeared in the crawl
    TableNotFound,
    /// The tables exist but a referenced column does not
    ColumnNotFound,
}

/// Resolution state of a foreign key
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ReferenceStatus {
    Resolved,
    Unresolved {
        reason: UnresolvedReason,
        missing: Vec<QualifiedKey>,
    },
}

/// Foreign key, retained even when its target is unknown
#[derive(Debug, Clone, Serialize)]
pub struct ForeignKey {
    pub id: ForeignKeyId,
    /// True when the source supplied no name and one was generated
    pub synthetic_name: bool,
    pub child_table: QualifiedKey,
    pub parent_table: QualifiedKey,
    /// Column pairs in key sequence order
    pub column_pairs: Vec<ColumnPair>,
    pub update_rule: Option<ForeignKeyAction>,
    pub delete_rule: Option<ForeignKeyAction>,
    pub status: ReferenceStatus,
}

impl ForeignKey {
    pub fn name(&self) -> &str {
        &self.id.name
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self.status, ReferenceStatus::Resolved)
    }
}

/// Indexed column
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexColumn {
    pub column: QualifiedKey,
    pub direction: SortDirection,
}

/// Table index
#[derive(Debug, Clone, Serialize)]
pub struct Index {
    pub name: String,
    pub table: QualifiedKey,
    pub unique: bool,
    /// Columns in index order
    pub columns: Vec<IndexColumn>,
}

/// Table primary key
#[derive(Debug, Clone, Serialize)]
pub struct PrimaryKey {
    pub name: Option<String>,
    pub table: QualifiedKey,
    /// Columns in key sequence order
    pub columns: Vec<QualifiedKey>,
}

/// Stored procedure or function
#[derive(Debug, Clone, Serialize)]
pub struct Procedure {
    pub key: QualifiedKey,
    pub name: CanonicalName,
    pub specific_name: Option<String>,
    /// Back-reference to the owning schema
    pub schema: QualifiedKey,
    pub return_type: Option<String>,
    pub remarks: Option<String>,
    pub(crate) parameters: Vec<Parameter>,
}

impl Procedure {
    pub(crate) fn new(
        key: QualifiedKey,
        name: CanonicalName,
        specific_name: Option<String>,
        return_type: Option<String>,
        remarks: Option<String>,
    ) -> Self {
        Self {
            schema: key.schema_key(),
            key,
            name,
            specific_name,
            return_type,
            remarks,
            parameters: Vec::new(),
        }
    }

    /// Parameters in ordinal order
    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn procedure_key(&self) -> ProcedureKey {
        ProcedureKey {
            name: self.name.clone(),
            parameter_count: self.parameters.len(),
            specific_name: self.specific_name.clone(),
        }
    }
}

impl DatabaseObject for Procedure {
    fn key(&self) -> &QualifiedKey {
        &self.key
    }

    fn name(&self) -> Option<&CanonicalName> {
        Some(&self.name)
    }

    fn remarks(&self) -> Option<&str> {
        self.remarks.as_deref()
    }
}

/// Procedure parameter
#[derive(Debug, Clone, Serialize)]
pub struct Parameter {
    pub name: Option<CanonicalName>,
    pub ordinal: usize,
    pub data_type: Option<String>,
    pub direction: ParameterDirection,
}

impl HasOrdinal for Parameter {
    fn ordinal(&self) -> usize {
        self.ordinal
    }
}
