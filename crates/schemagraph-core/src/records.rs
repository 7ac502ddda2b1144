//! Raw metadata records as returned by a metadata source
//!
//! Records are untrusted: anything a driver may not supply is optional, and
//! names are carried un-normalized as [`RawIdentifier`]s. Child records name
//! their parent rather than pointing at it.

use crate::identifier::RawIdentifier;
use serde::{Deserialize, Serialize};

/// Catalog record
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogRecord {
    /// Missing name denotes the source's default catalog
    pub name: RawIdentifier,
    pub remarks: Option<String>,
}

impl CatalogRecord {
    pub fn new(name: impl Into<RawIdentifier>) -> Self {
        Self {
            name: name.into(),
            remarks: None,
        }
    }
}

/// Schema record, tagged with its parent catalog
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaRecord {
    pub catalog: RawIdentifier,
    pub name: RawIdentifier,
    pub remarks: Option<String>,
}

impl SchemaRecord {
    pub fn new(catalog: impl Into<RawIdentifier>, name: impl Into<RawIdentifier>) -> Self {
        Self {
            catalog: catalog.into(),
            name: name.into(),
            remarks: None,
        }
    }
}

/// Table type
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TableType {
    #[default]
    Table,
    View,
    MaterializedView,
    ForeignTable,
    Temporary,
    System,
    Other(String),
}

impl TableType {
    /// Map a driver's table type label (e.g. "BASE TABLE", "VIEW")
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_uppercase().as_str() {
            "TABLE" | "BASE TABLE" => TableType::Table,
            "VIEW" => TableType::View,
            "MATERIALIZED VIEW" => TableType::MaterializedView,
            "FOREIGN TABLE" => TableType::ForeignTable,
            "TEMPORARY" | "LOCAL TEMPORARY" | "GLOBAL TEMPORARY" => TableType::Temporary,
            "SYSTEM TABLE" | "SYSTEM VIEW" => TableType::System,
            _ => TableType::Other(label.to_string()),
        }
    }

    pub fn is_view(&self) -> bool {
        matches!(self, TableType::View | TableType::MaterializedView)
    }
}

/// Table record, tagged with its parent schema
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TableRecord {
    pub catalog: RawIdentifier,
    pub schema: RawIdentifier,
    pub name: RawIdentifier,
    /// Not every driver reports a type; absent means base table
    pub table_type: Option<TableType>,
    pub remarks: Option<String>,
}

impl TableRecord {
    pub fn new(
        catalog: impl Into<RawIdentifier>,
        schema: impl Into<RawIdentifier>,
        name: impl Into<RawIdentifier>,
    ) -> Self {
        Self {
            catalog: catalog.into(),
            schema: schema.into(),
            name: name.into(),
            table_type: None,
            remarks: None,
        }
    }

    pub fn with_type(mut self, table_type: TableType) -> Self {
        self.table_type = Some(table_type);
        self
    }
}

/// Column record, tagged with its parent table and ordinal position
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ColumnRecord {
    pub catalog: RawIdentifier,
    pub schema: RawIdentifier,
    pub table: RawIdentifier,
    pub name: RawIdentifier,
    /// 1-based ordinal position
    pub ordinal: usize,
    pub data_type: Option<String>,
    pub nullable: Option<bool>,
    pub default_value: Option<String>,
    pub remarks: Option<String>,
}

impl ColumnRecord {
    pub fn new(
        table: TableRef,
        name: impl Into<RawIdentifier>,
        ordinal: usize,
        data_type: impl Into<String>,
    ) -> Self {
        Self {
            catalog: table.catalog,
            schema: table.schema,
            table: table.name,
            name: name.into(),
            ordinal,
            data_type: Some(data_type.into()),
            nullable: None,
            default_value: None,
            remarks: None,
        }
    }

    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = Some(nullable);
        self
    }

    pub fn with_default(mut self, default_value: impl Into<String>) -> Self {
        self.default_value = Some(default_value.into());
        self
    }
}

/// Raw reference to a table, used to tag child records
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRef {
    pub catalog: RawIdentifier,
    pub schema: RawIdentifier,
    pub name: RawIdentifier,
}

impl TableRef {
    pub fn new(
        catalog: impl Into<RawIdentifier>,
        schema: impl Into<RawIdentifier>,
        name: impl Into<RawIdentifier>,
    ) -> Self {
        Self {
            catalog: catalog.into(),
            schema: schema.into(),
            name: name.into(),
        }
    }
}

/// Raw reference to a column of a table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnRef {
    pub table: TableRef,
    pub column: RawIdentifier,
}

impl ColumnRef {
    pub fn new(table: TableRef, column: impl Into<RawIdentifier>) -> Self {
        Self {
            table,
            column: column.into(),
        }
    }
}

/// Foreign key action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ForeignKeyAction {
    NoAction,
    Restrict,
    Cascade,
    SetNull,
    SetDefault,
}

/// One column pair of a foreign key
///
/// Sources report foreign keys one row per column pair; rows sharing a
/// child table and name form one foreign key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForeignKeyRecord {
    /// Not every driver names its foreign keys
    pub name: Option<String>,
    pub child: ColumnRef,
    pub parent: ColumnRef,
    /// 1-based position of this pair within the key
    pub key_sequence: usize,
    pub update_rule: Option<ForeignKeyAction>,
    pub delete_rule: Option<ForeignKeyAction>,
}

impl ForeignKeyRecord {
    pub fn new(
        name: Option<&str>,
        child: ColumnRef,
        parent: ColumnRef,
        key_sequence: usize,
    ) -> Self {
        Self {
            name: name.map(str::to_string),
            child,
            parent,
            key_sequence,
            update_rule: None,
            delete_rule: None,
        }
    }

    pub fn with_rules(mut self, update: ForeignKeyAction, delete: ForeignKeyAction) -> Self {
        self.update_rule = Some(update);
        self.delete_rule = Some(delete);
        self
    }
}

/// Sort direction of an index column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
    Unknown,
}

/// One column of an index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexRecord {
    pub table: TableRef,
    pub name: Option<String>,
    pub unique: Option<bool>,
    pub column: RawIdentifier,
    /// 1-based position of the column within the index
    pub ordinal: usize,
    pub direction: Option<SortDirection>,
}

impl IndexRecord {
    pub fn new(
        table: TableRef,
        name: &str,
        column: impl Into<RawIdentifier>,
        ordinal: usize,
    ) -> Self {
        Self {
            table,
            name: Some(name.to_string()),
            unique: None,
            column: column.into(),
            ordinal,
            direction: None,
        }
    }

    pub fn unique(mut self, unique: bool) -> Self {
        self.unique = Some(unique);
        self
    }

    pub fn with_direction(mut self, direction: SortDirection) -> Self {
        self.direction = Some(direction);
        self
    }
}

/// One column of a primary key
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrimaryKeyRecord {
    pub table: TableRef,
    pub name: Option<String>,
    pub column: RawIdentifier,
    pub key_sequence: usize,
}

impl PrimaryKeyRecord {
    pub fn new(table: TableRef, column: impl Into<RawIdentifier>, key_sequence: usize) -> Self {
        Self {
            table,
            name: None,
            column: column.into(),
            key_sequence,
        }
    }
}

/// Procedure record, tagged with its parent schema
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcedureRecord {
    pub catalog: RawIdentifier,
    pub schema: RawIdentifier,
    pub name: RawIdentifier,
    /// Driver-unique name distinguishing overloads, when available
    pub specific_name: Option<String>,
    pub return_type: Option<String>,
    pub remarks: Option<String>,
}

impl ProcedureRecord {
    pub fn new(
        catalog: impl Into<RawIdentifier>,
        schema: impl Into<RawIdentifier>,
        name: impl Into<RawIdentifier>,
    ) -> Self {
        Self {
            catalog: catalog.into(),
            schema: schema.into(),
            name: name.into(),
            specific_name: None,
            return_type: None,
            remarks: None,
        }
    }

    pub fn with_specific_name(mut self, specific_name: impl Into<String>) -> Self {
        self.specific_name = Some(specific_name.into());
        self
    }
}

/// Parameter direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ParameterDirection {
    #[default]
    In,
    Out,
    InOut,
    Return,
}

/// Procedure parameter record, tagged with its parent procedure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParameterRecord {
    pub catalog: RawIdentifier,
    pub schema: RawIdentifier,
    pub procedure: RawIdentifier,
    pub specific_name: Option<String>,
    /// Return values and some drivers' positional parameters have no name
    pub name: RawIdentifier,
    pub ordinal: usize,
    pub data_type: Option<String>,
    pub direction: Option<ParameterDirection>,
}

impl ParameterRecord {
    pub fn new(
        procedure: &ProcedureRecord,
        name: impl Into<RawIdentifier>,
        ordinal: usize,
        data_type: impl Into<String>,
    ) -> Self {
        Self {
            catalog: procedure.catalog.clone(),
            schema: procedure.schema.clone(),
            procedure: procedure.name.clone(),
            specific_name: procedure.specific_name.clone(),
            name: name.into(),
            ordinal,
            data_type: Some(data_type.into()),
            direction: None,
        }
    }

    pub fn with_direction(mut self, direction: ParameterDirection) -> Self {
        self.direction = Some(direction);
        self
    }
}

/// A batch of raw records of a single kind
#[derive(Debug, Clone)]
pub enum RecordBatch {
    Catalogs(Vec<CatalogRecord>),
    Schemas(Vec<SchemaRecord>),
    Tables(Vec<TableRecord>),
    Columns(Vec<ColumnRecord>),
    Procedures(Vec<ProcedureRecord>),
    Parameters(Vec<ParameterRecord>),
    ForeignKeys(Vec<ForeignKeyRecord>),
    Indexes(Vec<IndexRecord>),
    PrimaryKeys(Vec<PrimaryKeyRecord>),
}

impl RecordBatch {
    pub fn len(&self) -> usize {
        match self {
            RecordBatch::Catalogs(r) => r.len(),
            RecordBatch::Schemas(r) => r.len(),
            RecordBatch::Tables(r) => r.len(),
            RecordBatch::Columns(r) => r.len(),
            RecordBatch::Procedures(r) => r.len(),
            RecordBatch::Parameters(r) => r.len(),
            RecordBatch::ForeignKeys(r) => r.len(),
            RecordBatch::Indexes(r) => r.len(),
            RecordBatch::PrimaryKeys(r) => r.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_type_from_label() {
        assert_eq!(TableType::from_label("BASE TABLE"), TableType::Table);
        assert_eq!(TableType::from_label("view"), TableType::View);
        assert_eq!(
            TableType::from_label(" materialized view "),
            TableType::MaterializedView
        );
        assert_eq!(TableType::from_label("SYSTEM VIEW"), TableType::System);
        assert_eq!(
            TableType::from_label("SYNONYM"),
            TableType::Other("SYNONYM".to_string())
        );
    }

    #[test]
    fn test_views_are_views() {
        assert!(TableType::View.is_view());
        assert!(TableType::MaterializedView.is_view());
        assert!(!TableType::Table.is_view());
    }

    #[test]
    fn test_parameter_inherits_procedure_identity() {
        let procedure =
            ProcedureRecord::new("shop", "sales", "find_order").with_specific_name("find_order_2");
        let parameter = ParameterRecord::new(&procedure, "code", 1, "text");
        assert_eq!(parameter.procedure, procedure.name);
        assert_eq!(parameter.specific_name.as_deref(), Some("find_order_2"));
    }

    #[test]
    fn test_record_batch_len() {
        let batch = RecordBatch::Catalogs(vec![
            CatalogRecord::new("shop"),
            CatalogRecord::new(RawIdentifier::missing()),
        ]);
        assert_eq!(batch.len(), 2);
        assert!(!batch.is_empty());
        assert!(RecordBatch::Indexes(Vec::new()).is_empty());
    }

    #[test]
    fn test_record_deserializes_with_missing_fields() {
        let table: TableRecord = serde_json::from_str(
            r#"{
                "catalog": { "value": null },
                "schema": { "value": "sales" },
                "name": { "value": "orders", "quoted": true },
                "table_type": null,
                "remarks": null
            }"#,
        )
        .unwrap();
        assert!(table.catalog.is_missing());
        assert!(table.name.quoted);
        assert!(table.table_type.is_none());
    }
}
