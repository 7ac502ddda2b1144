//! Record ingestion and sealing

use super::pending::{PendingBuffer, PendingRecord};
use crate::filter::{IncludeAll, InclusionPolicy, ObjectKind};
use crate::model::{
    Catalog, Column, Completeness, Parameter, Procedure, Schema, SchemaGraph, Table,
};
use crate::report::{
    AmbiguousProcedure, CrawlReport, DuplicateRecord, InvalidRecord, OrdinalIssue,
    OrdinalViolation, RecordKind, SourceFailure, StructuralGap,
};
use crate::resolver::{
    ReferenceLookup, ReferenceResolver, StagedForeignKeyColumn, StagedIndexColumn,
    StagedPrimaryKeyColumn, StagedReferences,
};
use schemagraph_core::{
    CanonicalName, CatalogRecord, ColumnRecord, ColumnRef, ForeignKeyRecord, IdentifierResolver,
    IndexRecord, KeyLevel, NamePosition, ParameterDirection, ParameterRecord, PrimaryKeyRecord,
    ProcedureRecord, QualifiedKey, RecordBatch, Result, SchemaGraphError, SchemaRecord,
    SourceError, TableRecord, TableRef,
};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

/// Ingestion-time identity of a procedure
///
/// Parameters arrive before the parameter count is known, so overloads are
/// told apart by specific name until the graph is sealed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct ProcedureSlot {
    pub key: QualifiedKey,
    pub specific_name: Option<String>,
}

impl ProcedureSlot {
    fn of(procedure: &Procedure) -> Self {
        Self {
            key: procedure.key.clone(),
            specific_name: procedure.specific_name.clone(),
        }
    }
}

/// Single writer of a schema graph under construction
///
/// Records may arrive in any order within and across batches; a record whose
/// parent is unknown waits in a pending buffer. Unnamed catalogs and schemas
/// (the source's default namespace) are created on demand.
pub struct GraphBuilder {
    resolver: IdentifierResolver,
    policy: Arc<dyn InclusionPolicy>,
    catalogs: HashMap<QualifiedKey, Catalog>,
    schemas: HashMap<QualifiedKey, Schema>,
    tables: HashMap<QualifiedKey, Table>,
    columns: HashMap<QualifiedKey, Vec<Column>>,
    /// Column key to position in its table's entry of `columns`
    column_index: HashMap<QualifiedKey, usize>,
    procedures: HashMap<ProcedureSlot, Procedure>,
    excluded: HashSet<QualifiedKey>,
    pending: PendingBuffer,
    staged: StagedReferences,
    report: CrawlReport,
    sealed: bool,
}

impl GraphBuilder {
    pub fn new(resolver: IdentifierResolver) -> Self {
        Self {
            resolver,
            policy: Arc::new(IncludeAll),
            catalogs: HashMap::new(),
            schemas: HashMap::new(),
            tables: HashMap::new(),
            columns: HashMap::new(),
            column_index: HashMap::new(),
            procedures: HashMap::new(),
            excluded: HashSet::new(),
            pending: PendingBuffer::default(),
            staged: StagedReferences::default(),
            report: CrawlReport::new(),
            sealed: false,
        }
    }

    pub fn with_policy(mut self, policy: Arc<dyn InclusionPolicy>) -> Self {
        self.policy = policy;
        self
    }

    pub fn identifier_resolver(&self) -> &IdentifierResolver {
        &self.resolver
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Report accumulated so far
    pub fn report(&self) -> &CrawlReport {
        &self.report
    }

    /// Number of orphans still waiting for a parent
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Attached catalog keys in order
    pub fn catalog_keys(&self) -> Vec<QualifiedKey> {
        sorted(self.catalogs.keys())
    }

    /// Attached schema keys in order
    pub fn schema_keys(&self) -> Vec<QualifiedKey> {
        sorted(self.schemas.keys())
    }

    /// Attached table keys in order
    pub fn table_keys(&self) -> Vec<QualifiedKey> {
        sorted(self.tables.keys())
    }

    pub(crate) fn procedure_slots(&self) -> Vec<ProcedureSlot> {
        sorted(self.procedures.keys())
    }

    /// Record a failed source call that the crawl treated as empty
    pub fn record_source_failure(
        &mut self,
        operation: &str,
        scope: &QualifiedKey,
        error: &SourceError,
    ) {
        tracing::warn!(
            operation,
            scope = %scope,
            error = %error,
            "metadata fetch failed, treating as empty"
        );
        self.report.source_failures.push(SourceFailure {
            operation: operation.to_string(),
            scope: scope.to_string(),
            error: error.to_string(),
        });
    }

    /// Ingest a batch of raw records of any kind
    pub fn ingest(&mut self, batch: RecordBatch) -> Result<()> {
        match batch {
            RecordBatch::Catalogs(records) => self.ingest_catalogs(records),
            RecordBatch::Schemas(records) => self.ingest_schemas(records),
            RecordBatch::Tables(records) => self.ingest_tables(records),
            RecordBatch::Columns(records) => self.ingest_columns(records),
            RecordBatch::Procedures(records) => self.ingest_procedures(records),
            RecordBatch::Parameters(records) => self.ingest_parameters(records),
            RecordBatch::ForeignKeys(records) => self.stage_foreign_keys(records),
            RecordBatch::Indexes(records) => self.stage_indexes(records),
            RecordBatch::PrimaryKeys(records) => self.stage_primary_keys(records),
        }
    }

    pub fn ingest_catalogs(&mut self, records: Vec<CatalogRecord>) -> Result<()> {
        self.ensure_open("ingest catalogs")?;
        for record in records {
            let name = match self.resolver.normalize_at(&record.name, NamePosition::Catalog) {
                Ok(name) => name,
                Err(e) => {
                    self.invalid(RecordKind::Catalog, e);
                    continue;
                }
            };
            let key = QualifiedKey::for_catalog(name);
            if self.admit(ObjectKind::Catalog, &key) {
                self.insert_catalog(Catalog::new(key, record.remarks));
            }
        }
        Ok(())
    }

    pub fn ingest_schemas(&mut self, records: Vec<SchemaRecord>) -> Result<()> {
        self.ensure_open("ingest schemas")?;
        for record in records {
            let key = match self.resolver.schema_key(&record.catalog, &record.name) {
                Ok(key) => key,
                Err(e) => {
                    self.invalid(RecordKind::Schema, e);
                    continue;
                }
            };
            if self.admit(ObjectKind::Schema, &key) {
                self.insert_schema(Schema::new(key, record.remarks));
            }
        }
        Ok(())
    }

    pub fn ingest_tables(&mut self, records: Vec<TableRecord>) -> Result<()> {
        self.ensure_open("ingest tables")?;
        for record in records {
            let table = TableRef {
                catalog: record.catalog,
                schema: record.schema,
                name: record.name,
            };
            let (key, name) = match self.object_key(&table, NamePosition::Table) {
                Ok(parsed) => parsed,
                Err(e) => {
                    self.invalid(RecordKind::Table, e);
                    continue;
                }
            };
            if self.admit(ObjectKind::Table, &key) {
                let table_type = record.table_type.unwrap_or_default();
                self.insert_table(Table::new(key, name, table_type, record.remarks));
            }
        }
        Ok(())
    }

    pub fn ingest_columns(&mut self, records: Vec<ColumnRecord>) -> Result<()> {
        self.ensure_open("ingest columns")?;
        for record in records {
            let column_ref = ColumnRef {
                table: TableRef {
                    catalog: record.catalog,
                    schema: record.schema,
                    name: record.table,
                },
                column: record.name,
            };
            let key = match self.column_key(&column_ref) {
                Ok(key) => key,
                Err(e) => {
                    self.invalid(RecordKind::Column, e);
                    continue;
                }
            };
            if self.filtered_by_ancestor(&key) {
                continue;
            }
            let (Some(table), Some(name)) = (key.object_key(), key.column().cloned()) else {
                continue;
            };
            self.insert_column(Column {
                key,
                name,
                ordinal: record.ordinal,
                data_type: record.data_type,
                nullable: record.nullable,
                default_value: record.default_value,
                remarks: record.remarks,
                table,
            });
        }
        Ok(())
    }

    pub fn ingest_procedures(&mut self, records: Vec<ProcedureRecord>) -> Result<()> {
        self.ensure_open("ingest procedures")?;
        for record in records {
            let procedure = TableRef {
                catalog: record.catalog,
                schema: record.schema,
                name: record.name,
            };
            let (key, name) = match self.object_key(&procedure, NamePosition::Procedure) {
                Ok(parsed) => parsed,
                Err(e) => {
                    self.invalid(RecordKind::Procedure, e);
                    continue;
                }
            };
            if self.admit(ObjectKind::Procedure, &key) {
                self.insert_procedure(Procedure::new(
                    key,
                    name,
                    record.specific_name,
                    record.return_type,
                    record.remarks,
                ));
            }
        }
        Ok(())
    }

    pub fn ingest_parameters(&mut self, records: Vec<ParameterRecord>) -> Result<()> {
        self.ensure_open("ingest parameters")?;
        for record in records {
            let procedure = TableRef {
                catalog: record.catalog,
                schema: record.schema,
                name: record.procedure,
            };
            let parsed = self
                .object_key(&procedure, NamePosition::Procedure)
                .and_then(|(key, _)| {
                    let name = self.resolver.normalize_at(&record.name, NamePosition::Parameter)?;
                    Ok((key, name))
                });
            let (key, name) = match parsed {
                Ok(parsed) => parsed,
                Err(e) => {
                    self.invalid(RecordKind::Parameter, e);
                    continue;
                }
            };
            if self.filtered_by_ancestor(&key) {
                continue;
            }
            let slot = ProcedureSlot {
                key,
                specific_name: record.specific_name,
            };
            self.insert_parameter(
                slot,
                Parameter {
                    name,
                    ordinal: record.ordinal,
                    data_type: record.data_type,
                    direction: record.direction.unwrap_or_default(),
                },
            );
        }
        Ok(())
    }

    /// Stage foreign key column pairs for resolution at seal time
    pub fn stage_foreign_keys(&mut self, records: Vec<ForeignKeyRecord>) -> Result<()> {
        self.ensure_open("stage foreign keys")?;
        for record in records {
            let endpoints = self
                .column_key(&record.child)
                .and_then(|child| Ok((child, self.column_key(&record.parent)?)));
            let (child, parent) = match endpoints {
                Ok(endpoints) => endpoints,
                Err(e) => {
                    self.invalid(RecordKind::ForeignKey, e);
                    continue;
                }
            };
            if self.filtered_by_ancestor(&child) {
                continue;
            }
            let name = self.reference_name(record.name.as_deref());
            self.staged.foreign_keys.push(StagedForeignKeyColumn {
                name,
                child,
                parent,
                key_sequence: record.key_sequence,
                update_rule: record.update_rule,
                delete_rule: record.delete_rule,
            });
        }
        Ok(())
    }

    /// Stage index columns; rows without an index name are rejected
    pub fn stage_indexes(&mut self, records: Vec<IndexRecord>) -> Result<()> {
        self.ensure_open("stage indexes")?;
        for record in records {
            let Some(name) = self.reference_name(record.name.as_deref()) else {
                self.invalid(
                    RecordKind::Index,
                    SchemaGraphError::InvalidIdentifier("missing index name".to_string()),
                );
                continue;
            };
            let column_ref = ColumnRef {
                table: record.table,
                column: record.column,
            };
            let column = match self.column_key(&column_ref) {
                Ok(key) => key,
                Err(e) => {
                    self.invalid(RecordKind::Index, e);
                    continue;
                }
            };
            if self.filtered_by_ancestor(&column) {
                continue;
            }
            let Some(table) = column.object_key() else {
                continue;
            };
            self.staged.indexes.push(StagedIndexColumn {
                table,
                name,
                unique: record.unique,
                column,
                ordinal: record.ordinal,
                direction: record.direction.unwrap_or_default(),
            });
        }
        Ok(())
    }

    pub fn stage_primary_keys(&mut self, records: Vec<PrimaryKeyRecord>) -> Result<()> {
        self.ensure_open("stage primary keys")?;
        for record in records {
            let column_ref = ColumnRef {
                table: record.table,
                column: record.column,
            };
            let column = match self.column_key(&column_ref) {
                Ok(key) => key,
                Err(e) => {
                    self.invalid(RecordKind::PrimaryKey, e);
                    continue;
                }
            };
            if self.filtered_by_ancestor(&column) {
                continue;
            }
            let Some(table) = column.object_key() else {
                continue;
            };
            self.staged.primary_keys.push(StagedPrimaryKeyColumn {
                table,
                name: record.name,
                column,
                key_sequence: record.key_sequence,
            });
        }
        Ok(())
    }

    /// Close ingestion and produce the immutable graph
    ///
    /// Orphans still pending become structural gaps, staged references are
    /// resolved, and ordinals are validated. A second call fails with
    /// `GraphSealed`.
    pub fn seal(&mut self, completeness: Completeness) -> Result<SchemaGraph> {
        self.ensure_open("seal")?;
        self.sealed = true;

        for (parent, record) in self.pending.drain() {
            let kind = record.kind();
            let description = record.describe();
            tracing::warn!(
                missing_parent = %parent,
                kind = %kind,
                record = %description,
                "parent never arrived, excluding record"
            );
            self.report.structural_gaps.push(StructuralGap {
                missing_parent: parent,
                kind,
                record: description,
            });
        }

        let staged = std::mem::take(&mut self.staged);
        let resolution = ReferenceResolver::new().resolve(staged, &*self);

        let mut tables: BTreeMap<QualifiedKey, Table> =
            std::mem::take(&mut self.tables).into_iter().collect();
        let mut columns = std::mem::take(&mut self.columns);
        self.column_index.clear();
        for (key, table) in tables.iter_mut() {
            let mut table_columns = columns.remove(key).unwrap_or_default();
            table_columns.sort_by(|a, b| {
                a.ordinal
                    .cmp(&b.ordinal)
                    .then_with(|| a.name.cmp(&b.name))
            });
            self.check_ordinals(key, RecordKind::Column, table_columns.iter().map(|c| c.ordinal));
            table.set_columns(table_columns);
        }

        for primary_key in resolution.primary_keys {
            if let Some(table) = tables.get_mut(&primary_key.table) {
                table.primary_key = Some(primary_key);
            }
        }
        for index in resolution.indexes {
            if let Some(table) = tables.get_mut(&index.table) {
                table.indexes.push(index);
            }
        }
        for foreign_key in resolution.foreign_keys {
            if foreign_key.is_resolved() {
                if let Some(parent) = tables.get_mut(&foreign_key.parent_table) {
                    parent.exported_keys.push(foreign_key.id.clone());
                }
            }
            if let Some(child) = tables.get_mut(&foreign_key.child_table) {
                child.foreign_keys.push(foreign_key);
            }
        }

        let mut procedures: Vec<Procedure> =
            std::mem::take(&mut self.procedures).into_values().collect();
        for procedure in procedures.iter_mut() {
            procedure
                .parameters
                .sort_by(|a, b| a.ordinal.cmp(&b.ordinal).then_with(|| a.name.cmp(&b.name)));
        }
        procedures.sort_by(|a, b| {
            a.key
                .cmp(&b.key)
                .then_with(|| a.procedure_key().cmp(&b.procedure_key()))
        });
        for procedure in &procedures {
            // Return values carry ordinal 0 and sit outside the 1..n sequence
            let ordinals = procedure
                .parameters
                .iter()
                .filter(|p| p.direction != ParameterDirection::Return)
                .map(|p| p.ordinal);
            self.check_ordinals(&procedure.key, RecordKind::Parameter, ordinals);
        }
        self.flag_ambiguous_procedures(&procedures);

        let mut schemas = std::mem::take(&mut self.schemas);
        for table in tables.into_values() {
            if let Some(schema) = schemas.get_mut(&table.schema) {
                schema.tables.insert(table.name.clone(), table);
            }
        }
        for procedure in procedures {
            if let Some(schema) = schemas.get_mut(&procedure.schema) {
                schema.procedures.insert(procedure.procedure_key(), procedure);
            }
        }

        let mut catalogs: BTreeMap<QualifiedKey, Catalog> =
            std::mem::take(&mut self.catalogs).into_iter().collect();
        for (key, schema) in schemas {
            if let Some(catalog) = catalogs.get_mut(&schema.catalog) {
                catalog.schemas.insert(key, schema);
            }
        }

        self.report.duplicates.extend(resolution.duplicates);
        self.report.resolution = resolution.report;
        self.report.finish();

        tracing::debug!(
            catalogs = catalogs.len(),
            gaps = self.report.structural_gaps.len(),
            unresolved = self.report.resolution.unresolved_count(),
            ?completeness,
            "sealed schema graph"
        );

        Ok(SchemaGraph::new(
            catalogs,
            self.resolver.clone(),
            completeness,
            std::mem::take(&mut self.report),
        ))
    }

    fn ensure_open(&self, operation: &str) -> Result<()> {
        if self.sealed {
            return Err(SchemaGraphError::GraphSealed(format!(
                "cannot {} after the graph was sealed",
                operation
            )));
        }
        Ok(())
    }

    fn object_key(
        &self,
        object: &TableRef,
        position: NamePosition,
    ) -> Result<(QualifiedKey, CanonicalName)> {
        let schema = self.resolver.schema_key(&object.catalog, &object.schema)?;
        let name = self.resolver.require(&object.name, position)?;
        Ok((schema.with_object(name.clone()), name))
    }

    fn column_key(&self, column: &ColumnRef) -> Result<QualifiedKey> {
        let (table, _) = self.object_key(&column.table, NamePosition::Table)?;
        let name = self.resolver.require(&column.column, NamePosition::Column)?;
        Ok(table.with_column(name))
    }

    /// Canonical foreign key or index name, `None` when missing or blank
    fn reference_name(&self, name: Option<&str>) -> Option<String> {
        let name = name.filter(|n| !n.trim().is_empty())?;
        let name = self.resolver.normalize(name, false).ok()?;
        Some(name.as_str().to_string())
    }

    fn invalid(&mut self, kind: RecordKind, error: SchemaGraphError) {
        tracing::warn!(kind = %kind, error = %error, "skipping invalid record");
        self.report.invalid_records.push(InvalidRecord {
            kind,
            reason: error.to_string(),
        });
    }

    fn duplicate(&mut self, kind: RecordKind, key: &QualifiedKey) {
        tracing::warn!(kind = %kind, key = %key, "duplicate record, keeping the last one");
        self.report.duplicates.push(DuplicateRecord {
            kind,
            key: key.clone(),
        });
    }

    /// Whether `key` itself or one of its ancestors was excluded
    fn under_exclusion(&self, key: &QualifiedKey) -> bool {
        let mut current = Some(key.clone());
        while let Some(key) = current {
            if self.excluded.contains(&key) {
                return true;
            }
            current = key.parent();
        }
        false
    }

    /// Count and drop records that live under an excluded object
    fn filtered_by_ancestor(&mut self, key: &QualifiedKey) -> bool {
        if self.under_exclusion(key) {
            self.report.filtered += 1;
            return true;
        }
        false
    }

    /// Apply the inclusion policy to a catalog, schema, table or procedure
    fn admit(&mut self, kind: ObjectKind, key: &QualifiedKey) -> bool {
        if self.filtered_by_ancestor(key) {
            return false;
        }
        if self.policy.should_include(kind, key) {
            return true;
        }
        self.excluded.insert(key.clone());
        let dropped = self.pending.discard_within(key);
        self.report.filtered += 1 + dropped;
        false
    }

    /// Make sure a namespace exists, creating unnamed defaults on demand
    fn namespace_ready(&mut self, key: &QualifiedKey) -> bool {
        match key.level() {
            KeyLevel::Catalog => {
                if self.catalogs.contains_key(key) {
                    return true;
                }
                if key.name().is_some() {
                    return false;
                }
                tracing::debug!("creating default catalog");
                self.insert_catalog(Catalog::new(key.clone(), None));
                true
            }
            KeyLevel::Schema => {
                if self.schemas.contains_key(key) {
                    return true;
                }
                if key.name().is_some() || !self.namespace_ready(&key.catalog_key()) {
                    return false;
                }
                tracing::debug!(catalog = %key.catalog_key(), "creating default schema");
                self.insert_schema(Schema::new(key.clone(), None));
                true
            }
            KeyLevel::Object | KeyLevel::Column => false,
        }
    }

    fn insert_catalog(&mut self, catalog: Catalog) {
        let key = catalog.key.clone();
        if self.catalogs.insert(key.clone(), catalog).is_some() {
            self.duplicate(RecordKind::Catalog, &key);
        }
        self.release(&key);

        let default_schema = QualifiedKey::for_schema(key.catalog().cloned(), None);
        if self.pending.contains(&default_schema) {
            self.namespace_ready(&default_schema);
        }
    }

    fn insert_schema(&mut self, schema: Schema) {
        if !self.namespace_ready(&schema.catalog) {
            self.pending
                .hold(schema.catalog.clone(), PendingRecord::Schema(schema));
            return;
        }
        let key = schema.key.clone();
        if self.schemas.insert(key.clone(), schema).is_some() {
            self.duplicate(RecordKind::Schema, &key);
        }
        self.release(&key);
    }

    fn insert_table(&mut self, table: Table) {
        if !self.namespace_ready(&table.schema) {
            self.pending.hold(table.schema.clone(), PendingRecord::Table(table));
            return;
        }
        let key = table.key.clone();
        if self.tables.insert(key.clone(), table).is_some() {
            self.duplicate(RecordKind::Table, &key);
        }
        self.release(&key);
    }

    fn insert_column(&mut self, column: Column) {
        if !self.tables.contains_key(&column.table) {
            self.pending.hold(column.table.clone(), PendingRecord::Column(column));
            return;
        }
        let key = column.key.clone();
        let columns = self.columns.entry(column.table.clone()).or_default();
        match self.column_index.get(&key).and_then(|&position| columns.get_mut(position)) {
            Some(existing) => {
                *existing = column;
                self.duplicate(RecordKind::Column, &key);
            }
            None => {
                self.column_index.insert(key, columns.len());
                columns.push(column);
            }
        }
    }

    fn insert_procedure(&mut self, mut procedure: Procedure) {
        if !self.namespace_ready(&procedure.schema) {
            self.pending
                .hold(procedure.schema.clone(), PendingRecord::Procedure(procedure));
            return;
        }
        let slot = ProcedureSlot::of(&procedure);
        if let Some(previous) = self.procedures.remove(&slot) {
            procedure.parameters = previous.parameters;
            self.duplicate(RecordKind::Procedure, &slot.key);
        }
        let key = slot.key.clone();
        self.procedures.insert(slot, procedure);
        self.release(&key);
    }

    fn insert_parameter(&mut self, slot: ProcedureSlot, parameter: Parameter) {
        let Some(target) = self.find_procedure(&slot) else {
            self.pending
                .hold(slot.key.clone(), PendingRecord::Parameter { slot, parameter });
            return;
        };
        let mut replaced = false;
        if let Some(procedure) = self.procedures.get_mut(&target) {
            // Named parameters are identified by name, unnamed ones by position
            let existing = procedure
                .parameters
                .iter_mut()
                .find(|p| match (&p.name, &parameter.name) {
                    (Some(a), Some(b)) => a == b,
                    (None, None) => p.ordinal == parameter.ordinal,
                    _ => false,
                });
            match existing {
                Some(existing) => {
                    *existing = parameter;
                    replaced = true;
                }
                None => procedure.parameters.push(parameter),
            }
        }
        if replaced {
            self.duplicate(RecordKind::Parameter, &target.key);
        }
    }

    /// Procedure a parameter belongs to
    ///
    /// A parameter without a specific name attaches to the only procedure
    /// of that name; with several candidates it stays pending.
    fn find_procedure(&self, slot: &ProcedureSlot) -> Option<ProcedureSlot> {
        if self.procedures.contains_key(slot) {
            return Some(slot.clone());
        }
        if slot.specific_name.is_some() {
            return None;
        }
        let mut candidates = self.procedures.keys().filter(|s| s.key == slot.key);
        match (candidates.next(), candidates.next()) {
            (Some(only), None) => Some(only.clone()),
            _ => None,
        }
    }

    /// Attach every orphan that was waiting for `parent`
    fn release(&mut self, parent: &QualifiedKey) {
        let records = self.pending.take(parent);
        if records.is_empty() {
            return;
        }
        tracing::debug!(parent = %parent, count = records.len(), "attaching pending records");
        for record in records {
            match record {
                PendingRecord::Schema(schema) => self.insert_schema(schema),
                PendingRecord::Table(table) => self.insert_table(table),
                PendingRecord::Column(column) => self.insert_column(column),
                PendingRecord::Procedure(procedure) => self.insert_procedure(procedure),
                PendingRecord::Parameter { slot, parameter } => {
                    self.insert_parameter(slot, parameter)
                }
            }
        }
    }

    /// Report gaps and duplicates in an ordinal sequence sorted ascending
    fn check_ordinals(
        &mut self,
        owner: &QualifiedKey,
        kind: RecordKind,
        ordinals: impl IntoIterator<Item = usize>,
    ) {
        let mut expected = 1;
        let mut previous = None;
        for ordinal in ordinals {
            let issue = if previous == Some(ordinal) {
                Some(OrdinalIssue::Duplicate { ordinal })
            } else if ordinal != expected {
                Some(OrdinalIssue::Gap {
                    expected,
                    found: ordinal,
                })
            } else {
                None
            };
            if let Some(issue) = issue {
                tracing::warn!(owner = %owner, kind = %kind, ?issue, "ordinal sequence violated");
                self.report.ordinal_violations.push(OrdinalViolation {
                    owner: owner.clone(),
                    kind,
                    issue,
                });
            }
            expected = ordinal + 1;
            previous = Some(ordinal);
        }
    }

    /// Flag overloads sharing (schema, name, parameter count)
    fn flag_ambiguous_procedures(&mut self, procedures: &[Procedure]) {
        let mut groups: BTreeMap<(QualifiedKey, usize), Vec<Option<String>>> = BTreeMap::new();
        for procedure in procedures {
            groups
                .entry((procedure.key.clone(), procedure.parameters.len()))
                .or_default()
                .push(procedure.specific_name.clone());
        }
        for ((key, parameter_count), specific_names) in groups {
            if specific_names.len() < 2 {
                continue;
            }
            tracing::warn!(
                procedure = %key,
                parameter_count,
                overloads = specific_names.len(),
                "ambiguous procedure overloads"
            );
            self.report.ambiguous_procedures.push(AmbiguousProcedure {
                key,
                parameter_count,
                specific_names,
            });
        }
    }
}

impl ReferenceLookup for GraphBuilder {
    fn has_table(&self, table: &QualifiedKey) -> bool {
        self.tables.contains_key(table)
    }

    fn has_column(&self, column: &QualifiedKey) -> bool {
        self.column_index.contains_key(column)
    }

    fn is_excluded(&self, key: &QualifiedKey) -> bool {
        if self.under_exclusion(key) {
            return true;
        }
        // Objects the crawl never requested are judged by the policy directly
        if !self.policy.should_include(ObjectKind::Catalog, &key.catalog_key())
            || !self.policy.should_include(ObjectKind::Schema, &key.schema_key())
        {
            return true;
        }
        key.object_key()
            .is_some_and(|table| !self.policy.should_include(ObjectKind::Table, &table))
    }
}

fn sorted<'a, T: Ord + Clone + 'a>(keys: impl Iterator<Item = &'a T>) -> Vec<T> {
    let mut keys: Vec<T> = keys.cloned().collect();
    keys.sort();
    keys
}
