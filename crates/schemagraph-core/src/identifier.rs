//! Identifier normalization and qualified lookup keys
//!
//! Drivers disagree on identifier case: some report names folded to upper
//! case, some to lower case, some exactly as declared. A quoted (delimited)
//! name always keeps its case. The resolver applies one per-source
//! [`IdentifierPolicy`] so that every lookup in the graph goes through the
//! same canonical form.

use crate::{Result, SchemaGraphError};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Case folding applied to unquoted identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseFolding {
    /// Leave names exactly as the source reports them
    #[default]
    Preserve,
    /// Fold unquoted names to upper case (SQL standard, Oracle, DB2)
    Upper,
    /// Fold unquoted names to lower case (PostgreSQL)
    Lower,
}

/// Per-source identifier rules
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentifierPolicy {
    /// Folding applied to unquoted names
    pub folding: CaseFolding,
    /// Identifier quote character (e.g., '"' for SQL standard, '`' for MySQL)
    pub quote: char,
}

impl Default for IdentifierPolicy {
    fn default() -> Self {
        Self {
            folding: CaseFolding::Preserve,
            quote: '"',
        }
    }
}

impl IdentifierPolicy {
    /// Policy with the given folding and the standard quote character
    pub fn with_folding(folding: CaseFolding) -> Self {
        Self {
            folding,
            ..Self::default()
        }
    }
}

/// A name as a driver returned it, before normalization
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RawIdentifier {
    pub value: Option<String>,
    /// Whether the source reported the name as delimited
    #[serde(default)]
    pub quoted: bool,
}

impl RawIdentifier {
    pub fn plain(value: impl Into<String>) -> Self {
        Self {
            value: Some(value.into()),
            quoted: false,
        }
    }

    pub fn quoted(value: impl Into<String>) -> Self {
        Self {
            value: Some(value.into()),
            quoted: true,
        }
    }

    pub fn missing() -> Self {
        Self::default()
    }

    pub fn is_missing(&self) -> bool {
        self.value.is_none()
    }
}

impl From<&str> for RawIdentifier {
    fn from(value: &str) -> Self {
        Self::plain(value)
    }
}

impl From<String> for RawIdentifier {
    fn from(value: String) -> Self {
        Self::plain(value)
    }
}

impl From<Option<&str>> for RawIdentifier {
    fn from(value: Option<&str>) -> Self {
        match value {
            Some(v) => Self::plain(v),
            None => Self::missing(),
        }
    }
}

/// Where in a qualified name an identifier appears
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamePosition {
    Catalog,
    Schema,
    Table,
    Column,
    Procedure,
    Parameter,
    ForeignKey,
    Index,
}

impl NamePosition {
    /// Mandatory positions reject a missing or empty name
    pub fn is_mandatory(self) -> bool {
        matches!(
            self,
            NamePosition::Table | NamePosition::Column | NamePosition::Procedure
        )
    }
}

impl fmt::Display for NamePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            NamePosition::Catalog => "catalog",
            NamePosition::Schema => "schema",
            NamePosition::Table => "table",
            NamePosition::Column => "column",
            NamePosition::Procedure => "procedure",
            NamePosition::Parameter => "parameter",
            NamePosition::ForeignKey => "foreign key",
            NamePosition::Index => "index",
        };
        f.write_str(label)
    }
}

/// A normalized identifier
///
/// Equality and hashing use the normalized value only, so two raw spellings
/// that normalize identically are the same name. Ordering is case-insensitive
/// with ties broken bytewise, which keeps it total and consistent with `Eq`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalName {
    value: String,
    raw: String,
    quoted: bool,
}

impl CanonicalName {
    /// The normalized form used for lookups
    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// The spelling the source reported
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn is_quoted(&self) -> bool {
        self.quoted
    }
}

impl PartialEq for CanonicalName {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl Eq for CanonicalName {}

impl Hash for CanonicalName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

impl Ord for CanonicalName {
    fn cmp(&self, other: &Self) -> Ordering {
        let folded_self = self.value.chars().flat_map(char::to_lowercase);
        let folded_other = other.value.chars().flat_map(char::to_lowercase);
        folded_self
            .cmp(folded_other)
            .then_with(|| self.value.as_bytes().cmp(other.value.as_bytes()))
    }
}

impl PartialOrd for CanonicalName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for CanonicalName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

/// Depth of a qualified key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyLevel {
    Catalog,
    Schema,
    Object,
    Column,
}

/// Fully resolved (catalog, schema, object, column) lookup key
///
/// Absent catalog or schema parts denote the source's default namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QualifiedKey {
    catalog: Option<CanonicalName>,
    schema: Option<CanonicalName>,
    object: Option<CanonicalName>,
    column: Option<CanonicalName>,
    level: KeyLevel,
}

impl QualifiedKey {
    pub fn for_catalog(catalog: Option<CanonicalName>) -> Self {
        Self {
            catalog,
            schema: None,
            object: None,
            column: None,
            level: KeyLevel::Catalog,
        }
    }

    pub fn for_schema(catalog: Option<CanonicalName>, schema: Option<CanonicalName>) -> Self {
        Self {
            catalog,
            schema,
            object: None,
            column: None,
            level: KeyLevel::Schema,
        }
    }

    pub fn for_object(
        catalog: Option<CanonicalName>,
        schema: Option<CanonicalName>,
        object: CanonicalName,
    ) -> Self {
        Self {
            catalog,
            schema,
            object: Some(object),
            column: None,
            level: KeyLevel::Object,
        }
    }

    /// Key of a column of this object
    pub fn with_column(&self, column: CanonicalName) -> Self {
        Self {
            catalog: self.catalog.clone(),
            schema: self.schema.clone(),
            object: self.object.clone(),
            column: Some(column),
            level: KeyLevel::Column,
        }
    }

    /// Key of an object in this schema
    pub fn with_object(&self, object: CanonicalName) -> Self {
        Self::for_object(self.catalog.clone(), self.schema.clone(), object)
    }

    pub fn level(&self) -> KeyLevel {
        self.level
    }

    pub fn catalog(&self) -> Option<&CanonicalName> {
        self.catalog.as_ref()
    }

    pub fn schema(&self) -> Option<&CanonicalName> {
        self.schema.as_ref()
    }

    pub fn object(&self) -> Option<&CanonicalName> {
        self.object.as_ref()
    }

    pub fn column(&self) -> Option<&CanonicalName> {
        self.column.as_ref()
    }

    /// The innermost name of the key, if its level has one
    pub fn name(&self) -> Option<&CanonicalName> {
        match self.level {
            KeyLevel::Catalog => self.catalog.as_ref(),
            KeyLevel::Schema => self.schema.as_ref(),
            KeyLevel::Object => self.object.as_ref(),
            KeyLevel::Column => self.column.as_ref(),
        }
    }

    /// Key of the enclosing namespace
    pub fn parent(&self) -> Option<QualifiedKey> {
        match self.level {
            KeyLevel::Catalog => None,
            KeyLevel::Schema => Some(self.catalog_key()),
            KeyLevel::Object => Some(self.schema_key()),
            KeyLevel::Column => self.object_key(),
        }
    }

    pub fn catalog_key(&self) -> QualifiedKey {
        Self::for_catalog(self.catalog.clone())
    }

    pub fn schema_key(&self) -> QualifiedKey {
        Self::for_schema(self.catalog.clone(), self.schema.clone())
    }

    /// The owning object key; `None` for catalog and schema keys
    pub fn object_key(&self) -> Option<QualifiedKey> {
        self.object.as_ref().map(|object| {
            Self::for_object(self.catalog.clone(), self.schema.clone(), object.clone())
        })
    }

    /// Whether `self` is `other` or nested below it
    pub fn is_within(&self, other: &QualifiedKey) -> bool {
        if self.level < other.level {
            return false;
        }
        let truncated = match other.level {
            KeyLevel::Catalog => self.catalog_key(),
            KeyLevel::Schema => self.schema_key(),
            KeyLevel::Object => match self.object_key() {
                Some(key) => key,
                None => return false,
            },
            KeyLevel::Column => self.clone(),
        };
        &truncated == other
    }

    /// Present name parts, outermost first
    pub fn parts(&self) -> Vec<&CanonicalName> {
        let depth = match self.level {
            KeyLevel::Catalog => 1,
            KeyLevel::Schema => 2,
            KeyLevel::Object => 3,
            KeyLevel::Column => 4,
        };
        [&self.catalog, &self.schema, &self.object, &self.column]
            .into_iter()
            .take(depth)
            .filter_map(|part| part.as_ref())
            .collect()
    }
}

impl fmt::Display for QualifiedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts = self.parts();
        if parts.is_empty() {
            return f.write_str("<default>");
        }
        for (i, part) in parts.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            f.write_str(part.as_str())?;
        }
        Ok(())
    }
}

/// Normalizes names and builds qualified keys for one metadata source
#[derive(Debug, Clone, Default)]
pub struct IdentifierResolver {
    policy: IdentifierPolicy,
}

impl IdentifierResolver {
    pub fn new(policy: IdentifierPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &IdentifierPolicy {
        &self.policy
    }

    /// Normalize a raw name
    ///
    /// A name wrapped in the policy's quote character is treated as quoted
    /// even when `quoted` is false, and doubled quotes inside it collapse.
    pub fn normalize(&self, raw: &str, quoted: bool) -> Result<CanonicalName> {
        let quote = self.policy.quote;
        let delimited =
            raw.len() >= 2 * quote.len_utf8() && raw.starts_with(quote) && raw.ends_with(quote);

        let (value, quoted) = if delimited {
            let inner = &raw[quote.len_utf8()..raw.len() - quote.len_utf8()];
            let doubled: String = [quote, quote].iter().collect();
            (inner.replace(&doubled, &quote.to_string()), true)
        } else if quoted {
            (raw.to_string(), true)
        } else {
            let trimmed = raw.trim();
            let folded = match self.policy.folding {
                CaseFolding::Preserve => trimmed.to_string(),
                CaseFolding::Upper => trimmed.to_uppercase(),
                CaseFolding::Lower => trimmed.to_lowercase(),
            };
            (folded, false)
        };

        if value.is_empty() {
            tracing::trace!(raw, "rejecting empty identifier");
            return Err(SchemaGraphError::InvalidIdentifier(format!(
                "empty name '{}'",
                raw
            )));
        }

        Ok(CanonicalName {
            value,
            raw: raw.to_string(),
            quoted,
        })
    }

    /// Normalize a raw identifier at a given position
    ///
    /// Missing or empty names are `Ok(None)` for optional positions (catalog,
    /// schema, ...) and `InvalidIdentifier` for mandatory ones.
    pub fn normalize_at(
        &self,
        ident: &RawIdentifier,
        position: NamePosition,
    ) -> Result<Option<CanonicalName>> {
        let value = ident.value.as_deref().filter(|v| !v.trim().is_empty());
        match value {
            Some(v) => self.normalize(v, ident.quoted).map(Some),
            None if position.is_mandatory() => Err(SchemaGraphError::InvalidIdentifier(
                format!("missing {} name", position),
            )),
            None => Ok(None),
        }
    }

    /// Normalize a name at a mandatory position
    pub fn require(&self, ident: &RawIdentifier, position: NamePosition) -> Result<CanonicalName> {
        match self.normalize_at(ident, position)? {
            Some(name) => Ok(name),
            None => Err(SchemaGraphError::InvalidIdentifier(format!(
                "missing {} name",
                position
            ))),
        }
    }

    /// Build a key from already-normalized parts
    pub fn qualify(
        &self,
        catalog: Option<&CanonicalName>,
        schema: Option<&CanonicalName>,
        object: &CanonicalName,
        column: Option<&CanonicalName>,
    ) -> QualifiedKey {
        let key = QualifiedKey::for_object(catalog.cloned(), schema.cloned(), object.clone());
        match column {
            Some(column) => key.with_column(column.clone()),
            None => key,
        }
    }

    /// Build the key of a schema from raw catalog and schema names
    pub fn schema_key(
        &self,
        catalog: &RawIdentifier,
        schema: &RawIdentifier,
    ) -> Result<QualifiedKey> {
        let catalog = self.normalize_at(catalog, NamePosition::Catalog)?;
        let schema = self.normalize_at(schema, NamePosition::Schema)?;
        Ok(QualifiedKey::for_schema(catalog, schema))
    }

    /// Build the key of a table or procedure from raw names
    pub fn object_key(
        &self,
        catalog: &RawIdentifier,
        schema: &RawIdentifier,
        object: &RawIdentifier,
        position: NamePosition,
    ) -> Result<QualifiedKey> {
        let schema_key = self.schema_key(catalog, schema)?;
        let object = self.require(object, position)?;
        Ok(schema_key.with_object(object))
    }

    /// Normalize a lookup name supplied by a consumer
    pub fn lookup(&self, name: &str) -> Option<CanonicalName> {
        self.normalize(name, false).ok()
    }
}
