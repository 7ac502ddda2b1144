//! Name pattern rules per object kind

use regex::{Regex, RegexBuilder};
use schemagraph_core::{QualifiedKey, Result, SchemaGraphError};
use serde::{Deserialize, Serialize};

/// Kinds of object the inclusion policy decides on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    Catalog,
    Schema,
    Table,
    Procedure,
}

/// Decides which objects a crawl fetches and keeps
pub trait InclusionPolicy: Send + Sync {
    fn should_include(&self, kind: ObjectKind, key: &QualifiedKey) -> bool;
}

/// Policy that keeps everything
#[derive(Debug, Clone, Copy, Default)]
pub struct IncludeAll;

impl InclusionPolicy for IncludeAll {
    fn should_include(&self, _kind: ObjectKind, _key: &QualifiedKey) -> bool {
        true
    }
}

/// A single name rule
///
/// Rules are tested against the dot-joined qualified name and each of its
/// dot-suffixes, so `orders`, `sales.orders` and `shop.sales.orders` all
/// match table `shop.sales.orders`. Regular expressions are anchored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NamePattern {
    Exact(String),
    Prefix(String),
    Pattern(String),
}

impl NamePattern {
    pub fn exact(name: impl Into<String>) -> Self {
        NamePattern::Exact(name.into())
    }

    pub fn prefix(prefix: impl Into<String>) -> Self {
        NamePattern::Prefix(prefix.into())
    }

    pub fn pattern(regex: impl Into<String>) -> Self {
        NamePattern::Pattern(regex.into())
    }
}

/// Include and exclude rules for one object kind
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KindRules {
    pub include: Vec<NamePattern>,
    pub exclude: Vec<NamePattern>,
}

impl KindRules {
    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }
}

/// Filter configuration as supplied by the caller (e.g. from a TOML file)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub catalogs: KindRules,
    pub schemas: KindRules,
    pub tables: KindRules,
    pub procedures: KindRules,
    /// Match names ignoring case
    pub case_insensitive: bool,
}

impl FilterConfig {
    pub fn include(mut self, kind: ObjectKind, pattern: NamePattern) -> Self {
        self.rules_mut(kind).include.push(pattern);
        self
    }

    pub fn exclude(mut self, kind: ObjectKind, pattern: NamePattern) -> Self {
        self.rules_mut(kind).exclude.push(pattern);
        self
    }

    pub fn case_insensitive(mut self, case_insensitive: bool) -> Self {
        self.case_insensitive = case_insensitive;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.catalogs.is_empty()
            && self.schemas.is_empty()
            && self.tables.is_empty()
            && self.procedures.is_empty()
    }

    fn rules_mut(&mut self, kind: ObjectKind) -> &mut KindRules {
        match kind {
            ObjectKind::Catalog => &mut self.catalogs,
            ObjectKind::Schema => &mut self.schemas,
            ObjectKind::Table => &mut self.tables,
            ObjectKind::Procedure => &mut self.procedures,
        }
    }
}

#[derive(Debug, Clone)]
enum CompiledPattern {
    Exact(String),
    Prefix(String),
    Regex(Regex),
}

impl CompiledPattern {
    fn compile(pattern: &NamePattern, case_insensitive: bool) -> Result<Self> {
        let fold = |s: &str| {
            if case_insensitive {
                s.to_lowercase()
            } else {
                s.to_string()
            }
        };
        Ok(match pattern {
            NamePattern::Exact(name) => CompiledPattern::Exact(fold(name)),
            NamePattern::Prefix(prefix) => CompiledPattern::Prefix(fold(prefix)),
            NamePattern::Pattern(source) => {
                let regex = RegexBuilder::new(&format!("^(?:{})$", source))
                    .case_insensitive(case_insensitive)
                    .build()
                    .map_err(|e| {
                        SchemaGraphError::Configuration(format!(
                            "invalid name pattern '{}': {}",
                            source, e
                        ))
                    })?;
                CompiledPattern::Regex(regex)
            }
        })
    }

    fn matches(&self, candidate: &str) -> bool {
        match self {
            CompiledPattern::Exact(name) => candidate == name,
            CompiledPattern::Prefix(prefix) => candidate.starts_with(prefix.as_str()),
            CompiledPattern::Regex(regex) => regex.is_match(candidate),
        }
    }
}

#[derive(Debug, Clone, Default)]
struct CompiledRules {
    include: Vec<CompiledPattern>,
    exclude: Vec<CompiledPattern>,
}

impl CompiledRules {
    fn compile(rules: &KindRules, case_insensitive: bool) -> Result<Self> {
        let compile_all = |patterns: &[NamePattern]| {
            patterns
                .iter()
                .map(|p| CompiledPattern::compile(p, case_insensitive))
                .collect::<Result<Vec<_>>>()
        };
        Ok(Self {
            include: compile_all(&rules.include)?,
            exclude: compile_all(&rules.exclude)?,
        })
    }

    /// Exclusion wins over inclusion; no include rule means include all
    fn allows(&self, candidates: &[String]) -> bool {
        let matches_any = |patterns: &[CompiledPattern]| {
            patterns
                .iter()
                .any(|p| candidates.iter().any(|c| p.matches(c)))
        };
        if matches_any(&self.exclude) {
            return false;
        }
        self.include.is_empty() || matches_any(&self.include)
    }
}

/// Pattern-based inclusion policy
#[derive(Debug, Clone, Default)]
pub struct InclusionFilter {
    catalogs: CompiledRules,
    schemas: CompiledRules,
    tables: CompiledRules,
    procedures: CompiledRules,
    case_insensitive: bool,
}

impl InclusionFilter {
    /// Compile a filter configuration
    ///
    /// Fails with `Configuration` when a regular expression does not compile.
    pub fn from_config(config: &FilterConfig) -> Result<Self> {
        let ci = config.case_insensitive;
        Ok(Self {
            catalogs: CompiledRules::compile(&config.catalogs, ci)?,
            schemas: CompiledRules::compile(&config.schemas, ci)?,
            tables: CompiledRules::compile(&config.tables, ci)?,
            procedures: CompiledRules::compile(&config.procedures, ci)?,
            case_insensitive: ci,
        })
    }

    fn rules(&self, kind: ObjectKind) -> &CompiledRules {
        match kind {
            ObjectKind::Catalog => &self.catalogs,
            ObjectKind::Schema => &self.schemas,
            ObjectKind::Table => &self.tables,
            ObjectKind::Procedure => &self.procedures,
        }
    }

    /// Qualified name and its dot-suffixes, longest first
    fn candidates(&self, key: &QualifiedKey) -> Vec<String> {
        let parts: Vec<String> = key
            .parts()
            .into_iter()
            .map(|part| {
                if self.case_insensitive {
                    part.as_str().to_lowercase()
                } else {
                    part.as_str().to_string()
                }
            })
            .collect();
        (0..parts.len()).map(|i| parts[i..].join(".")).collect()
    }
}

impl InclusionPolicy for InclusionFilter {
    fn should_include(&self, kind: ObjectKind, key: &QualifiedKey) -> bool {
        // The default (unnamed) catalog or schema cannot be matched by name
        if key.name().is_none() {
            return true;
        }
        let included = self.rules(kind).allows(&self.candidates(key));
        if !included {
            tracing::debug!(?kind, key = %key, "excluded by filter");
        }
        included
    }
}
