//! Crawl configuration

use crate::filter::FilterConfig;
use schemagraph_core::{IdentifierPolicy, Result, SchemaGraphError};
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;

/// Which optional metadata a crawl fetches
///
/// Catalogs, schemas and tables are always fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InfoLevel {
    pub columns: bool,
    pub primary_keys: bool,
    pub indexes: bool,
    pub foreign_keys: bool,
    pub procedures: bool,
    /// Ignored unless procedures are fetched
    pub parameters: bool,
}

impl Default for InfoLevel {
    fn default() -> Self {
        Self {
            columns: true,
            primary_keys: true,
            indexes: true,
            foreign_keys: true,
            procedures: true,
            parameters: true,
        }
    }
}

impl InfoLevel {
    /// Namespaces and tables only
    pub fn minimum() -> Self {
        Self {
            columns: false,
            primary_keys: false,
            indexes: false,
            foreign_keys: false,
            procedures: false,
            parameters: false,
        }
    }

    /// Tables with columns and keys, no procedures
    pub fn standard() -> Self {
        Self {
            procedures: false,
            parameters: false,
            ..Self::default()
        }
    }
}

/// Options for a crawl
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlOptions {
    /// Maximum number of concurrent metadata source calls
    pub max_parallelism: usize,
    pub info_level: InfoLevel,
    /// Overrides the identifier policy reported by the source
    pub identifier_policy: Option<IdentifierPolicy>,
    pub filter: FilterConfig,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self {
            max_parallelism: 4,
            info_level: InfoLevel::default(),
            identifier_policy: None,
            filter: FilterConfig::default(),
        }
    }
}

impl CrawlOptions {
    /// Parse options from TOML
    ///
    /// ```toml
    /// max_parallelism = 8
    ///
    /// [info_level]
    /// procedures = false
    ///
    /// [filter.schemas]
    /// exclude = [{ pattern = "pg_.*" }]
    /// ```
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let options: Self = toml::from_str(content).map_err(|e| {
            SchemaGraphError::Configuration(format!("invalid crawl options: {}", e))
        })?;
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_parallelism == 0 {
            return Err(SchemaGraphError::Configuration(
                "max_parallelism must be at least 1".to_string(),
            ));
        }
        if self.max_parallelism > Semaphore::MAX_PERMITS {
            return Err(SchemaGraphError::Configuration(format!(
                "max_parallelism must be at most {}",
                Semaphore::MAX_PERMITS
            )));
        }
        Ok(())
    }

    /// Set the parallelism, clamped to what a semaphore can hand out
    pub fn with_max_parallelism(mut self, max: usize) -> Self {
        self.max_parallelism = max.clamp(1, Semaphore::MAX_PERMITS);
        self
    }

    pub fn with_info_level(mut self, info_level: InfoLevel) -> Self {
        self.info_level = info_level;
        self
    }

    pub fn with_identifier_policy(mut self, policy: IdentifierPolicy) -> Self {
        self.identifier_policy = Some(policy);
        self
    }

    pub fn with_filter(mut self, filter: FilterConfig) -> Self {
        self.filter = filter;
        self
    }
}
