//! Level-by-level crawl of a metadata source

use super::cancel::CrawlCancelHandle;
use super::options::CrawlOptions;
use super::staging::StagingBuffer;
use crate::builder::{GraphBuilder, ProcedureSlot};
use crate::filter::{IncludeAll, InclusionFilter, InclusionPolicy};
use crate::model::{Completeness, PartialReason, SchemaGraph};
use schemagraph_core::{
    IdentifierResolver, MetadataSource, QualifiedKey, Result, SchemaGraphError, SourceError,
    SourceResult,
};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// A unit a level is fetched by: a namespace, a table or a procedure
trait FetchScope: Ord + Clone + Send + Sync + 'static {
    fn key(&self) -> &QualifiedKey;
}

impl FetchScope for QualifiedKey {
    fn key(&self) -> &QualifiedKey {
        self
    }
}

impl FetchScope for ProcedureSlot {
    fn key(&self) -> &QualifiedKey {
        &self.key
    }
}

enum Progress {
    Continue,
    Cancelled,
}

/// Crawls a metadata source into a sealed schema graph
pub struct Crawler {
    source: Arc<dyn MetadataSource>,
    options: CrawlOptions,
    policy: Arc<dyn InclusionPolicy>,
    cancel: CrawlCancelHandle,
}

impl Crawler {
    /// Create a crawler; the filter in `options` is compiled here
    pub fn new(source: Arc<dyn MetadataSource>, options: CrawlOptions) -> Result<Self> {
        options.validate()?;
        let policy: Arc<dyn InclusionPolicy> = if options.filter.is_empty() {
            Arc::new(IncludeAll)
        } else {
            Arc::new(InclusionFilter::from_config(&options.filter)?)
        };
        Ok(Self {
            source,
            options,
            policy,
            cancel: CrawlCancelHandle::new(),
        })
    }

    /// Replace the inclusion policy built from the options
    pub fn with_policy(mut self, policy: Arc<dyn InclusionPolicy>) -> Self {
        self.policy = policy;
        self
    }

    /// Use an externally owned cancellation handle
    pub fn with_cancel_handle(mut self, cancel: CrawlCancelHandle) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_handle(&self) -> CrawlCancelHandle {
        self.cancel.clone()
    }

    pub fn options(&self) -> &CrawlOptions {
        &self.options
    }

    /// Run the crawl and seal the result
    ///
    /// Only a failure to list catalogs is returned as an error. Every other
    /// source failure is recorded in the report and treated as an empty
    /// result. A cancelled crawl returns the graph built so far, tagged
    /// `Completeness::Partial`.
    #[tracing::instrument(skip(self), fields(source = %self.source.name()))]
    pub async fn crawl(&self) -> Result<SchemaGraph> {
        let identifier_policy = self
            .options
            .identifier_policy
            .clone()
            .unwrap_or_else(|| self.source.identifier_policy());
        let mut builder = GraphBuilder::new(IdentifierResolver::new(identifier_policy))
            .with_policy(self.policy.clone());
        tracing::debug!(
            crawl_id = %builder.report().crawl_id,
            max_parallelism = self.options.max_parallelism,
            "starting crawl"
        );

        if self.cancel.is_cancelled() {
            return self.seal_partial(&mut builder);
        }
        let catalogs = self.source.fetch_catalogs().await.map_err(|source| {
            SchemaGraphError::SourceFetch {
                operation: "fetch catalogs".to_string(),
                scope: self.source.name().to_string(),
                source,
            }
        })?;
        builder.ingest_catalogs(catalogs)?;

        if let Progress::Cancelled = self.crawl_levels(&mut builder).await? {
            return self.seal_partial(&mut builder);
        }

        let graph = builder.seal(Completeness::Complete)?;
        tracing::info!(
            tables = graph.table_count(),
            issues = graph.report().has_issues(),
            "crawl complete"
        );
        Ok(graph)
    }

    async fn crawl_levels(&self, builder: &mut GraphBuilder) -> Result<Progress> {
        let info = self.options.info_level;
        let mut complete = true;

        let scopes = builder.catalog_keys();
        complete &= self.run_level(
            builder,
            "fetch schemas",
            scopes,
            |source, catalog| async move { source.fetch_schemas(&catalog).await },
            GraphBuilder::ingest_schemas,
        )
        .await?;

        let scopes = builder.schema_keys();
        complete &= self.run_level(
            builder,
            "fetch tables",
            scopes,
            |source, schema| async move { source.fetch_tables(&schema).await },
            GraphBuilder::ingest_tables,
        )
        .await?;

        if info.columns {
            let scopes = builder.table_keys();
            complete &= self.run_level(
                builder,
                "fetch columns",
                scopes,
                |source, table| async move { source.fetch_columns(&table).await },
                GraphBuilder::ingest_columns,
            )
            .await?;
        }

        if info.primary_keys {
            let scopes = builder.table_keys();
            complete &= self.run_level(
                builder,
                "fetch primary keys",
                scopes,
                |source, table| async move { source.fetch_primary_keys(&table).await },
                GraphBuilder::stage_primary_keys,
            )
            .await?;
        }

        if info.indexes {
            let scopes = builder.table_keys();
            complete &= self.run_level(
                builder,
                "fetch indexes",
                scopes,
                |source, table| async move { source.fetch_indexes(&table).await },
                GraphBuilder::stage_indexes,
            )
            .await?;
        }

        if info.foreign_keys {
            let scopes = builder.schema_keys();
            complete &= self.run_level(
                builder,
                "fetch foreign keys",
                scopes,
                |source, schema| async move { source.fetch_foreign_keys(&schema).await },
                GraphBuilder::stage_foreign_keys,
            )
            .await?;
        }

        if info.procedures {
            let scopes = builder.schema_keys();
            complete &= self.run_level(
                builder,
                "fetch procedures",
                scopes,
                |source, schema| async move { source.fetch_procedures(&schema).await },
                GraphBuilder::ingest_procedures,
            )
            .await?;

            if info.parameters {
                let scopes = builder.procedure_slots();
                complete &= self.run_level(
                    builder,
                    "fetch parameters",
                    scopes,
                    |source, slot: ProcedureSlot| async move {
                        source
                            .fetch_parameters(&slot.key, slot.specific_name.as_deref())
                            .await
                    },
                    GraphBuilder::ingest_parameters,
                )
                .await?;
            }
        }

        // A cancel that arrives after the last call leaves the graph complete
        Ok(if complete {
            Progress::Continue
        } else {
            Progress::Cancelled
        })
    }

    /// Fetch one level concurrently and ingest it in scope order
    ///
    /// Once cancellation is observed no further source call is issued; the
    /// batches that did arrive are still ingested. Returns `false` when a
    /// scope was skipped because of cancellation.
    async fn run_level<K, T, F, Fut>(
        &self,
        builder: &mut GraphBuilder,
        operation: &'static str,
        scopes: Vec<K>,
        fetch: F,
        ingest: fn(&mut GraphBuilder, Vec<T>) -> Result<()>,
    ) -> Result<bool>
    where
        K: FetchScope,
        T: Send + 'static,
        F: Fn(Arc<dyn MetadataSource>, K) -> Fut,
        Fut: Future<Output = SourceResult<Vec<T>>> + Send + 'static,
    {
        if scopes.is_empty() {
            return Ok(true);
        }
        if self.cancel.is_cancelled() {
            return Ok(false);
        }
        tracing::debug!(operation, scopes = scopes.len(), "fetching level");

        let staging = Arc::new(StagingBuffer::new());
        let semaphore = Arc::new(Semaphore::new(self.options.max_parallelism));
        let mut handles = Vec::with_capacity(scopes.len());

        for scope in scopes {
            let task = fetch(self.source.clone(), scope.clone());
            let staging = staging.clone();
            let semaphore = semaphore.clone();
            let cancel = self.cancel.clone();
            let staged_scope = scope.clone();

            let handle = tokio::spawn(async move {
                let Ok(_permit) = semaphore.acquire().await else {
                    return false;
                };
                // Checked after the permit so queued scopes observe a late cancel
                if cancel.is_cancelled() {
                    return false;
                }
                match task.await {
                    Ok(records) => staging.append(staged_scope, records),
                    Err(error) => staging.fail(staged_scope, error),
                }
                true
            });
            handles.push((scope, handle));
        }

        let mut fetched_all = true;
        for (scope, handle) in handles {
            match handle.await {
                Ok(fetched) => fetched_all &= fetched,
                Err(e) => {
                    tracing::error!(
                        operation,
                        scope = %scope.key(),
                        error = %e,
                        "metadata fetch task failed"
                    );
                    let error = SourceError::Other(format!("fetch task failed: {}", e));
                    builder.record_source_failure(operation, scope.key(), &error);
                }
            }
        }

        let (batches, failures) = staging.drain();
        for (scope, error) in failures {
            builder.record_source_failure(operation, scope.key(), &error);
        }
        for (_, records) in batches {
            ingest(builder, records)?;
        }
        Ok(fetched_all)
    }

    fn seal_partial(&self, builder: &mut GraphBuilder) -> Result<SchemaGraph> {
        tracing::info!("crawl cancelled, sealing partial graph");
        builder.seal(Completeness::Partial {
            reason: PartialReason::Cancelled,
        })
    }
}
