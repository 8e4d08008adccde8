//! Per-request query context
//!
//! Bundles what every query of one request needs: the runner, the request,
//! the configuration and the observability handles.

use serde_json::Value;

use super::config::QueryConfig;
use super::errors::{QueryError, QueryResult};
use super::ids::IdentifierNormalizer;
use super::options::{LoadOptions, SummaryInfo};
use super::runner::PipelineRunner;
use crate::filter;
use crate::observability::{log_event, Event, MetricsRegistry};
use crate::pipeline::{
    compiled_filter_stages, group_key_stages, group_narrowing_stages, grouping_stages,
    search_stages, summary_values,
};

pub struct QueryContext<'a, R: PipelineRunner> {
    runner: &'a R,
    options: &'a LoadOptions,
    config: &'a QueryConfig,
    normalizer: &'a dyn IdentifierNormalizer,
    metrics: &'a MetricsRegistry,
}

impl<'a, R: PipelineRunner> QueryContext<'a, R> {
    pub fn new(
        runner: &'a R,
        options: &'a LoadOptions,
        config: &'a QueryConfig,
        normalizer: &'a dyn IdentifierNormalizer,
        metrics: &'a MetricsRegistry,
    ) -> Self {
        Self {
            runner,
            options,
            config,
            normalizer,
            metrics,
        }
    }

    pub fn options(&self) -> &'a LoadOptions {
        self.options
    }

    pub fn config(&self) -> &'a QueryConfig {
        self.config
    }

    pub fn metrics(&self) -> &'a MetricsRegistry {
        self.metrics
    }

    /// Execute one pipeline
    pub async fn run(&self, pipeline: &[Value]) -> QueryResult<Vec<Value>> {
        self.metrics.increment_pipelines();
        log_event(
            Event::PipelineExecute,
            &[("stages", &pipeline.len().to_string())],
        );
        self.runner.run(pipeline).await
    }

    /// Execute a pipeline ending in a `$count` stage. The store returns no
    /// document at all when nothing matched, which counts as 0.
    pub async fn count(&self, pipeline: &[Value]) -> QueryResult<u64> {
        self.metrics.increment_count_queries();
        let docs = self.run(pipeline).await?;
        match docs.first() {
            None => Ok(0),
            Some(doc) => doc.get("count").and_then(Value::as_u64).ok_or_else(|| {
                QueryError::InvalidResult(format!("count result without count: {}", doc))
            }),
        }
    }

    /// Execute a pipeline ending in a summary reduction and extract the
    /// values of `summaries`
    pub async fn summary(
        &self,
        summaries: &[SummaryInfo],
        pipeline: &[Value],
    ) -> QueryResult<Vec<Value>> {
        self.metrics.increment_summary_queries();
        let docs = self.run(pipeline).await?;
        Ok(summary_values(summaries, docs.first()))
    }

    /// Apply identifier normalization to a row, if enabled
    pub fn normalize(&self, doc: Value) -> Value {
        if self.config.normalize_identifiers {
            self.normalizer.normalize(doc)
        } else {
            doc
        }
    }

    /// Search stages followed by filter stages
    pub fn filter_stages(&self) -> Vec<Value> {
        let tz = self.config.timezone_offset;
        let mut stages = search_stages(
            self.options.search_expr.as_ref(),
            self.options.search_operation.as_deref(),
            self.options.search_value.as_ref(),
            tz,
        );

        if let Some(expr) = &self.options.filter {
            let compiled = filter::compile(expr);
            if compiled.predicate.is_none() {
                log_event(Event::FilterDiscarded, &[("filter", &expr.to_string())]);
            }
            stages.extend(compiled_filter_stages(&compiled, tz));
        }
        stages
    }

    /// Grouping block of group level `level`
    pub fn grouping(
        &self,
        level: usize,
        include_items: bool,
        count_separately: bool,
        item_projection: Option<Value>,
    ) -> Vec<Value> {
        let group = &self.options.group[level];
        let key = group_key_stages(
            &group.selector,
            group.group_interval.as_ref(),
            level,
            self.config.timezone_offset,
        );
        grouping_stages(group.desc, include_items, count_separately, key, item_projection)
    }

    /// Stages narrowing the scope to the group `key` of level `level`
    pub fn narrowing(&self, level: usize, key: &Value) -> Vec<Value> {
        let group = &self.options.group[level];
        group_narrowing_stages(
            &group.selector,
            group.group_interval.as_ref(),
            level,
            self.config.timezone_offset,
            key,
        )
    }
}
