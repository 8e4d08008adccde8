//! Query engine
//!
//! Entry point of a request. Flat requests become one data pipeline;
//! grouped requests go through [`GroupQuery`]. Both optionally add totals.

use serde_json::Value;

use super::budget::SummaryBudget;
use super::config::QueryConfig;
use super::context::QueryContext;
use super::errors::QueryResult;
use super::group::GroupQuery;
use super::ids::{IdentifierNormalizer, ObjectIdNormalizer};
use super::options::LoadOptions;
use super::result::QueryResponse;
use super::runner::PipelineRunner;
use crate::observability::{MetricsRegistry, ObservationScope};
use crate::pipeline::{
    count_stages, select_projection, select_stages, skip_take_stages, sort_stages,
    summary_stages,
};

/// Compiles load options into pipelines and executes them on a runner
pub struct QueryEngine<R: PipelineRunner> {
    runner: R,
    config: QueryConfig,
    normalizer: Box<dyn IdentifierNormalizer>,
    metrics: MetricsRegistry,
}

impl<R: PipelineRunner> QueryEngine<R> {
    /// Engine with default configuration
    pub fn new(runner: R) -> Self {
        Self::with_config(runner, QueryConfig::default())
    }

    pub fn with_config(runner: R, config: QueryConfig) -> Self {
        Self {
            runner,
            config,
            normalizer: Box::new(ObjectIdNormalizer),
            metrics: MetricsRegistry::new(),
        }
    }

    /// Replace the identifier normalizer
    pub fn with_normalizer(mut self, normalizer: impl IdentifierNormalizer + 'static) -> Self {
        self.normalizer = Box::new(normalizer);
        self
    }

    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    pub fn metrics(&self) -> &MetricsRegistry {
        &self.metrics
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Serve one request: grouped when `group` is non-empty, flat otherwise
    pub async fn query(&self, options: &LoadOptions) -> QueryResult<QueryResponse> {
        self.metrics.increment_requests();
        let mode = if options.is_grouped() { "grouped" } else { "flat" };
        let scope = ObservationScope::with_fields("QUERY", &[("mode", mode)]);

        let result = if options.is_grouped() {
            self.query_grouped(options).await
        } else {
            self.query_flat(options).await
        };

        match &result {
            Ok(_) => scope.complete(),
            Err(err) => {
                self.metrics.increment_requests_failed();
                scope.fail(err.code(), &err.to_string());
            }
        }
        result
    }

    /// filter, sort, page and select rows
    pub async fn query_flat(&self, options: &LoadOptions) -> QueryResult<QueryResponse> {
        let ctx = self.context(options);
        let filter = ctx.filter_stages();

        let mut pipeline = filter.clone();
        pipeline.extend(sort_stages(&options.sort));
        pipeline.extend(skip_take_stages(options.skip, options.take));
        pipeline.extend(select_stages(&options.select));

        let rows = ctx
            .run(&pipeline)
            .await?
            .into_iter()
            .map(|row| ctx.normalize(row))
            .collect();

        let mut response = QueryResponse::rows(rows);
        self.totals(&ctx, &filter, &mut response).await?;
        Ok(response)
    }

    /// Group rows level by level
    pub async fn query_grouped(&self, options: &LoadOptions) -> QueryResult<QueryResponse> {
        let ctx = self.context(options);
        let filter = ctx.filter_stages();
        let summary = summary_stages(&options.group_summary);
        let paging = skip_take_stages(options.skip, options.take);
        let budget = SummaryBudget::new(self.config.summary_limit());

        let groups = GroupQuery::new(
            &ctx,
            &budget,
            &filter,
            &summary,
            select_projection(&options.select, true),
        )
        .query_level(0, &paging, Vec::new())
        .await?;

        let mut response = QueryResponse::groups(groups);

        if options.require_group_count {
            let mut pipeline = filter.clone();
            pipeline.extend(ctx.grouping(0, false, false, None));
            pipeline.extend(count_stages());
            response.group_count = Some(ctx.count(&pipeline).await?);
        }

        self.totals(&ctx, &filter, &mut response).await?;
        Ok(response)
    }

    /// Total count and total summary. The summary is skipped when nothing
    /// matched, since the reduction would have no document to report.
    async fn totals(
        &self,
        ctx: &QueryContext<'_, R>,
        filter: &[Value],
        response: &mut QueryResponse,
    ) -> QueryResult<()> {
        let options = ctx.options();
        if !options.totals_required() {
            return Ok(());
        }

        let mut count_pipeline = filter.to_vec();
        count_pipeline.extend(count_stages());
        let total = ctx.count(&count_pipeline).await?;
        response.total_count = Some(total);

        if total > 0 && !options.total_summary.is_empty() {
            let mut summary_pipeline = filter.to_vec();
            summary_pipeline.extend(summary_stages(&options.total_summary));
            response.summary = Some(ctx.summary(&options.total_summary, &summary_pipeline).await?);
        }
        Ok(())
    }

    fn context<'a>(&'a self, options: &'a LoadOptions) -> QueryContext<'a, R> {
        QueryContext::new(
            &self.runner,
            options,
            &self.config,
            self.normalizer.as_ref(),
            &self.metrics,
        )
    }
}

/// One-shot query with a fresh engine
pub async fn query<R: PipelineRunner>(
    runner: R,
    options: &LoadOptions,
    config: QueryConfig,
) -> QueryResult<QueryResponse> {
    QueryEngine::with_config(runner, config).query(options).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::runner::RunFuture;
    use serde_json::json;
    use std::sync::Mutex;

    /// Records pipelines and replies with canned results in order
    struct Scripted {
        replies: Mutex<Vec<Vec<Value>>>,
        seen: Mutex<Vec<Vec<Value>>>,
    }

    impl Scripted {
        fn new(replies: Vec<Vec<Value>>) -> Self {
            Self {
                replies: Mutex::new(replies.into_iter().rev().collect()),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn seen(&self) -> Vec<Vec<Value>> {
            self.seen.lock().unwrap().clone()
        }
    }

    impl PipelineRunner for Scripted {
        fn run<'a>(&'a self, pipeline: &'a [Value]) -> RunFuture<'a> {
            self.seen.lock().unwrap().push(pipeline.to_vec());
            let reply = self.replies.lock().unwrap().pop().unwrap_or_default();
            Box::pin(async move { Ok(reply) })
        }
    }

    #[tokio::test]
    async fn test_flat_pipeline_shape() {
        let runner = Scripted::new(vec![vec![json!({"_id": {"$oid": "ab"}, "a": 1})]]);
        let engine = QueryEngine::new(&runner);
        let options = LoadOptions::from_value(json!({
            "filter": ["a", "=", 1],
            "sort": [{"selector": "a"}],
            "skip": 1,
            "take": 2,
            "select": ["a"]
        }))
        .unwrap();

        let response = engine.query(&options).await.unwrap();
        assert_eq!(response.data_rows().unwrap(), &[json!({"_id": "ab", "a": 1})]);
        assert_eq!(response.total_count, None);
        assert_eq!(
            runner.seen(),
            vec![vec![
                json!({"$match": {"a": {"$eq": 1}}}),
                json!({"$sort": {"a": 1}}),
                json!({"$skip": 1}),
                json!({"$limit": 2}),
                json!({"$project": {"a": "$a"}}),
            ]]
        );
    }

    #[tokio::test]
    async fn test_flat_total_summary_skipped_when_empty() {
        let runner = Scripted::new(vec![vec![], vec![]]);
        let engine = QueryEngine::new(&runner);
        let options = LoadOptions::from_value(json!({
            "totalSummary": [{"selector": "a", "summaryType": "sum"}]
        }))
        .unwrap();

        let response = engine.query(&options).await.unwrap();
        assert_eq!(response.total_count, Some(0));
        assert_eq!(response.summary, None);
        assert_eq!(runner.seen().len(), 2);
    }

    #[tokio::test]
    async fn test_flat_without_normalization() {
        let runner = Scripted::new(vec![vec![json!({"_id": {"$oid": "ab"}})]]);
        let config = QueryConfig {
            normalize_identifiers: false,
            ..QueryConfig::default()
        };
        let response = query(&runner, &LoadOptions::default(), config).await.unwrap();
        assert_eq!(response.data_rows().unwrap(), &[json!({"_id": {"$oid": "ab"}})]);
    }

    #[tokio::test]
    async fn test_discarded_filter_yields_no_stage() {
        let runner = Scripted::new(vec![vec![]]);
        let engine = QueryEngine::new(&runner);
        let options = LoadOptions::from_value(json!({"filter": [["a", "=", 1], "and", ["b", "=", 2], "or", ["c", "=", 3]]})).unwrap();
        engine.query(&options).await.unwrap();
        assert_eq!(runner.seen(), vec![Vec::<Value>::new()]);
    }

    #[tokio::test]
    async fn test_group_count_pipeline() {
        let runner = Scripted::new(vec![
            vec![json!({"key": "A", "count": 2, "items": null})],
            vec![json!({"count": 1})],
        ]);
        let engine = QueryEngine::new(&runner);
        let options = LoadOptions::from_value(json!({
            "group": [{"selector": "category"}],
            "requireGroupCount": true
        }))
        .unwrap();

        let response = engine.query(&options).await.unwrap();
        assert_eq!(response.group_count, Some(1));
        assert_eq!(
            runner.seen()[1],
            vec![
                json!({"$addFields": {"___group_key_0": "$category"}}),
                json!({"$group": {"_id": "$___group_key_0", "count": {"$sum": 1}}}),
                json!({"$project": {"_id": 0, "key": "$_id", "count": 1}}),
                json!({"$sort": {"key": 1}}),
                json!({"$addFields": {"items": null}}),
                json!({"$count": "count"}),
            ]
        );
    }

    #[tokio::test]
    async fn test_invalid_group_document_fails_request() {
        let runner = Scripted::new(vec![vec![json!({"count": 2})]]);
        let engine = QueryEngine::new(&runner);
        let options = LoadOptions::from_value(json!({"group": [{"selector": "category"}]})).unwrap();

        let err = engine.query(&options).await.unwrap_err();
        assert_eq!(err.code(), "GRID_INVALID_RESULT");
        let metrics = engine.metrics().snapshot();
        assert_eq!(metrics.requests, 1);
        assert_eq!(metrics.requests_failed, 1);
    }
}
