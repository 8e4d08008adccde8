//! Recursive group query
//!
//! Each group level is one aggregation query, narrowed to the parent group
//! by the scope stages accumulated on the way down. Per level:
//!
//! - deepest and expanded: rows are pushed by `$group`, count is inline
//! - above the deepest level: recurse per group, count = number of children
//! - collapsed and not materialized: count children with a separate query
//!
//! Group summaries cost one query per group and draw on a shared
//! [`SummaryBudget`].

use std::future::Future;
use std::pin::Pin;

use serde_json::Value;

use super::budget::SummaryBudget;
use super::context::QueryContext;
use super::errors::QueryResult;
use super::result::{GroupItem, GroupItems};
use super::runner::PipelineRunner;
use crate::observability::{log_event, Event};
use crate::pipeline::{count_stages, sort_stages, strip_group_key_fields};

type LevelFuture<'s> = Pin<Box<dyn Future<Output = QueryResult<Vec<GroupItem>>> + Send + 's>>;

/// Fragments shared by every level of one grouped request
pub struct GroupQuery<'a, R: PipelineRunner> {
    ctx: &'a QueryContext<'a, R>,
    budget: &'a SummaryBudget,
    filter: &'a [Value],
    summary: &'a [Value],
    item_projection: Option<Value>,
}

impl<'a, R: PipelineRunner> GroupQuery<'a, R> {
    pub fn new(
        ctx: &'a QueryContext<'a, R>,
        budget: &'a SummaryBudget,
        filter: &'a [Value],
        summary: &'a [Value],
        item_projection: Option<Value>,
    ) -> Self {
        Self {
            ctx,
            budget,
            filter,
            summary,
            item_projection,
        }
    }

    /// Queries level `level` within `scope`. `paging` is only non-empty at
    /// level 0.
    pub fn query_level<'s>(
        &'s self,
        level: usize,
        paging: &'s [Value],
        scope: Vec<Value>,
    ) -> LevelFuture<'s> {
        Box::pin(async move {
            let options = self.ctx.options();
            let group = &options.group[level];
            let last = level + 1 == options.group.len();

            let item_data_required = last && group.is_expanded;
            let sub_groups_required = !last
                && (self.ctx.config().materialize_collapsed_groups || group.is_expanded);
            let separate_count_required = !last;

            // sort first so the store can use an index
            let mut pipeline = if item_data_required {
                sort_stages(&options.sort)
            } else {
                Vec::new()
            };
            pipeline.extend_from_slice(self.filter);
            pipeline.extend_from_slice(&scope);
            pipeline.extend(self.ctx.grouping(
                level,
                item_data_required,
                separate_count_required,
                self.item_projection.clone(),
            ));
            pipeline.extend_from_slice(paging);

            let docs = self.ctx.run(&pipeline).await?;
            let mut groups = docs
                .iter()
                .map(GroupItem::from_document)
                .collect::<QueryResult<Vec<_>>>()?;

            log_event(
                Event::GroupLevelQueried,
                &[
                    ("groups", &groups.len().to_string()),
                    ("level", &level.to_string()),
                ],
            );
            self.ctx.metrics().add_groups(groups.len() as u64);

            if item_data_required {
                for item in &mut groups {
                    if let Some(GroupItems::Rows(rows)) = item.items.take() {
                        let rows = rows
                            .into_iter()
                            .map(|row| self.ctx.normalize(strip_group_key_fields(row)))
                            .collect();
                        item.items = Some(GroupItems::Rows(rows));
                    }
                }
            }

            if sub_groups_required {
                for item in &mut groups {
                    let mut child_scope = scope.clone();
                    child_scope.extend(self.ctx.narrowing(level, &item.key));
                    let children = self.query_level(level + 1, &[], child_scope).await?;
                    item.count = children.len() as u64;
                    item.items = Some(GroupItems::Groups(children));
                }
            } else if separate_count_required {
                for item in &mut groups {
                    let mut count_pipeline = self.scoped(&scope, level, &item.key);
                    count_pipeline.extend(self.ctx.grouping(level + 1, false, true, None));
                    count_pipeline.extend(count_stages());
                    item.count = self.ctx.count(&count_pipeline).await?;
                }
            }

            if !options.group_summary.is_empty() {
                for item in &mut groups {
                    if !self.budget.try_acquire() {
                        self.ctx.metrics().increment_summary_skipped();
                        continue;
                    }
                    let mut summary_pipeline = self.scoped(&scope, level, &item.key);
                    summary_pipeline.extend_from_slice(self.summary);
                    let values = self
                        .ctx
                        .summary(&options.group_summary, &summary_pipeline)
                        .await?;
                    item.summary = Some(values);
                }
            }

            Ok(groups)
        })
    }

    /// filter ++ scope ++ narrowing to one group
    fn scoped(&self, scope: &[Value], level: usize, key: &Value) -> Vec<Value> {
        let mut pipeline = self.filter.to_vec();
        pipeline.extend_from_slice(scope);
        pipeline.extend(self.ctx.narrowing(level, key));
        pipeline
    }
}
