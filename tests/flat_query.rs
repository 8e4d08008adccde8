//! Flat (ungrouped) requests against the in-memory store

mod common;

use common::{engine, engine_with, has_stage, options};
use gridshape::query::QueryConfig;
use serde_json::json;

#[tokio::test]
async fn test_filter_with_total_count() {
    let engine = engine();
    let response = engine
        .query(&options(json!({
            "filter": ["amount", ">", 100],
            "requireTotalCount": true
        })))
        .await
        .unwrap();

    assert_eq!(response.total_count, Some(3));
    let rows = response.data_rows().unwrap();
    assert_eq!(rows.len(), 3);
    assert!(rows.iter().all(|row| row["amount"].as_i64().unwrap() > 100));
}

#[tokio::test]
async fn test_total_count_ignores_paging() {
    let engine = engine();
    let response = engine
        .query(&options(json!({
            "sort": [{"selector": "amount", "desc": true}],
            "skip": 1,
            "take": 2,
            "requireTotalCount": true
        })))
        .await
        .unwrap();

    assert_eq!(response.total_count, Some(10));
    let amounts: Vec<_> = response
        .data_rows()
        .unwrap()
        .iter()
        .map(|row| row["amount"].clone())
        .collect();
    assert_eq!(amounts, vec![json!(250), json!(101)]);

    let pipelines = engine.runner().pipelines();
    assert_eq!(pipelines.len(), 2);
    assert_eq!(
        pipelines[0],
        vec![
            json!({"$sort": {"amount": -1}}),
            json!({"$skip": 1}),
            json!({"$limit": 2})
        ]
    );
    assert_eq!(pipelines[1], vec![json!({"$count": "count"})]);
}

#[tokio::test]
async fn test_total_summary() {
    let engine = engine();
    let response = engine
        .query(&options(json!({
            "filter": ["category", "=", "A"],
            "totalSummary": [
                {"selector": "amount", "summaryType": "sum"},
                {"selector": "amount", "summaryType": "max"},
                {"summaryType": "count"}
            ]
        })))
        .await
        .unwrap();

    assert_eq!(response.total_count, Some(5));
    assert_eq!(response.summary, Some(vec![json!(506), json!(250), json!(5)]));
}

#[tokio::test]
async fn test_total_summary_skipped_when_empty() {
    let engine = engine();
    let response = engine
        .query(&options(json!({
            "filter": ["amount", ">", 1000],
            "totalSummary": [{"selector": "amount", "summaryType": "sum"}]
        })))
        .await
        .unwrap();

    assert_eq!(response.total_count, Some(0));
    assert_eq!(response.summary, None);
    assert_eq!(response.to_json()["data"], json!([]));
}

#[tokio::test]
async fn test_search_runs_before_filter() {
    let engine = engine();
    let response = engine
        .query(&options(json!({
            "searchExpr": ["name", "category"],
            "searchOperation": "startswith",
            "searchValue": "Wid",
            "filter": ["amount", ">=", 50]
        })))
        .await
        .unwrap();

    let names: Vec<_> = response
        .data_rows()
        .unwrap()
        .iter()
        .map(|row| row["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["Widget 2", "Widget 4"]);

    let pipeline = &engine.runner().pipelines()[0];
    assert_eq!(
        pipeline[0],
        json!({"$match": {"$or": [
            {"name": {"$regex": "^Wid", "$options": ""}},
            {"category": {"$regex": "^Wid", "$options": ""}}
        ]}})
    );
    assert_eq!(pipeline[1], json!({"$match": {"amount": {"$gte": 50}}}));
}

#[tokio::test]
async fn test_blank_search_is_ignored() {
    let engine = engine();
    engine
        .query(&options(json!({
            "searchExpr": "name",
            "searchOperation": "contains",
            "searchValue": ""
        })))
        .await
        .unwrap();

    assert!(!has_stage(&engine.runner().pipelines()[0], "$match"));
}

#[tokio::test]
async fn test_select_and_identifiers() {
    let engine = engine();
    let response = engine
        .query(&options(json!({"select": ["amount"], "take": 1})))
        .await
        .unwrap();
    assert_eq!(
        response.data_rows().unwrap(),
        &[json!({"_id": "65a1f0c2e4b0a1b2c3d4e500", "amount": 5})]
    );

    let config = QueryConfig {
        normalize_identifiers: false,
        ..QueryConfig::default()
    };
    let engine = engine_with(config);
    let response = engine
        .query(&options(json!({"select": ["amount"], "take": 1})))
        .await
        .unwrap();
    assert_eq!(
        response.data_rows().unwrap()[0]["_id"],
        json!({"$oid": "65a1f0c2e4b0a1b2c3d4e500"})
    );
}

#[tokio::test]
async fn test_malformed_filter_matches_everything() {
    let engine = engine();
    let response = engine
        .query(&options(json!({
            "filter": [["amount", ">", 1], "and", ["amount", "<", 5], "or", ["amount", "=", 0]],
            "requireTotalCount": true
        })))
        .await
        .unwrap();

    assert_eq!(response.total_count, Some(10));
    assert!(!has_stage(&engine.runner().pipelines()[0], "$match"));
}

#[tokio::test]
async fn test_metrics_count_pipelines() {
    let engine = engine();
    engine
        .query(&options(json!({"requireTotalCount": true})))
        .await
        .unwrap();

    let metrics = engine.metrics().snapshot();
    assert_eq!(metrics.requests, 1);
    assert_eq!(metrics.pipelines_executed, 2);
    assert_eq!(metrics.count_queries, 1);
}
