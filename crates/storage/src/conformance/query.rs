use std::future::Future;

use super::{seeded, TestResult};
use crate::{FieldValue, Filter, FilterField, InventoryStore, ResourceField, ResourceQuery};

pub(super) async fn run_query_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: InventoryStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.push(TestResult::from_result(
        "query",
        "contains_ignores_case",
        contains_ignores_case(factory).await,
    ));
    results.push(TestResult::from_result(
        "query",
        "contains_matches_substring",
        contains_matches_substring(factory).await,
    ));
    results.push(TestResult::from_result(
        "query",
        "equals_is_case_sensitive",
        equals_is_case_sensitive(factory).await,
    ));
    results.push(TestResult::from_result(
        "query",
        "equals_cost_is_numeric",
        equals_cost_is_numeric(factory).await,
    ));
    results.push(TestResult::from_result(
        "query",
        "filters_are_conjunctive",
        filters_are_conjunctive(factory).await,
    ));
    results.push(TestResult::from_result(
        "query",
        "limit_bounds_results",
        limit_bounds_results(factory).await,
    ));
    results.push(TestResult::from_result(
        "query",
        "count_agrees_with_find",
        count_agrees_with_find(factory).await,
    ));
    results.push(TestResult::from_result(
        "query",
        "id_filter_selects_one",
        id_filter_selects_one(factory).await,
    ));
    results.push(TestResult::from_result(
        "query",
        "distinct_values_sorted_and_unique",
        distinct_values_sorted_and_unique(factory).await,
    ));

    results
}

async fn count<S: InventoryStore>(s: &S, query: &ResourceQuery) -> Result<u64, String> {
    s.count_resources(query)
        .await
        .map_err(|e| format!("count failed: {}", e))
}

async fn contains_ignores_case<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: InventoryStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = seeded(factory).await?;
    let q = ResourceQuery::new(vec![Filter::contains(ResourceField::Department, "cse")]);
    match count(&s, &q).await? {
        3 => Ok(()),
        n => Err(format!("expected 3 matches for department~'cse', got {}", n)),
    }
}

async fn contains_matches_substring<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: InventoryStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = seeded(factory).await?;
    let q = ResourceQuery::new(vec![Filter::contains(ResourceField::Location, "LAB")]);
    match count(&s, &q).await? {
        4 => Ok(()),
        n => Err(format!("expected 4 matches for location~'LAB', got {}", n)),
    }
}

async fn equals_is_case_sensitive<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: InventoryStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = seeded(factory).await?;
    let q = ResourceQuery::new(vec![Filter::equals(
        FilterField::Resource(ResourceField::Department),
        FieldValue::Text("cse".to_string()),
    )]);
    match count(&s, &q).await? {
        1 => Ok(()),
        n => Err(format!("expected 1 exact match for department='cse', got {}", n)),
    }
}

async fn equals_cost_is_numeric<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: InventoryStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = seeded(factory).await?;
    let q = ResourceQuery::new(vec![Filter::equals(
        FilterField::Resource(ResourceField::Cost),
        FieldValue::Number(45000.0),
    )]);
    let found = s
        .find_resources(&q, 0)
        .await
        .map_err(|e| format!("find failed: {}", e))?;
    if found.len() != 1 || found[0].description != "Oscilloscope" {
        return Err(format!("expected the oscilloscope, got {:?}", found));
    }
    Ok(())
}

async fn filters_are_conjunctive<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: InventoryStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = seeded(factory).await?;
    let q = ResourceQuery::new(vec![
        Filter::contains(ResourceField::Department, "CSE"),
        Filter::contains(ResourceField::Location, "lab 1"),
    ]);
    match count(&s, &q).await? {
        2 => Ok(()),
        n => Err(format!("expected 2 matches, got {}", n)),
    }
}

async fn limit_bounds_results<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: InventoryStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = seeded(factory).await?;
    let limited = s
        .find_resources(&ResourceQuery::all(), 2)
        .await
        .map_err(|e| format!("find failed: {}", e))?;
    let unlimited = s
        .find_resources(&ResourceQuery::all(), 0)
        .await
        .map_err(|e| format!("find failed: {}", e))?;
    if limited.len() != 2 {
        return Err(format!("expected 2 with limit, got {}", limited.len()));
    }
    if unlimited.len() != 5 {
        return Err(format!("expected 5 without limit, got {}", unlimited.len()));
    }
    Ok(())
}

async fn count_agrees_with_find<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: InventoryStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = seeded(factory).await?;
    let q = ResourceQuery::new(vec![Filter::contains(ResourceField::Description, "o")]);
    let found = s
        .find_resources(&q, 0)
        .await
        .map_err(|e| format!("find failed: {}", e))?;
    let n = count(&s, &q).await?;
    if found.len() as u64 != n {
        return Err(format!("find returned {} but count {}", found.len(), n));
    }
    Ok(())
}

async fn id_filter_selects_one<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: InventoryStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = seeded(factory).await?;
    let all = s
        .find_resources(&ResourceQuery::all(), 0)
        .await
        .map_err(|e| format!("find failed: {}", e))?;
    let target = &all[2];
    let q = ResourceQuery::new(vec![Filter::id(&target.id)]);
    let found = s
        .find_resources(&q, 0)
        .await
        .map_err(|e| format!("find failed: {}", e))?;
    if found.len() != 1 || found[0].id != target.id {
        return Err(format!("expected exactly {}, got {:?}", target.id, found));
    }
    Ok(())
}

async fn distinct_values_sorted_and_unique<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: InventoryStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = seeded(factory).await?;
    let departments = s
        .distinct_values(ResourceField::Department)
        .await
        .map_err(|e| format!("distinct failed: {}", e))?;
    if departments != ["CSE", "ECE", "EEE", "cse"] {
        return Err(format!("unexpected departments: {:?}", departments));
    }
    let locations = s
        .distinct_values(ResourceField::Location)
        .await
        .map_err(|e| format!("distinct failed: {}", e))?;
    if locations != ["Lab 1", "Lab 2", "Lab 3", "Office"] {
        return Err(format!("unexpected locations: {:?}", locations));
    }
    Ok(())
}
