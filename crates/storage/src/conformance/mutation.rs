use std::collections::BTreeMap;
use std::future::Future;

use super::{seeded, TestResult};
use crate::{
    FieldValue, Filter, InventoryStore, ResourceField, ResourcePatch, ResourceQuery,
    StorageError, UpdateCounts,
};

pub(super) async fn run_mutation_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: InventoryStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.push(TestResult::from_result(
        "mutation",
        "update_reports_matched_and_modified",
        update_reports_matched_and_modified(factory).await,
    ));
    results.push(TestResult::from_result(
        "mutation",
        "update_writes_values_and_stamps",
        update_writes_values_and_stamps(factory).await,
    ));
    results.push(TestResult::from_result(
        "mutation",
        "update_without_matches_is_zero",
        update_without_matches_is_zero(factory).await,
    ));
    results.push(TestResult::from_result(
        "mutation",
        "update_unchanged_record_not_modified",
        update_unchanged_record_not_modified(factory).await,
    ));
    results.push(TestResult::from_result(
        "mutation",
        "update_rejects_textual_cost",
        update_rejects_textual_cost(factory).await,
    ));
    results.push(TestResult::from_result(
        "mutation",
        "delete_reports_count_and_removes",
        delete_reports_count_and_removes(factory).await,
    ));
    results.push(TestResult::from_result(
        "mutation",
        "repeated_delete_is_zero",
        repeated_delete_is_zero(factory).await,
    ));

    results
}

fn cse() -> ResourceQuery {
    ResourceQuery::new(vec![Filter::contains(ResourceField::Department, "cse")])
}

fn cost_patch(cost: FieldValue, at: &str) -> ResourcePatch {
    let mut values = BTreeMap::new();
    values.insert(ResourceField::Cost, cost);
    ResourcePatch {
        values,
        updated_by: "conformance@example.com".to_string(),
        updated_at: at.to_string(),
    }
}

async fn update_reports_matched_and_modified<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: InventoryStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = seeded(factory).await?;
    let counts = s
        .update_resources(&cse(), &cost_patch(FieldValue::Number(999.0), "2025-02-01T00:00:00Z"))
        .await
        .map_err(|e| format!("update failed: {}", e))?;
    let expected = UpdateCounts {
        matched: 3,
        modified: 3,
    };
    if counts != expected {
        return Err(format!("expected {:?}, got {:?}", expected, counts));
    }
    Ok(())
}

async fn update_writes_values_and_stamps<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: InventoryStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = seeded(factory).await?;
    s.update_resources(&cse(), &cost_patch(FieldValue::Number(1000.0), "2025-02-01T00:00:00Z"))
        .await
        .map_err(|e| format!("update failed: {}", e))?;
    let updated = s
        .find_resources(&cse(), 0)
        .await
        .map_err(|e| format!("find failed: {}", e))?;
    for r in &updated {
        if r.cost != 1000.0 {
            return Err(format!("{} still has cost {}", r.description, r.cost));
        }
        if r.updated_by.as_deref() != Some("conformance@example.com") {
            return Err(format!("{} missing updated_by", r.description));
        }
        if r.updated_at != "2025-02-01T00:00:00Z" {
            return Err(format!("{} has updated_at {}", r.description, r.updated_at));
        }
    }
    let untouched = s
        .find_resources(
            &ResourceQuery::new(vec![Filter::contains(ResourceField::Department, "ECE")]),
            0,
        )
        .await
        .map_err(|e| format!("find failed: {}", e))?;
    if untouched.iter().any(|r| r.cost == 1000.0) {
        return Err("update leaked outside its query".to_string());
    }
    Ok(())
}

async fn update_without_matches_is_zero<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: InventoryStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = seeded(factory).await?;
    let q = ResourceQuery::new(vec![Filter::contains(ResourceField::Department, "MECH")]);
    let counts = s
        .update_resources(&q, &cost_patch(FieldValue::Number(1.0), "2025-02-01T00:00:00Z"))
        .await
        .map_err(|e| format!("update failed: {}", e))?;
    if counts != UpdateCounts::default() {
        return Err(format!("expected zero counts, got {:?}", counts));
    }
    Ok(())
}

async fn update_unchanged_record_not_modified<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: InventoryStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = seeded(factory).await?;
    let patch = cost_patch(FieldValue::Number(5.0), "2025-02-01T00:00:00Z");
    s.update_resources(&cse(), &patch)
        .await
        .map_err(|e| format!("first update failed: {}", e))?;
    let counts = s
        .update_resources(&cse(), &patch)
        .await
        .map_err(|e| format!("second update failed: {}", e))?;
    if counts.matched != 3 || counts.modified != 0 {
        return Err(format!("expected 3 matched / 0 modified, got {:?}", counts));
    }
    Ok(())
}

async fn update_rejects_textual_cost<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: InventoryStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = seeded(factory).await?;
    let patch = cost_patch(
        FieldValue::Text("one thousand".to_string()),
        "2025-02-01T00:00:00Z",
    );
    match s.update_resources(&cse(), &patch).await {
        Err(StorageError::Backend(_)) => Ok(()),
        other => Err(format!("expected Backend error, got {:?}", other)),
    }
}

async fn delete_reports_count_and_removes<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: InventoryStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = seeded(factory).await?;
    let deleted = s
        .delete_resources(&cse())
        .await
        .map_err(|e| format!("delete failed: {}", e))?;
    if deleted != 3 {
        return Err(format!("expected 3 deleted, got {}", deleted));
    }
    let remaining = s
        .count_resources(&cse())
        .await
        .map_err(|e| format!("count failed: {}", e))?;
    let total = s
        .count_resources(&ResourceQuery::all())
        .await
        .map_err(|e| format!("count failed: {}", e))?;
    if remaining != 0 || total != 2 {
        return Err(format!(
            "expected 0 matching / 2 total after delete, got {} / {}",
            remaining, total
        ));
    }
    Ok(())
}

async fn repeated_delete_is_zero<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: InventoryStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = seeded(factory).await?;
    s.delete_resources(&cse())
        .await
        .map_err(|e| format!("delete failed: {}", e))?;
    let again = s
        .delete_resources(&cse())
        .await
        .map_err(|e| format!("delete failed: {}", e))?;
    if again != 0 {
        return Err(format!("expected 0 on repeated delete, got {}", again));
    }
    Ok(())
}
