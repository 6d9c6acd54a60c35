use std::future::Future;

use super::{make_resource, TestResult};
use crate::{InventoryStore, ResourceId, ResourceQuery, StorageError};

pub(super) async fn run_resource_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: InventoryStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.push(TestResult::from_result(
        "resource",
        "insert_then_get_round_trips",
        insert_then_get_round_trips(factory).await,
    ));
    results.push(TestResult::from_result(
        "resource",
        "inserted_id_is_well_formed",
        inserted_id_is_well_formed(factory).await,
    ));
    results.push(TestResult::from_result(
        "resource",
        "insert_assigns_distinct_ids",
        insert_assigns_distinct_ids(factory).await,
    ));
    results.push(TestResult::from_result(
        "resource",
        "get_missing_returns_not_found",
        get_missing_returns_not_found(factory).await,
    ));
    results.push(TestResult::from_result(
        "resource",
        "find_preserves_insertion_order",
        find_preserves_insertion_order(factory).await,
    ));

    results
}

async fn insert_then_get_round_trips<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: InventoryStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let new = make_resource("Dell Monitor", "Lab 1", "CSE", 12000.0);
    let id = s
        .insert_resource(new.clone())
        .await
        .map_err(|e| format!("insert failed: {}", e))?;
    let got = s
        .get_resource(&id)
        .await
        .map_err(|e| format!("get failed: {}", e))?;

    if got.id != id {
        return Err(format!("expected id {}, got {}", id, got.id));
    }
    if got.description != new.description
        || got.location != new.location
        || got.department != new.department
        || got.service_tag != new.service_tag
        || got.sl_no != new.sl_no
        || got.identification_number != new.identification_number
        || got.procurement_date != new.procurement_date
    {
        return Err(format!("stored fields differ from input: {:?}", got));
    }
    if got.cost != 12000.0 {
        return Err(format!("expected cost 12000, got {}", got.cost));
    }
    if got.created_by != new.created_by || got.created_at != new.created_at {
        return Err("creator stamp not preserved".to_string());
    }
    if got.updated_by.is_some() {
        return Err("fresh record should have no updated_by".to_string());
    }
    Ok(())
}

async fn inserted_id_is_well_formed<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: InventoryStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let id = s
        .insert_resource(make_resource("Router", "Server Room", "IT", 9000.0))
        .await
        .map_err(|e| format!("insert failed: {}", e))?;
    ResourceId::parse(id.as_str()).map_err(|e| e.to_string())?;
    if id.as_str().len() != 24 {
        return Err(format!("expected 24-char id, got '{}'", id));
    }
    Ok(())
}

async fn insert_assigns_distinct_ids<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: InventoryStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let mut ids = Vec::new();
    for _ in 0..20 {
        let id = s
            .insert_resource(make_resource("Chair", "Lab 1", "CSE", 100.0))
            .await
            .map_err(|e| format!("insert failed: {}", e))?;
        if ids.contains(&id) {
            return Err(format!("duplicate id {}", id));
        }
        ids.push(id);
    }
    Ok(())
}

async fn get_missing_returns_not_found<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: InventoryStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let id = ResourceId::parse("000000000000000000000000").map_err(|e| e.to_string())?;
    match s.get_resource(&id).await {
        Err(StorageError::ResourceNotFound { id: missing }) if missing == id.as_str() => Ok(()),
        other => Err(format!("expected ResourceNotFound, got {:?}", other)),
    }
}

async fn find_preserves_insertion_order<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: InventoryStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = super::seeded(factory).await?;
    let all = s
        .find_resources(&ResourceQuery::all(), 0)
        .await
        .map_err(|e| format!("find failed: {}", e))?;
    let descriptions: Vec<&str> = all.iter().map(|r| r.description.as_str()).collect();
    let expected = [
        "Dell Monitor",
        "HP Printer",
        "Oscilloscope",
        "Lenovo Laptop",
        "Multimeter",
    ];
    if descriptions != expected {
        return Err(format!("unexpected order: {:?}", descriptions));
    }
    Ok(())
}
