use std::future::Future;

use super::{make_conversation, TestResult};
use crate::InventoryStore;

pub(super) async fn run_conversation_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: InventoryStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.push(TestResult::from_result(
        "conversation",
        "list_is_newest_first",
        list_is_newest_first(factory).await,
    ));
    results.push(TestResult::from_result(
        "conversation",
        "list_is_scoped_to_user",
        list_is_scoped_to_user(factory).await,
    ));
    results.push(TestResult::from_result(
        "conversation",
        "skip_and_limit_page_through",
        skip_and_limit_page_through(factory).await,
    ));
    results.push(TestResult::from_result(
        "conversation",
        "unknown_user_has_no_history",
        unknown_user_has_no_history(factory).await,
    ));

    results
}

async fn insert_three<S: InventoryStore>(s: &S, user_id: &str) -> Result<(), String> {
    for (i, question) in ["first", "second", "third"].iter().enumerate() {
        let ts = format!("2025-01-01T00:00:0{}Z", i);
        s.insert_conversation(make_conversation(user_id, question, &ts))
            .await
            .map_err(|e| format!("insert failed: {}", e))?;
    }
    Ok(())
}

async fn list_is_newest_first<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: InventoryStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    insert_three(&s, "user-1").await?;
    let history = s
        .list_conversations("user-1", 0, 0)
        .await
        .map_err(|e| format!("list failed: {}", e))?;
    let questions: Vec<&str> = history.iter().map(|c| c.question.as_str()).collect();
    if questions != ["third", "second", "first"] {
        return Err(format!("unexpected order: {:?}", questions));
    }
    Ok(())
}

async fn list_is_scoped_to_user<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: InventoryStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    insert_three(&s, "user-1").await?;
    insert_three(&s, "user-2").await?;
    let history = s
        .list_conversations("user-2", 0, 0)
        .await
        .map_err(|e| format!("list failed: {}", e))?;
    if history.len() != 3 || history.iter().any(|c| c.user_id != "user-2") {
        return Err(format!("history leaked across users: {:?}", history));
    }
    Ok(())
}

async fn skip_and_limit_page_through<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: InventoryStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    insert_three(&s, "user-1").await?;
    let page = s
        .list_conversations("user-1", 1, 1)
        .await
        .map_err(|e| format!("list failed: {}", e))?;
    if page.len() != 1 || page[0].question != "second" {
        return Err(format!("expected ['second'], got {:?}", page));
    }
    let past_end = s
        .list_conversations("user-1", 5, 10)
        .await
        .map_err(|e| format!("list failed: {}", e))?;
    if !past_end.is_empty() {
        return Err(format!("expected empty page, got {:?}", past_end));
    }
    Ok(())
}

async fn unknown_user_has_no_history<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: InventoryStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    insert_three(&s, "user-1").await?;
    let history = s
        .list_conversations("nobody", 0, 0)
        .await
        .map_err(|e| format!("list failed: {}", e))?;
    if !history.is_empty() {
        return Err(format!("expected no history, got {:?}", history));
    }
    Ok(())
}
