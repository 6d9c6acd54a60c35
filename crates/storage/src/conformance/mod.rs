//! Conformance test suite for `InventoryStore` implementations.
//!
//! This module provides a backend-agnostic test suite that any `InventoryStore`
//! implementation can run to verify correctness. The suite covers:
//!
//! - **Resources**: insert/get round trip, identifier shape, not-found errors
//! - **Queries**: case-insensitive containment, exact equality, numeric cost,
//!   conjunctions, result limits
//! - **Mutations**: bulk update matched/modified counts, bulk delete counts
//! - **Conversations**: per-user isolation, newest-first ordering, paging
//!
//! # Usage
//!
//! Backend crates call [`run_conformance_suite`] with a factory function that
//! creates a fresh, empty store for each test:
//!
//! ```ignore
//! use assetdesk_storage::conformance::run_conformance_suite;
//!
//! #[tokio::test]
//! async fn mongo_conformance() {
//!     let report = run_conformance_suite(|| async {
//!         create_test_mongo_store().await
//!     }).await;
//!     assert!(report.failed == 0, "{report}");
//! }
//! ```

mod conversation;
mod mutation;
mod query;
mod resource;

use std::fmt;
use std::future::Future;

use crate::record::{ConversationRecord, NewResource};
use crate::InventoryStore;

/// Result of a single conformance test.
#[derive(Debug, Clone)]
pub struct TestResult {
    /// Test category (e.g. "resource", "query", "mutation").
    pub category: String,
    /// Test name (e.g. "insert_then_get_round_trips").
    pub name: String,
    /// Whether the test passed.
    pub passed: bool,
    /// Error message if the test failed.
    pub message: Option<String>,
}

impl TestResult {
    fn pass(category: &str, name: &str) -> Self {
        Self {
            category: category.to_string(),
            name: name.to_string(),
            passed: true,
            message: None,
        }
    }

    fn fail(category: &str, name: &str, msg: String) -> Self {
        Self {
            category: category.to_string(),
            name: name.to_string(),
            passed: false,
            message: Some(msg),
        }
    }

    fn from_result(category: &str, name: &str, result: Result<(), String>) -> Self {
        match result {
            Ok(()) => Self::pass(category, name),
            Err(msg) => Self::fail(category, name, msg),
        }
    }
}

/// Aggregated report from a full conformance suite run.
#[derive(Debug, Clone)]
pub struct ConformanceReport {
    pub results: Vec<TestResult>,
    pub passed: usize,
    pub failed: usize,
    pub total: usize,
}

impl fmt::Display for ConformanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Conformance: {}/{} passed ({} failed)",
            self.passed, self.total, self.failed
        )?;
        for r in &self.results {
            if !r.passed {
                writeln!(
                    f,
                    "  FAIL [{}/{}]: {}",
                    r.category,
                    r.name,
                    r.message.as_deref().unwrap_or("(no message)")
                )?;
            }
        }
        Ok(())
    }
}

/// Run the full conformance suite against a storage backend.
///
/// The `factory` function is called once per test to create a fresh, empty
/// store instance, ensuring test isolation.
pub async fn run_conformance_suite<S, F, Fut>(factory: F) -> ConformanceReport
where
    S: InventoryStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.extend(resource::run_resource_tests(&factory).await);
    results.extend(query::run_query_tests(&factory).await);
    results.extend(mutation::run_mutation_tests(&factory).await);
    results.extend(conversation::run_conversation_tests(&factory).await);

    let passed = results.iter().filter(|r| r.passed).count();
    let total = results.len();

    ConformanceReport {
        results,
        passed,
        failed: total - passed,
        total,
    }
}

// ── Helpers: record constructors with sensible defaults ──────────────────────

fn make_resource(description: &str, location: &str, department: &str, cost: f64) -> NewResource {
    NewResource {
        sl_no: format!("SL-{}", description.len()),
        description: description.to_string(),
        service_tag: format!("ST-{}", description.to_lowercase().replace(' ', "-")),
        identification_number: "ID-0001".to_string(),
        procurement_date: "2024-03-15".to_string(),
        cost,
        location: location.to_string(),
        department: department.to_string(),
        created_by: "conformance@example.com".to_string(),
        created_at: "2025-01-01T00:00:00Z".to_string(),
        updated_at: "2025-01-01T00:00:00Z".to_string(),
    }
}

fn make_conversation(user_id: &str, question: &str, timestamp: &str) -> ConversationRecord {
    ConversationRecord {
        user_id: user_id.to_string(),
        question: question.to_string(),
        answer: format!("answer to {}", question),
        timestamp: timestamp.to_string(),
    }
}

/// Insert the standard three-department fixture and return the store.
async fn seeded<S, F, Fut>(factory: &F) -> Result<S, String>
where
    S: InventoryStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let fixtures = [
        make_resource("Dell Monitor", "Lab 1", "CSE", 12000.0),
        make_resource("HP Printer", "Office", "CSE", 8000.0),
        make_resource("Oscilloscope", "Lab 2", "ECE", 45000.0),
        make_resource("Lenovo Laptop", "Lab 1", "cse", 60000.0),
        make_resource("Multimeter", "Lab 3", "EEE", 1500.0),
    ];
    for r in fixtures {
        s.insert_resource(r)
            .await
            .map_err(|e| format!("insert failed: {}", e))?;
    }
    Ok(s)
}
