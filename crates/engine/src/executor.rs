//! CRUD executor: runs validated intents against an [`InventoryStore`].

use std::collections::BTreeMap;
use std::sync::Arc;

use assetdesk_storage::{
    now_rfc3339, FieldValue, Filter, FilterField, InventoryStore, NewResource, ResourceField,
    ResourcePatch, ResourceQuery, ResourceRecord, StorageError,
};
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::caller::Caller;
use crate::validator::{Selection, ValidatedIntent};

/// Maximum number of records a READ returns.
pub const READ_LIMIT: usize = 10;

/// Failure while executing a validated intent.
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// A value could not be converted to the field's stored type.
    #[error("invalid value for '{field}': {reason}")]
    Coercion { field: String, reason: String },

    /// The instruction was well-formed but its target does not exist.
    #[error("{0}")]
    NotFound(String),

    /// The store could not carry out a valid operation.
    #[error(transparent)]
    Store(#[from] StorageError),
}

impl ExecutionError {
    /// HTTP-style status for this failure.
    pub fn status_code(&self) -> u16 {
        match self {
            ExecutionError::Coercion { .. } => 400,
            ExecutionError::NotFound(_) => 404,
            ExecutionError::Store(StorageError::ResourceNotFound { .. }) => 404,
            ExecutionError::Store(_) => 500,
        }
    }
}

/// Operation-specific result of a successful execution.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ExecutionPayload {
    Created {
        resource_id: String,
    },
    Read {
        resources: Vec<ResourceRecord>,
        count: usize,
    },
    Updated {
        matched_count: u64,
        modified_count: u64,
        filters_used: Map<String, Value>,
        fields_updated: Map<String, Value>,
    },
    Deleted {
        deleted_count: u64,
        filters_used: Map<String, Value>,
    },
}

/// A finished operation: user-facing message plus payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Execution {
    pub message: String,
    pub payload: ExecutionPayload,
}

/// Executes validated intents. Holds nothing but the store handle.
#[derive(Clone)]
pub struct CrudExecutor {
    store: Arc<dyn InventoryStore>,
}

impl CrudExecutor {
    pub fn new(store: Arc<dyn InventoryStore>) -> Self {
        Self { store }
    }

    /// Dispatch to the entry point for the intent's operation.
    pub async fn execute(
        &self,
        intent: ValidatedIntent,
        caller: &Caller,
    ) -> Result<Execution, ExecutionError> {
        let result = match intent {
            ValidatedIntent::Create { fields } => self.create(&fields, caller).await,
            ValidatedIntent::Read { selection } => self.read(&selection).await,
            ValidatedIntent::Update { selection, fields } => {
                self.update(&selection, &fields, caller).await
            }
            ValidatedIntent::Delete { selection } => self.delete(&selection).await,
        };
        if let Err(ExecutionError::Store(e)) = &result {
            tracing::error!(error = %e, "store failure during natural CRUD");
        }
        result
    }

    /// Insert one record built from `fields`, stamped with the caller.
    pub async fn create(
        &self,
        fields: &BTreeMap<ResourceField, Value>,
        caller: &Caller,
    ) -> Result<Execution, ExecutionError> {
        let text = |field: ResourceField| -> Result<String, ExecutionError> {
            let value = fields.get(&field).ok_or_else(|| ExecutionError::Coercion {
                field: field.name().to_string(),
                reason: "value is required".to_string(),
            })?;
            coerce_text(field.name(), value)
        };
        let cost = fields
            .get(&ResourceField::Cost)
            .map(coerce_cost)
            .transpose()?
            .ok_or_else(|| ExecutionError::Coercion {
                field: "cost".to_string(),
                reason: "value is required".to_string(),
            })?;

        let now = now_rfc3339();
        let resource = NewResource {
            sl_no: text(ResourceField::SlNo)?,
            description: text(ResourceField::Description)?,
            service_tag: text(ResourceField::ServiceTag)?,
            identification_number: text(ResourceField::IdentificationNumber)?,
            procurement_date: text(ResourceField::ProcurementDate)?,
            cost,
            location: text(ResourceField::Location)?,
            department: text(ResourceField::Department)?,
            created_by: caller.email.clone(),
            created_at: now.clone(),
            updated_at: now,
        };

        let id = self.store.insert_resource(resource).await?;
        tracing::info!(resource_id = %id, created_by = %caller.email, "resource created");
        Ok(Execution {
            message: "Resource created successfully".to_string(),
            payload: ExecutionPayload::Created {
                resource_id: id.to_string(),
            },
        })
    }

    /// Return up to [`READ_LIMIT`] matching records.
    pub async fn read(&self, selection: &Selection) -> Result<Execution, ExecutionError> {
        let query = build_query(selection)?;
        let resources = self.store.find_resources(&query, READ_LIMIT).await?;
        if selection.is_single() && resources.is_empty() {
            return Err(ExecutionError::NotFound("Resource not found".to_string()));
        }
        let count = resources.len();
        tracing::info!(count, "resources read");
        Ok(Execution {
            message: format!("Found {} resources", count),
            payload: ExecutionPayload::Read { resources, count },
        })
    }

    /// Apply `fields` to every matching record.
    pub async fn update(
        &self,
        selection: &Selection,
        fields: &BTreeMap<ResourceField, Value>,
        caller: &Caller,
    ) -> Result<Execution, ExecutionError> {
        let query = build_query(selection)?;
        let mut values = BTreeMap::new();
        for (field, value) in fields {
            let coerced = match field {
                ResourceField::Cost => FieldValue::Number(coerce_cost(value)?),
                other => FieldValue::Text(coerce_text(other.name(), value)?),
            };
            values.insert(*field, coerced);
        }
        let patch = ResourcePatch {
            values,
            updated_by: caller.email.clone(),
            updated_at: now_rfc3339(),
        };

        let counts = self.store.update_resources(&query, &patch).await?;
        if selection.is_single() && counts.matched == 0 {
            return Err(ExecutionError::NotFound("Resource not found".to_string()));
        }
        tracing::info!(
            matched = counts.matched,
            modified = counts.modified,
            updated_by = %caller.email,
            "resources updated"
        );

        let fields_updated = patch
            .values
            .iter()
            .map(|(field, value)| (field.name().to_string(), field_value_json(value)))
            .collect();
        Ok(Execution {
            message: format!("Updated {} resources", counts.modified),
            payload: ExecutionPayload::Updated {
                matched_count: counts.matched,
                modified_count: counts.modified,
                filters_used: selection.filters_used(),
                fields_updated,
            },
        })
    }

    /// Delete every matching record. Zero matches is reported as not found.
    pub async fn delete(&self, selection: &Selection) -> Result<Execution, ExecutionError> {
        let query = build_query(selection)?;
        let matching = self.store.count_resources(&query).await?;
        if matching == 0 {
            let message = if selection.is_single() {
                "Resource not found"
            } else {
                "No resources found matching the criteria"
            };
            return Err(ExecutionError::NotFound(message.to_string()));
        }

        let deleted = self.store.delete_resources(&query).await?;
        tracing::info!(deleted, "resources deleted");
        Ok(Execution {
            message: format!("Deleted {} resources", deleted),
            payload: ExecutionPayload::Deleted {
                deleted_count: deleted,
                filters_used: selection.filters_used(),
            },
        })
    }
}

// ── Coercion ─────────────────────────────────────────────────────────────────

/// Convert a raw `cost` value to a finite number.
pub fn coerce_cost(value: &Value) -> Result<f64, ExecutionError> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed
        .filter(|n| n.is_finite())
        .ok_or_else(|| ExecutionError::Coercion {
            field: "cost".to_string(),
            reason: format!("expected a number, got {}", value),
        })
}

/// Strings pass through; numbers are rendered in decimal.
fn coerce_text(field: &str, value: &Value) -> Result<String, ExecutionError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(ExecutionError::Coercion {
            field: field.to_string(),
            reason: format!("expected text, got {}", other),
        }),
    }
}

fn field_value_json(value: &FieldValue) -> Value {
    match value {
        FieldValue::Number(n) => serde_json::Number::from_f64(*n)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        FieldValue::Text(s) => Value::String(s.clone()),
    }
}

/// Build the store predicate for a selection.
///
/// Free-text fields match by case-insensitive substring, `cost` numerically,
/// everything else exactly.
pub fn build_query(selection: &Selection) -> Result<ResourceQuery, ExecutionError> {
    let mut query = ResourceQuery::all();
    for (field, value) in &selection.filters {
        let filter = match *field {
            FilterField::Resource(ResourceField::Cost) => Filter::equals(
                *field,
                FieldValue::Number(coerce_cost(value)?),
            ),
            FilterField::Resource(f) if f.is_free_text() => {
                Filter::contains(f, coerce_text(f.name(), value)?)
            }
            other => Filter::equals(other, FieldValue::Text(coerce_text(other.name(), value)?)),
        };
        query = query.and(filter);
    }
    if let Some(id) = &selection.resource_id {
        query = query.and(Filter::id(id));
    }
    Ok(query)
}
