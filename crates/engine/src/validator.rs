//! Intent validation: decides whether a parsed intent may reach the store.

use std::collections::BTreeMap;

use assetdesk_storage::{FilterField, ResourceField, ResourceId};
use serde_json::Value;
use thiserror::Error;

use crate::fields::{is_canonical, resolve_field, resolve_filter_field, REQUIRED_FIELDS};
use crate::intent::{Operation, OperationIntent};

/// Why a well-formed intent was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("no target selection criteria")]
    NoTargetSelection,
    #[error("nothing to write")]
    NothingToWrite,
    #[error("unknown field '{0}'")]
    UnknownField(String),
    #[error("invalid identifier '{0}'")]
    InvalidIdentifier(String),
}

/// Which records an operation applies to.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Selection {
    /// Resolved filter keys and their raw values, nulls removed.
    pub filters: BTreeMap<FilterField, Value>,
    /// Set when the instruction names one specific record.
    pub resource_id: Option<ResourceId>,
}

impl Selection {
    /// Whether the operation targets exactly one named record.
    pub fn is_single(&self) -> bool {
        self.resource_id.is_some()
    }

    /// Filters keyed by canonical name, for reporting back to the caller.
    pub fn filters_used(&self) -> serde_json::Map<String, Value> {
        let mut used: serde_json::Map<String, Value> = self
            .filters
            .iter()
            .map(|(field, value)| (field.name().to_string(), value.clone()))
            .collect();
        if let Some(id) = &self.resource_id {
            used.insert("resource_id".to_string(), Value::String(id.to_string()));
        }
        used
    }
}

/// An intent that passed validation. No other shape reaches the executor.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidatedIntent {
    Create {
        fields: BTreeMap<ResourceField, Value>,
    },
    Read {
        selection: Selection,
    },
    Update {
        selection: Selection,
        fields: BTreeMap<ResourceField, Value>,
    },
    Delete {
        selection: Selection,
    },
}

impl ValidatedIntent {
    pub fn operation(&self) -> Operation {
        match self {
            ValidatedIntent::Create { .. } => Operation::Create,
            ValidatedIntent::Read { .. } => Operation::Read,
            ValidatedIntent::Update { .. } => Operation::Update,
            ValidatedIntent::Delete { .. } => Operation::Delete,
        }
    }
}

/// Outcome of [`validate`].
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Valid(ValidatedIntent),
    /// The caller must supply these fields before anything runs.
    ClarificationNeeded(Vec<String>),
    Rejected(Rejection),
}

fn drop_nulls(map: BTreeMap<String, Value>) -> BTreeMap<String, Value> {
    map.into_iter().filter(|(_, v)| !v.is_null()).collect()
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Check an intent for completeness and consistency.
///
/// Checks run in a fixed order: missing fields, target selection, empty
/// writes, unknown field names, then the record identifier.
pub fn validate(intent: OperationIntent) -> Verdict {
    let operation = intent.operation;
    let fields = drop_nulls(intent.fields);
    let filters = drop_nulls(intent.filters);

    let mut missing = intent.missing_fields;
    if operation == Operation::Create {
        for required in REQUIRED_FIELDS {
            let supplied = fields
                .iter()
                .any(|(name, value)| resolve_field(name) == Some(required) && !is_blank(value));
            let name = required.name().to_string();
            if !supplied && !missing.contains(&name) {
                missing.push(name);
            }
        }
    }
    if !missing.is_empty() {
        return Verdict::ClarificationNeeded(missing);
    }

    if operation.is_mutation() && filters.is_empty() {
        return Verdict::Rejected(Rejection::NoTargetSelection);
    }
    let writes = matches!(operation, Operation::Create | Operation::Update);
    if writes && fields.is_empty() {
        return Verdict::Rejected(Rejection::NothingToWrite);
    }

    let resolved_fields = if writes {
        match resolve_fields(fields) {
            Ok(resolved) => resolved,
            Err(rejection) => return Verdict::Rejected(rejection),
        }
    } else {
        BTreeMap::new()
    };

    // CREATE has no target, but a malformed identifier is still rejected.
    let selection = if operation == Operation::Create {
        match parse_resource_id(intent.resource_id) {
            Ok(_) => Selection::default(),
            Err(rejection) => return Verdict::Rejected(rejection),
        }
    } else {
        match resolve_selection(filters, intent.resource_id) {
            Ok(selection) => selection,
            Err(rejection) => return Verdict::Rejected(rejection),
        }
    };

    let validated = match operation {
        Operation::Create => ValidatedIntent::Create {
            fields: resolved_fields,
        },
        Operation::Read => ValidatedIntent::Read { selection },
        Operation::Update => ValidatedIntent::Update {
            selection,
            fields: resolved_fields,
        },
        Operation::Delete => ValidatedIntent::Delete { selection },
    };
    Verdict::Valid(validated)
}

fn resolve_fields(
    fields: BTreeMap<String, Value>,
) -> Result<BTreeMap<ResourceField, Value>, Rejection> {
    let mut resolved = BTreeMap::new();
    for (name, value) in fields {
        let field = resolve_field(&name).ok_or_else(|| Rejection::UnknownField(name.clone()))?;
        insert_preferring_canonical(&mut resolved, field, &name, FilterField::Resource(field), value);
    }
    Ok(resolved)
}

fn resolve_selection(
    filters: BTreeMap<String, Value>,
    resource_id: Option<String>,
) -> Result<Selection, Rejection> {
    let mut resolved = BTreeMap::new();
    for (name, value) in filters {
        let field =
            resolve_filter_field(&name).ok_or_else(|| Rejection::UnknownField(name.clone()))?;
        insert_preferring_canonical(&mut resolved, field, &name, field, value);
    }

    for (field, value) in resolved.iter_mut() {
        if *field == FilterField::Id {
            let raw = match &*value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            let id = ResourceId::parse(&raw).map_err(|_| Rejection::InvalidIdentifier(raw))?;
            *value = Value::String(id.to_string());
        }
    }

    Ok(Selection {
        filters: resolved,
        resource_id: parse_resource_id(resource_id)?,
    })
}

/// Blank means absent; anything else must be a well-formed identifier.
fn parse_resource_id(resource_id: Option<String>) -> Result<Option<ResourceId>, Rejection> {
    match resource_id {
        Some(raw) if !raw.trim().is_empty() => ResourceId::parse(&raw)
            .map(Some)
            .map_err(|_| Rejection::InvalidIdentifier(raw)),
        _ => Ok(None),
    }
}

/// Alias and canonical spellings may both appear; the canonical one wins.
fn insert_preferring_canonical<K: Ord>(
    map: &mut BTreeMap<K, Value>,
    key: K,
    name: &str,
    field: FilterField,
    value: Value,
) {
    if is_canonical(name, field) {
        map.insert(key, value);
    } else {
        map.entry(key).or_insert(value);
    }
}
