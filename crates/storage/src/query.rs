//! Predicates and patches over resource records.
//!
//! A [`ResourceQuery`] is a conjunction of [`Filter`]s. Text needles are
//! matched literally; nothing in a filter is ever interpreted as a pattern.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::StorageError;
use crate::record::{ResourceId, ResourceRecord};

/// The eight writable resource fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceField {
    SlNo,
    Description,
    ServiceTag,
    IdentificationNumber,
    ProcurementDate,
    Cost,
    Location,
    Department,
}

impl ResourceField {
    /// All writable fields in canonical order.
    pub const ALL: [ResourceField; 8] = [
        ResourceField::SlNo,
        ResourceField::Description,
        ResourceField::ServiceTag,
        ResourceField::IdentificationNumber,
        ResourceField::ProcurementDate,
        ResourceField::Cost,
        ResourceField::Location,
        ResourceField::Department,
    ];

    /// Canonical (storage) name of the field.
    pub fn name(self) -> &'static str {
        match self {
            ResourceField::SlNo => "sl_no",
            ResourceField::Description => "description",
            ResourceField::ServiceTag => "service_tag",
            ResourceField::IdentificationNumber => "identification_number",
            ResourceField::ProcurementDate => "procurement_date",
            ResourceField::Cost => "cost",
            ResourceField::Location => "location",
            ResourceField::Department => "department",
        }
    }

    /// Free-text fields, filtered by case-insensitive substring.
    pub fn is_free_text(self) -> bool {
        matches!(
            self,
            ResourceField::Location | ResourceField::Department | ResourceField::Description
        )
    }
}

impl fmt::Display for ResourceField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A scalar value stored in, or compared against, a resource field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Text(String),
}

impl FieldValue {
    /// Render as text. Integral numbers print without a fractional part.
    pub fn render(&self) -> String {
        match self {
            FieldValue::Text(s) => s.clone(),
            FieldValue::Number(n) => render_number(*n),
        }
    }
}

pub(crate) fn render_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// The field a filter applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FilterField {
    Id,
    CreatedBy,
    Resource(ResourceField),
}

impl FilterField {
    pub fn name(self) -> &'static str {
        match self {
            FilterField::Id => "_id",
            FilterField::CreatedBy => "created_by",
            FilterField::Resource(field) => field.name(),
        }
    }
}

/// How a filter compares against the stored value.
#[derive(Debug, Clone, PartialEq)]
pub enum Matcher {
    /// Case-insensitive substring.
    Contains(String),
    /// Exact match; numeric for `cost`.
    Equals(FieldValue),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: FilterField,
    pub matcher: Matcher,
}

impl Filter {
    pub fn contains(field: ResourceField, needle: impl Into<String>) -> Self {
        Filter {
            field: FilterField::Resource(field),
            matcher: Matcher::Contains(needle.into()),
        }
    }

    pub fn equals(field: FilterField, value: FieldValue) -> Self {
        Filter {
            field,
            matcher: Matcher::Equals(value),
        }
    }

    pub fn id(id: &ResourceId) -> Self {
        Filter::equals(FilterField::Id, FieldValue::Text(id.to_string()))
    }

    pub fn matches(&self, record: &ResourceRecord) -> bool {
        match (&self.matcher, self.field) {
            (Matcher::Contains(needle), field) => {
                let haystack = field_text(record, field).to_lowercase();
                haystack.contains(&needle.to_lowercase())
            }
            (Matcher::Equals(value), FilterField::Resource(ResourceField::Cost)) => match value {
                FieldValue::Number(n) => record.cost == *n,
                FieldValue::Text(s) => s.trim().parse::<f64>().is_ok_and(|n| record.cost == n),
            },
            (Matcher::Equals(value), FilterField::Id) => {
                record.id.as_str() == value.render().trim().to_ascii_lowercase()
            }
            (Matcher::Equals(value), field) => field_text(record, field) == value.render(),
        }
    }
}

fn field_text(record: &ResourceRecord, field: FilterField) -> String {
    match field {
        FilterField::Id => record.id.to_string(),
        FilterField::CreatedBy => record.created_by.clone(),
        FilterField::Resource(f) => record_value(record, f).render(),
    }
}

/// Read a writable field off a record.
pub fn record_value(record: &ResourceRecord, field: ResourceField) -> FieldValue {
    match field {
        ResourceField::SlNo => FieldValue::Text(record.sl_no.clone()),
        ResourceField::Description => FieldValue::Text(record.description.clone()),
        ResourceField::ServiceTag => FieldValue::Text(record.service_tag.clone()),
        ResourceField::IdentificationNumber => {
            FieldValue::Text(record.identification_number.clone())
        }
        ResourceField::ProcurementDate => FieldValue::Text(record.procurement_date.clone()),
        ResourceField::Cost => FieldValue::Number(record.cost),
        ResourceField::Location => FieldValue::Text(record.location.clone()),
        ResourceField::Department => FieldValue::Text(record.department.clone()),
    }
}

/// A conjunction of filters. An empty query matches every record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceQuery {
    pub filters: Vec<Filter>,
}

impl ResourceQuery {
    pub fn new(filters: Vec<Filter>) -> Self {
        ResourceQuery { filters }
    }

    pub fn all() -> Self {
        ResourceQuery::default()
    }

    pub fn and(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn matches(&self, record: &ResourceRecord) -> bool {
        self.filters.iter().all(|f| f.matches(record))
    }
}

/// A `$set`-style mutation applied to every record a query matches.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourcePatch {
    pub values: BTreeMap<ResourceField, FieldValue>,
    pub updated_by: String,
    /// ISO 8601 / RFC 3339 timestamp string.
    pub updated_at: String,
}

impl ResourcePatch {
    /// Apply the patch to a record. Returns whether any stored value changed.
    ///
    /// `cost` only accepts numbers; text fields accept either variant.
    pub fn apply(&self, record: &mut ResourceRecord) -> Result<bool, StorageError> {
        let mut changed = false;
        for (field, value) in &self.values {
            changed |= set_field(record, *field, value)?;
        }
        if record.updated_by.as_deref() != Some(self.updated_by.as_str()) {
            record.updated_by = Some(self.updated_by.clone());
            changed = true;
        }
        if record.updated_at != self.updated_at {
            record.updated_at = self.updated_at.clone();
            changed = true;
        }
        Ok(changed)
    }
}

fn set_field(
    record: &mut ResourceRecord,
    field: ResourceField,
    value: &FieldValue,
) -> Result<bool, StorageError> {
    let slot = match field {
        ResourceField::Cost => return set_cost(record, value),
        ResourceField::SlNo => &mut record.sl_no,
        ResourceField::Description => &mut record.description,
        ResourceField::ServiceTag => &mut record.service_tag,
        ResourceField::IdentificationNumber => &mut record.identification_number,
        ResourceField::ProcurementDate => &mut record.procurement_date,
        ResourceField::Location => &mut record.location,
        ResourceField::Department => &mut record.department,
    };
    let rendered = value.render();
    let changed = *slot != rendered;
    *slot = rendered;
    Ok(changed)
}

fn set_cost(record: &mut ResourceRecord, value: &FieldValue) -> Result<bool, StorageError> {
    let FieldValue::Number(n) = value else {
        return Err(StorageError::Backend(format!(
            "cost must be numeric, got '{}'",
            value.render()
        )));
    };
    let changed = record.cost != *n;
    record.cost = *n;
    Ok(changed)
}

/// Result of a bulk update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UpdateCounts {
    pub matched: u64,
    pub modified: u64,
}
