//! Field vocabulary: canonical names, aliases, and the CREATE required set.

use assetdesk_storage::{FilterField, ResourceField};

/// Fields a CREATE must supply, in the order they are reported back.
pub const REQUIRED_FIELDS: [ResourceField; 8] = ResourceField::ALL;

/// Canonical names of [`REQUIRED_FIELDS`].
pub fn required_field_names() -> Vec<String> {
    REQUIRED_FIELDS.iter().map(|f| f.name().to_string()).collect()
}

/// Lower-case a field name and fold spaces and hyphens into underscores.
pub fn normalize_name(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| match c {
            ' ' | '-' => '_',
            c => c.to_ascii_lowercase(),
        })
        .collect()
}

/// Resolve a writable field name or alias.
pub fn resolve_field(name: &str) -> Option<ResourceField> {
    let field = match normalize_name(name).as_str() {
        "sl_no" | "serial_no" | "serial_number" | "serial" => ResourceField::SlNo,
        "description" => ResourceField::Description,
        "service_tag" | "tag" => ResourceField::ServiceTag,
        "identification_number" | "id_number" => ResourceField::IdentificationNumber,
        "procurement_date" | "purchase_date" => ResourceField::ProcurementDate,
        "cost" | "price" => ResourceField::Cost,
        "location" => ResourceField::Location,
        "department" | "dept" => ResourceField::Department,
        _ => return None,
    };
    Some(field)
}

/// Resolve a filter key: any writable field, the record identifier, or its creator.
pub fn resolve_filter_field(name: &str) -> Option<FilterField> {
    match normalize_name(name).as_str() {
        "id" | "_id" | "resource_id" => Some(FilterField::Id),
        "created_by" => Some(FilterField::CreatedBy),
        _ => resolve_field(name).map(FilterField::Resource),
    }
}

/// Whether `name` is already the canonical spelling of `field`.
pub(crate) fn is_canonical(name: &str, field: FilterField) -> bool {
    name == field.name() || (field == FilterField::Id && name == "id")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_resolve_to_canonical_fields() {
        assert_eq!(resolve_field("serial_number"), Some(ResourceField::SlNo));
        assert_eq!(resolve_field("Serial No"), Some(ResourceField::SlNo));
        assert_eq!(resolve_field("price"), Some(ResourceField::Cost));
        assert_eq!(resolve_field("dept"), Some(ResourceField::Department));
        assert_eq!(resolve_field("purchase-date"), Some(ResourceField::ProcurementDate));
        assert_eq!(resolve_field("TAG"), Some(ResourceField::ServiceTag));
    }

    #[test]
    fn unknown_names_do_not_resolve() {
        assert_eq!(resolve_field("colour"), None);
        assert_eq!(resolve_field(""), None);
        assert_eq!(resolve_field("id"), None);
    }

    #[test]
    fn filter_keys_accept_identifier_and_creator() {
        assert_eq!(resolve_filter_field("_id"), Some(FilterField::Id));
        assert_eq!(resolve_filter_field("resource_id"), Some(FilterField::Id));
        assert_eq!(resolve_filter_field("created_by"), Some(FilterField::CreatedBy));
        assert_eq!(
            resolve_filter_field("location"),
            Some(FilterField::Resource(ResourceField::Location))
        );
    }

    #[test]
    fn required_names_are_the_eight_fields() {
        assert_eq!(
            required_field_names(),
            [
                "sl_no",
                "description",
                "service_tag",
                "identification_number",
                "procurement_date",
                "cost",
                "location",
                "department"
            ]
        );
    }
}
