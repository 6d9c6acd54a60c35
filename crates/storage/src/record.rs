use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};

use rand::Rng;
use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// Length in bytes of a resource identifier.
const ID_BYTES: usize = 12;

/// Per-process counter mixed into generated identifiers.
static ID_COUNTER: AtomicU32 = AtomicU32::new(0);

/// Identifier of a stored resource: 24 lowercase hexadecimal characters.
///
/// Layout: 4-byte big-endian UNIX seconds, 5 random bytes, 3-byte counter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourceId(String);

/// Returned when a string is not a well-formed resource identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed resource identifier: '{0}'")]
pub struct MalformedId(pub String);

impl ResourceId {
    /// Generate a fresh identifier.
    pub fn generate() -> Self {
        let mut bytes = [0u8; ID_BYTES];
        let secs = OffsetDateTime::now_utc().unix_timestamp() as u32;
        bytes[..4].copy_from_slice(&secs.to_be_bytes());
        rand::thread_rng().fill(&mut bytes[4..9]);
        let count = ID_COUNTER.fetch_add(1, Ordering::Relaxed);
        bytes[9..].copy_from_slice(&count.to_be_bytes()[1..]);

        let hex = bytes.iter().map(|b| format!("{:02x}", b)).collect();
        ResourceId(hex)
    }

    /// Parse and normalize an identifier. Accepts either hex case.
    pub fn parse(raw: &str) -> Result<Self, MalformedId> {
        let trimmed = raw.trim();
        if trimmed.len() == ID_BYTES * 2 && trimmed.chars().all(|c| c.is_ascii_hexdigit()) {
            Ok(ResourceId(trimmed.to_ascii_lowercase()))
        } else {
            Err(MalformedId(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ResourceId {
    type Err = MalformedId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResourceId::parse(s)
    }
}

impl TryFrom<String> for ResourceId {
    type Error = MalformedId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        ResourceId::parse(&value)
    }
}

impl From<ResourceId> for String {
    fn from(id: ResourceId) -> Self {
        id.0
    }
}

/// Current UTC time as an RFC 3339 string.
pub fn now_rfc3339() -> String {
    let now = OffsetDateTime::now_utc();
    now.format(&Rfc3339)
        .unwrap_or_else(|_| now.unix_timestamp().to_string())
}

/// A resource as handed to the store for insertion. The store assigns the identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewResource {
    pub sl_no: String,
    pub description: String,
    pub service_tag: String,
    pub identification_number: String,
    pub procurement_date: String,
    pub cost: f64,
    pub location: String,
    pub department: String,
    #[serde(default)]
    pub created_by: String,
    /// ISO 8601 / RFC 3339 timestamp string.
    #[serde(default = "now_rfc3339")]
    pub created_at: String,
    /// ISO 8601 / RFC 3339 timestamp string.
    #[serde(default = "now_rfc3339")]
    pub updated_at: String,
}

/// A stored inventory record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceRecord {
    #[serde(rename = "_id")]
    pub id: ResourceId,
    pub sl_no: String,
    pub description: String,
    pub service_tag: String,
    pub identification_number: String,
    pub procurement_date: String,
    pub cost: f64,
    pub location: String,
    pub department: String,
    pub created_by: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
    /// ISO 8601 / RFC 3339 timestamp string.
    pub created_at: String,
    /// ISO 8601 / RFC 3339 timestamp string.
    pub updated_at: String,
}

impl ResourceRecord {
    pub fn from_new(id: ResourceId, new: NewResource) -> Self {
        ResourceRecord {
            id,
            sl_no: new.sl_no,
            description: new.description,
            service_tag: new.service_tag,
            identification_number: new.identification_number,
            procurement_date: new.procurement_date,
            cost: new.cost,
            location: new.location,
            department: new.department,
            created_by: new.created_by,
            updated_by: None,
            created_at: new.created_at,
            updated_at: new.updated_at,
        }
    }
}

/// One question/answer exchange with the chat assistant. Append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationRecord {
    pub user_id: String,
    pub question: String,
    pub answer: String,
    /// ISO 8601 / RFC 3339 timestamp string.
    pub timestamp: String,
}
