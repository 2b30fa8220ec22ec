use crate::owner::OwnerId;
use crate::shortcode::ShortCode;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// A stored URL record, keyed by its short code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UrlRecord {
    /// The original URL that was shortened.
    pub original_url: String,
    /// The user that created the mapping.
    pub owner_id: OwnerId,
    /// Soft-delete marker. Once set it is never cleared.
    #[serde(default)]
    pub deleted: bool,
    /// When the mapping was created.
    pub created_at: Timestamp,
}

impl UrlRecord {
    pub fn new(original_url: impl Into<String>, owner_id: OwnerId) -> Self {
        Self {
            original_url: original_url.into(),
            owner_id,
            deleted: false,
            created_at: Timestamp::now(),
        }
    }
}

/// One element of a bulk insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUrl {
    pub short_code: ShortCode,
    pub original_url: String,
}

/// A (short code, original URL) pair as listed for an owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OwnedUrl {
    pub short_code: ShortCode,
    pub original_url: String,
}

/// A user's request to soft-delete some of their short codes.
///
/// Deletion requests only live in transit between the request handlers and
/// the deletion worker; they are never persisted on their own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletionRequest {
    pub owner_id: OwnerId,
    pub short_codes: Vec<ShortCode>,
}

impl DeletionRequest {
    pub fn new(owner_id: OwnerId, short_codes: Vec<ShortCode>) -> Self {
        Self {
            owner_id,
            short_codes,
        }
    }
}

/// Aggregate counters exposed to the internal statistics endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ServiceStats {
    /// Number of records that are not soft-deleted.
    pub urls: u64,
    /// Number of distinct owners across all records.
    pub users: u64,
}
