//! Cache entry definitions and the stored value codec.
//!
//! New values are written as a tagged, versioned JSON record:
//!
//! ```text
//! {"v":1,"sig":"<hex>","size":<bytes>,"saved_at":"<RFC 3339>"}
//! ```
//!
//! Values written by older releases use the `sig|size|timestamp` form and
//! are still accepted when they parse cleanly. Anything else is malformed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Current version tag of the stored record.
pub const RECORD_VERSION: u8 = 1;

/// Represents a single signature entry in the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// Hex content signature
    pub signature: String,
    /// File size at the time the signature was computed
    pub size: u64,
    /// When the entry was written
    pub saved_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Create an entry stamped with the current time.
    #[must_use]
    pub fn new(signature: impl Into<String>, size: u64) -> Self {
        Self {
            signature: signature.into(),
            size,
            saved_at: Utc::now(),
        }
    }

    /// Whether this entry still describes a file of `current_size` bytes.
    #[must_use]
    pub fn matches_size(&self, current_size: u64) -> bool {
        self.size == current_size
    }

    /// Age of the entry relative to `now`.
    #[must_use]
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now.signed_duration_since(self.saved_at)
    }

    /// Encode the entry into its stored form.
    ///
    /// # Errors
    ///
    /// Returns an error only if JSON serialization fails.
    pub fn encode(&self) -> serde_json::Result<String> {
        serde_json::to_string(&StoredRecord {
            v: RECORD_VERSION,
            sig: self.signature.clone(),
            size: self.size,
            saved_at: self.saved_at,
        })
    }

    /// Decode a stored value.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError`] describing why the value is malformed.
    pub fn decode(raw: &str) -> Result<Self, DecodeError> {
        if raw.trim_start().starts_with('{') {
            decode_record(raw)
        } else {
            decode_legacy(raw)
        }
    }
}

/// Why a stored value could not be decoded.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The record carries a version this build does not understand.
    #[error("unsupported record version {0}")]
    UnsupportedVersion(u8),
    /// The tagged record is not valid JSON for the expected shape.
    #[error("invalid record: {0}")]
    InvalidRecord(String),
    /// Legacy form with the wrong number of `|`-separated fields.
    #[error("expected 3 fields, found {0}")]
    FieldCount(usize),
    /// Signature is empty or not hex.
    #[error("invalid signature '{0}'")]
    Signature(String),
    /// Size is not a decimal integer.
    #[error("invalid size '{0}'")]
    Size(String),
    /// Timestamp is not RFC 3339.
    #[error("invalid timestamp '{0}'")]
    Timestamp(String),
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct StoredRecord {
    v: u8,
    sig: String,
    size: u64,
    saved_at: DateTime<Utc>,
}

fn decode_record(raw: &str) -> Result<CacheEntry, DecodeError> {
    let record: StoredRecord =
        serde_json::from_str(raw).map_err(|e| DecodeError::InvalidRecord(e.to_string()))?;

    if record.v != RECORD_VERSION {
        return Err(DecodeError::UnsupportedVersion(record.v));
    }
    validate_signature(&record.sig)?;

    Ok(CacheEntry {
        signature: record.sig,
        size: record.size,
        saved_at: record.saved_at,
    })
}

fn decode_legacy(raw: &str) -> Result<CacheEntry, DecodeError> {
    let fields: Vec<&str> = raw.split('|').collect();
    let [sig, size, saved_at] = fields.as_slice() else {
        return Err(DecodeError::FieldCount(fields.len()));
    };

    validate_signature(sig)?;
    let size = size
        .parse::<u64>()
        .map_err(|_| DecodeError::Size((*size).to_string()))?;
    let saved_at = DateTime::parse_from_rfc3339(saved_at)
        .map_err(|_| DecodeError::Timestamp((*saved_at).to_string()))?
        .with_timezone(&Utc);

    Ok(CacheEntry {
        signature: (*sig).to_string(),
        size,
        saved_at,
    })
}

fn validate_signature(sig: &str) -> Result<(), DecodeError> {
    if sig.is_empty() || !sig.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(DecodeError::Signature(sig.to_string()));
    }
    Ok(())
}
