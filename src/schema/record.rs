//! Boundary event record
//!
//! Fields are optional at the serde level so that a missing column surfaces
//! as a descriptive validation error instead of an opaque parse failure.

use crate::types::Event;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Naive timestamp layouts accepted as UTC when no offset is present
const NAIVE_FORMATS: [&str; 3] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
];

/// One event as supplied by the ingestion layer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Stable per-user identifier
    #[serde(default, alias = "UserID")]
    pub user_id: Option<String>,
    /// RFC 3339 timestamp, or a naive `YYYY-MM-DD HH:MM:SS` taken as UTC
    #[serde(default, alias = "CreatedAt")]
    pub created_at: Option<String>,
}

impl EventRecord {
    pub fn new(user_id: impl Into<String>, created_at: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            created_at: Some(created_at.into()),
        }
    }

    /// Check the record and convert it to a typed event
    pub fn validate(&self) -> Result<Event, ValidationError> {
        let user_id = match self.user_id.as_deref().map(str::trim) {
            None => return Err(ValidationError::MissingUserId),
            Some("") => return Err(ValidationError::EmptyUserId),
            Some(id) => id.to_string(),
        };

        let raw = self
            .created_at
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(ValidationError::MissingTimestamp)?;

        Ok(Event {
            user_id,
            created_at: parse_timestamp(raw)?,
        })
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, ValidationError> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| ValidationError::InvalidTimestamp(raw.to_string()))
}

/// Validation errors for boundary event records
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("missing user_id")]
    MissingUserId,

    #[error("user_id is empty")]
    EmptyUserId,

    #[error("missing created_at")]
    MissingTimestamp,

    #[error("created_at is not a valid timestamp: {0}")]
    InvalidTimestamp(String),
}
