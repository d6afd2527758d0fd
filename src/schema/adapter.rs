//! Adapter for converting boundary records into a validated `EventTable`

use crate::error::ComputeError;
use crate::schema::record::{EventRecord, ValidationError};
use crate::table::EventTable;

/// Adapter for parsing and validating event records
pub struct EventAdapter;

impl EventAdapter {
    /// Parse a JSON string containing an array of records
    pub fn parse_array(json: &str) -> Result<Vec<EventRecord>, ComputeError> {
        let records: Vec<EventRecord> = serde_json::from_str(json)?;
        Ok(records)
    }

    /// Parse NDJSON (newline-delimited JSON), one record per line
    pub fn parse_ndjson(ndjson: &str) -> Result<Vec<EventRecord>, ComputeError> {
        let mut records = Vec::new();
        for (line_num, line) in ndjson.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<EventRecord>(trimmed) {
                Ok(record) => records.push(record),
                Err(e) => {
                    return Err(ComputeError::ParseError(format!(
                        "Failed to parse line {}: {}",
                        line_num + 1,
                        e
                    )));
                }
            }
        }
        Ok(records)
    }

    /// Parse either a JSON array or NDJSON, chosen by the first non-blank character
    pub fn parse_auto(input: &str) -> Result<Vec<EventRecord>, ComputeError> {
        if input.trim_start().starts_with('[') {
            Self::parse_array(input)
        } else {
            Self::parse_ndjson(input)
        }
    }

    /// Validate every record and build the event table, stopping at the first bad record
    pub fn to_table(records: &[EventRecord]) -> Result<EventTable, ComputeError> {
        let mut events = Vec::with_capacity(records.len());
        for (index, record) in records.iter().enumerate() {
            let event = record.validate().map_err(|e| match e {
                ValidationError::MissingUserId => {
                    ComputeError::MissingField(format!("user_id (record {index})"))
                }
                ValidationError::MissingTimestamp => {
                    ComputeError::MissingField(format!("created_at (record {index})"))
                }
                ValidationError::InvalidTimestamp(raw) => {
                    ComputeError::InvalidTimestamp(format!("record {index}: {raw}"))
                }
                other => ComputeError::InvalidInput(format!("record {index}: {other}")),
            })?;
            events.push(event);
        }
        EventTable::from_events(events)
    }

    /// Validate a batch of records, reporting every failure
    pub fn validate_records(records: &[EventRecord]) -> Vec<ValidationResult> {
        records
            .iter()
            .enumerate()
            .filter_map(|(index, record)| {
                record.validate().err().map(|error| ValidationResult {
                    index,
                    user_id: record.user_id.clone(),
                    error,
                })
            })
            .collect()
    }
}

/// A record that failed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    pub index: usize,
    pub user_id: Option<String>,
    pub error: ValidationError,
}
