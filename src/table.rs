//! Validated, immutable event table
//!
//! Every metric component reads from an `EventTable`. Events are held in
//! ascending timestamp order (ties broken by user id) so that every derived
//! table is deterministic regardless of input order.

use crate::error::ComputeError;
use crate::types::Event;
use crate::week::{WeekIndex, WeekIndexer};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Per-user lifetime aggregates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserSpan {
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub total_events: u64,
}

/// Distinct users and event volume within one week
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WeekActivity<'a> {
    pub users: HashSet<&'a str>,
    pub events: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventTable {
    events: Vec<Event>,
}

impl EventTable {
    /// Build a table from typed events. Blank user ids are rejected.
    pub fn from_events(mut events: Vec<Event>) -> Result<Self, ComputeError> {
        if let Some(index) = events.iter().position(|e| e.user_id.trim().is_empty()) {
            return Err(ComputeError::InvalidInput(format!(
                "event {index} has an empty user_id"
            )));
        }
        events.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.user_id.cmp(&b.user_id))
        });
        Ok(Self { events })
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn first_timestamp(&self) -> Option<DateTime<Utc>> {
        self.events.first().map(|e| e.created_at)
    }

    /// Latest observed activity, the reference "now" for recency
    pub fn last_timestamp(&self) -> Option<DateTime<Utc>> {
        self.events.last().map(|e| e.created_at)
    }

    pub fn user_count(&self) -> usize {
        self.events
            .iter()
            .map(|e| e.user_id.as_str())
            .collect::<HashSet<_>>()
            .len()
    }

    /// First/last event and event count for every user, over the full table
    pub fn user_spans(&self) -> HashMap<&str, UserSpan> {
        let mut spans: HashMap<&str, UserSpan> = HashMap::new();
        for event in &self.events {
            spans
                .entry(event.user_id.as_str())
                .and_modify(|span| {
                    span.first_seen = span.first_seen.min(event.created_at);
                    span.last_seen = span.last_seen.max(event.created_at);
                    span.total_events += 1;
                })
                .or_insert(UserSpan {
                    first_seen: event.created_at,
                    last_seen: event.created_at,
                    total_events: 1,
                });
        }
        spans
    }

    /// Activity grouped by week, ascending. Only weeks with events appear.
    pub fn weekly_activity(&self, indexer: &WeekIndexer) -> BTreeMap<WeekIndex, WeekActivity<'_>> {
        let mut weeks: BTreeMap<WeekIndex, WeekActivity<'_>> = BTreeMap::new();
        for event in &self.events {
            let week = weeks.entry(indexer.week_of(event.created_at)).or_default();
            week.users.insert(event.user_id.as_str());
            week.events += 1;
        }
        weeks
    }
}
