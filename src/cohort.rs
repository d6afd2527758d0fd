//! Cohort assignment
//!
//! Places every event in its user's activation cohort. Activation is the
//! user's first event over the whole table, computed before any per-event
//! work so that no filtered view can shift it.

use crate::table::EventTable;
use crate::types::CohortAssignment;
use crate::week::WeekIndexer;

/// Assigns activation week, current week and cohort age to each event
pub struct CohortAssigner;

impl CohortAssigner {
    /// One assignment per event, in table order
    pub fn assign(table: &EventTable, indexer: &WeekIndexer) -> Vec<CohortAssignment> {
        let spans = table.user_spans();

        table
            .events()
            .iter()
            .filter_map(|event| {
                let span = spans.get(event.user_id.as_str())?;
                let activated_week = indexer.week_of(span.first_seen);
                let current_week = indexer.week_of(event.created_at);
                Some(CohortAssignment {
                    user_id: event.user_id.clone(),
                    created_at: event.created_at,
                    activated_week,
                    current_week,
                    cohort_age: current_week - activated_week,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Event;
    use chrono::{Duration, TimeZone, Utc};

    fn indexer() -> WeekIndexer {
        WeekIndexer::new(Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap())
    }

    fn event(user: &str, week: i64, offset_hours: i64) -> Event {
        let base = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        Event::new(user, base + Duration::weeks(week) + Duration::hours(offset_hours))
    }

    #[test]
    fn test_activation_is_first_ever_event() {
        let table = EventTable::from_events(vec![
            event("a", 3, 1),
            event("a", 1, 5),
            event("a", 2, 0),
        ])
        .unwrap();
        let assignments = CohortAssigner::assign(&table, &indexer());

        assert_eq!(assignments.len(), 3);
        assert!(assignments.iter().all(|a| a.activated_week == 1));
        let ages: Vec<i64> = assignments.iter().map(|a| a.cohort_age).collect();
        assert_eq!(ages, vec![0, 1, 2]);
    }

    #[test]
    fn test_cohort_age_never_negative() {
        let table = EventTable::from_events(vec![
            event("a", -2, 0),
            event("a", 4, 0),
            event("b", 0, 0),
            event("b", 0, 3),
            event("c", 7, 0),
            event("c", 9, 0),
        ])
        .unwrap();
        let assignments = CohortAssigner::assign(&table, &indexer());
        assert!(assignments.iter().all(|a| a.cohort_age >= 0));
        assert!(assignments
            .iter()
            .all(|a| a.current_week >= a.activated_week));

        let a_ages: Vec<i64> = assignments
            .iter()
            .filter(|a| a.user_id == "a")
            .map(|a| a.cohort_age)
            .collect();
        assert_eq!(a_ages, vec![0, 6]);
    }

    #[test]
    fn test_empty_table() {
        let table = EventTable::default();
        assert!(CohortAssigner::assign(&table, &indexer()).is_empty());
    }
}
