//! Retention aggregation and matrix construction
//!
//! Cohort cells count distinct users per (activation week, cohort age).
//! Retention divides each cell by the largest cell of its cohort, which is
//! the age-0 cell because every user is active in their own activation week.

use crate::types::{CohortAssignment, CohortCell, RetentionCell, RetentionMatrix, RetentionRow};
use crate::week::{WeekIndex, WeekIndexer};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Groups cohort assignments into distinct-user cells
pub struct RetentionAggregator;

impl RetentionAggregator {
    /// Distinct users per (activation week, cohort age), sorted by both keys
    pub fn aggregate(assignments: &[CohortAssignment]) -> Vec<CohortCell> {
        let mut cells: BTreeMap<(WeekIndex, i64), HashSet<&str>> = BTreeMap::new();
        for assignment in assignments {
            cells
                .entry((assignment.activated_week, assignment.cohort_age))
                .or_default()
                .insert(assignment.user_id.as_str());
        }

        cells
            .into_iter()
            .map(|((activated_week, cohort_age), users)| CohortCell {
                activated_week,
                cohort_age,
                distinct_user_count: users.len() as u64,
            })
            .collect()
    }

    /// Attach retention rates and activation dates to cohort cells
    pub fn retention(cells: &[CohortCell], indexer: &WeekIndexer) -> Vec<RetentionCell> {
        let mut cohort_max: HashMap<WeekIndex, u64> = HashMap::new();
        for cell in cells {
            let max = cohort_max.entry(cell.activated_week).or_insert(0);
            *max = (*max).max(cell.distinct_user_count);
        }

        cells
            .iter()
            .map(|cell| {
                let max = cohort_max.get(&cell.activated_week).copied().unwrap_or(0);
                RetentionCell {
                    activated_week: cell.activated_week,
                    activated_date: indexer.week_start(cell.activated_week),
                    cohort_age: cell.cohort_age,
                    distinct_user_count: cell.distinct_user_count,
                    retention_rate: ratio(cell.distinct_user_count, max),
                }
            })
            .collect()
    }
}

fn ratio(count: u64, max: u64) -> Option<f64> {
    if max == 0 {
        None
    } else {
        Some(count as f64 / max as f64)
    }
}

/// Pivots retention cells into a dense, bounded grid
pub struct RetentionMatrixBuilder;

impl RetentionMatrixBuilder {
    /// Keep the `rows` most recent cohorts (ascending) and ages `0..columns`.
    /// Cells with no observation stay `None`.
    pub fn build(cells: &[RetentionCell], rows: usize, columns: usize) -> RetentionMatrix {
        let mut cohorts: BTreeMap<WeekIndex, RetentionRow> = BTreeMap::new();
        for cell in cells {
            let row = cohorts
                .entry(cell.activated_week)
                .or_insert_with(|| RetentionRow {
                    activated_week: cell.activated_week,
                    activated_date: cell.activated_date,
                    rates: vec![None; columns],
                });
            if let Some(slot) = usize::try_from(cell.cohort_age)
                .ok()
                .and_then(|age| row.rates.get_mut(age))
            {
                *slot = cell.retention_rate;
            }
        }

        let skip = cohorts.len().saturating_sub(rows);
        RetentionMatrix {
            cohort_ages: (0..columns as i64).collect(),
            rows: cohorts.into_values().skip(skip).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cohort::CohortAssigner;
    use crate::table::EventTable;
    use crate::types::Event;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn baseline() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap()
    }

    fn event(user: &str, week: i64, offset_hours: i64) -> Event {
        Event::new(
            user,
            baseline() + Duration::weeks(week) + Duration::hours(offset_hours),
        )
    }

    fn cells_for(events: Vec<Event>) -> Vec<CohortCell> {
        let indexer = WeekIndexer::new(baseline());
        let table = EventTable::from_events(events).unwrap();
        RetentionAggregator::aggregate(&CohortAssigner::assign(&table, &indexer))
    }

    fn three_user_scenario() -> Vec<Event> {
        vec![
            event("A", 0, 1),
            event("A", 0, 2),
            event("A", 1, 1),
            event("B", 0, 3),
            event("C", 1, 4),
        ]
    }

    #[test]
    fn test_three_user_cells() {
        let cells = cells_for(three_user_scenario());
        assert_eq!(
            cells,
            vec![
                CohortCell {
                    activated_week: 0,
                    cohort_age: 0,
                    distinct_user_count: 2
                },
                CohortCell {
                    activated_week: 0,
                    cohort_age: 1,
                    distinct_user_count: 1
                },
                CohortCell {
                    activated_week: 1,
                    cohort_age: 0,
                    distinct_user_count: 1
                },
            ]
        );
    }

    #[test]
    fn test_three_user_retention_rates() {
        let indexer = WeekIndexer::new(baseline());
        let retention =
            RetentionAggregator::retention(&cells_for(three_user_scenario()), &indexer);

        let rate = |week: i64, age: i64| {
            retention
                .iter()
                .find(|c| c.activated_week == week && c.cohort_age == age)
                .and_then(|c| c.retention_rate)
        };
        assert_eq!(rate(0, 0), Some(1.0));
        assert_eq!(rate(0, 1), Some(0.5));
        assert_eq!(rate(1, 0), Some(1.0));
        assert_eq!(retention[2].activated_date, baseline() + Duration::weeks(1));
    }

    #[test]
    fn test_counts_distinct_users_not_events() {
        let cells = cells_for(vec![
            event("A", 0, 1),
            event("A", 0, 2),
            event("A", 0, 3),
            event("B", 0, 1),
        ]);
        assert_eq!(cells.len(), 1);
        assert_eq!(cells[0].distinct_user_count, 2);
    }

    #[test]
    fn test_age_zero_always_one() {
        let mut events = Vec::new();
        for (i, user) in ["a", "b", "c", "d", "e", "f"].iter().enumerate() {
            let start = (i % 3) as i64;
            events.push(event(user, start, 0));
            for extra in 1..=(i as i64) {
                events.push(event(user, start + extra, 0));
            }
        }
        let indexer = WeekIndexer::new(baseline());
        let retention = RetentionAggregator::retention(&cells_for(events), &indexer);
        for cell in retention.iter().filter(|c| c.cohort_age == 0) {
            assert_eq!(cell.retention_rate, Some(1.0));
        }
    }

    #[test]
    fn test_zero_max_is_undefined() {
        let cells = vec![CohortCell {
            activated_week: 0,
            cohort_age: 0,
            distinct_user_count: 0,
        }];
        let retention = RetentionAggregator::retention(&cells, &WeekIndexer::new(baseline()));
        assert_eq!(retention[0].retention_rate, None);
    }

    #[test]
    fn test_matrix_keeps_recent_rows_and_nulls() {
        let indexer = WeekIndexer::new(baseline());
        let mut events = Vec::new();
        for week in 0..5 {
            events.push(event(&format!("u{week}"), week, 0));
            events.push(event(&format!("v{week}"), week, 0));
            events.push(event(&format!("u{week}"), week + 1, 0));
        }
        let retention = RetentionAggregator::retention(&cells_for(events), &indexer);
        let matrix = RetentionMatrixBuilder::build(&retention, 3, 4);

        assert_eq!(matrix.cohort_ages, vec![0, 1, 2, 3]);
        let weeks: Vec<i64> = matrix.rows.iter().map(|r| r.activated_week).collect();
        assert_eq!(weeks, vec![2, 3, 4]);

        let row = &matrix.rows[0];
        assert_eq!(row.rates, vec![Some(1.0), Some(0.5), None, None]);
        assert_eq!(row.activated_date, baseline() + Duration::weeks(2));
        assert_eq!(matrix.get(4, 1), Some(0.5));
        assert_eq!(matrix.get(4, 2), None);
        assert_eq!(matrix.get(0, 0), None);
    }

    #[test]
    fn test_matrix_drops_ages_beyond_columns() {
        let indexer = WeekIndexer::new(baseline());
        let events = vec![event("a", 0, 0), event("a", 5, 0)];
        let retention = RetentionAggregator::retention(&cells_for(events), &indexer);
        let matrix = RetentionMatrixBuilder::build(&retention, 10, 3);
        assert_eq!(matrix.rows.len(), 1);
        assert_eq!(matrix.rows[0].rates, vec![Some(1.0), None, None]);
    }

    #[test]
    fn test_empty_matrix() {
        let matrix = RetentionMatrixBuilder::build(&[], 15, 12);
        assert!(matrix.rows.is_empty());
        assert_eq!(matrix.cohort_ages.len(), 12);
    }
}
