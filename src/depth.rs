//! Engagement depth, cohort-age engagement and usage frequency
//!
//! All three start from how many events a user produced in a given week.

use crate::table::EventTable;
use crate::tier::{TierLadder, TierRange};
use crate::types::{
    CohortAgeEngagement, CohortAssignment, EngagementDepthCell, EngagementTier, UsageFrequency,
    UsageFrequencyWeek,
};
use crate::week::{WeekIndex, WeekIndexer};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Event counts keyed by (week, user)
fn user_week_counts<'a>(
    table: &'a EventTable,
    indexer: &WeekIndexer,
) -> BTreeMap<(WeekIndex, &'a str), u64> {
    let mut counts = BTreeMap::new();
    for event in table.events() {
        *counts
            .entry((indexer.week_of(event.created_at), event.user_id.as_str()))
            .or_insert(0) += 1;
    }
    counts
}

/// Human-readable event-count range, e.g. "1 event", "2-5 events", "51+ events"
pub fn range_label(range: TierRange) -> String {
    let min = range.min.unwrap_or(1).max(1);
    match range.max {
        Some(max) if max == min && min == 1 => "1 event".to_string(),
        Some(max) if max == min => format!("{min} events"),
        Some(max) => format!("{min}-{max} events"),
        None => format!("{min}+ events"),
    }
}

pub struct DepthClassifier<'a> {
    bands: &'a TierLadder<EngagementTier>,
}

impl<'a> DepthClassifier<'a> {
    pub fn new(bands: &'a TierLadder<EngagementTier>) -> Self {
        Self { bands }
    }

    /// Distinct users per (week, tier), by week then tier. Only occupied tiers appear.
    pub fn classify(&self, table: &EventTable, indexer: &WeekIndexer) -> Vec<EngagementDepthCell> {
        let mut cells: BTreeMap<(WeekIndex, EngagementTier), u64> = BTreeMap::new();
        for ((week, _user), events) in user_week_counts(table, indexer) {
            *cells.entry((week, self.bands.classify(events))).or_insert(0) += 1;
        }

        let labels: HashMap<EngagementTier, String> = self
            .bands
            .tiers()
            .into_iter()
            .filter_map(|tier| Some((tier, range_label(self.bands.range_of(tier)?))))
            .collect();

        cells
            .into_iter()
            .map(|((week, engagement_tier), distinct_user_count)| EngagementDepthCell {
                week,
                week_start: indexer.week_start(week),
                engagement_tier,
                range_label: labels.get(&engagement_tier).cloned().unwrap_or_default(),
                distinct_user_count,
            })
            .collect()
    }
}

/// Average events per active user at each cohort age, across all cohorts
pub fn cohort_age_engagement(assignments: &[CohortAssignment]) -> Vec<CohortAgeEngagement> {
    let mut ages: BTreeMap<i64, (u64, HashSet<&str>)> = BTreeMap::new();
    for assignment in assignments {
        let (events, users) = ages.entry(assignment.cohort_age).or_default();
        *events += 1;
        users.insert(assignment.user_id.as_str());
    }

    ages.into_iter()
        .map(|(cohort_age, (total_events, users))| {
            let distinct_active_users = users.len() as u64;
            CohortAgeEngagement {
                cohort_age,
                total_events,
                distinct_active_users,
                avg_events_per_user: total_events as f64 / distinct_active_users.max(1) as f64,
            }
        })
        .collect()
}

/// Average events per active user for every week with activity
pub fn usage_frequency(table: &EventTable, indexer: &WeekIndexer) -> UsageFrequency {
    let counts = user_week_counts(table, indexer);

    let overall_avg_events_per_user_week = if counts.is_empty() {
        None
    } else {
        Some(counts.values().sum::<u64>() as f64 / counts.len() as f64)
    };

    let mut weeks: BTreeMap<WeekIndex, (u64, u64)> = BTreeMap::new();
    for ((week, _user), events) in &counts {
        let (users, total) = weeks.entry(*week).or_default();
        *users += 1;
        *total += events;
    }

    UsageFrequency {
        weeks: weeks
            .into_iter()
            .map(|(week, (active_users, total))| UsageFrequencyWeek {
                week,
                week_start: indexer.week_start(week),
                active_users,
                avg_events_per_user: total as f64 / active_users as f64,
            })
            .collect(),
        overall_avg_events_per_user_week,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cohort::CohortAssigner;
    use crate::config::MetricsConfig;
    use crate::types::Event;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn baseline() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap()
    }

    fn burst(user: &str, week: i64, count: usize) -> Vec<Event> {
        (0..count)
            .map(|i| {
                Event::new(
                    user,
                    baseline() + Duration::weeks(week) + Duration::minutes(i as i64),
                )
            })
            .collect()
    }

    #[test]
    fn test_range_labels() {
        let bands = MetricsConfig::default().depth_bands;
        let labels: Vec<String> = bands
            .tiers()
            .into_iter()
            .map(|t| range_label(bands.range_of(t).unwrap()))
            .collect();
        assert_eq!(
            labels,
            vec![
                "1 event",
                "2-5 events",
                "6-20 events",
                "21-50 events",
                "51+ events"
            ]
        );
    }

    #[test]
    fn test_depth_boundaries() {
        let config = MetricsConfig::default();
        let mut events = burst("one", 0, 1);
        events.extend(burst("five", 0, 5));
        events.extend(burst("six", 0, 6));
        events.extend(burst("fifty", 0, 50));
        events.extend(burst("many", 0, 51));
        events.extend(burst("two", 0, 2));
        let table = EventTable::from_events(events).unwrap();

        let cells = DepthClassifier::new(&config.depth_bands)
            .classify(&table, &config.week_indexer());
        let tiers: Vec<(EngagementTier, u64)> = cells
            .iter()
            .map(|c| (c.engagement_tier, c.distinct_user_count))
            .collect();
        assert_eq!(
            tiers,
            vec![
                (EngagementTier::Single, 1),
                (EngagementTier::Light, 2),
                (EngagementTier::Moderate, 1),
                (EngagementTier::Heavy, 1),
                (EngagementTier::Intense, 1),
            ]
        );
        assert_eq!(cells[1].range_label, "2-5 events");
    }

    #[test]
    fn test_depth_is_per_week() {
        let config = MetricsConfig::default();
        let mut events = burst("a", 0, 3);
        events.extend(burst("a", 1, 1));
        let table = EventTable::from_events(events).unwrap();
        let cells = DepthClassifier::new(&config.depth_bands)
            .classify(&table, &config.week_indexer());
        assert_eq!(cells.len(), 2);
        assert_eq!((cells[0].week, cells[0].engagement_tier), (0, EngagementTier::Light));
        assert_eq!((cells[1].week, cells[1].engagement_tier), (1, EngagementTier::Single));
    }

    #[test]
    fn test_cohort_age_engagement() {
        let indexer = WeekIndexer::new(baseline());
        let mut events = burst("a", 0, 4);
        events.extend(burst("b", 2, 2));
        events.extend(burst("a", 1, 3));
        let table = EventTable::from_events(events).unwrap();
        let rows = cohort_age_engagement(&CohortAssigner::assign(&table, &indexer));

        assert_eq!(
            rows,
            vec![
                CohortAgeEngagement {
                    cohort_age: 0,
                    total_events: 6,
                    distinct_active_users: 2,
                    avg_events_per_user: 3.0
                },
                CohortAgeEngagement {
                    cohort_age: 1,
                    total_events: 3,
                    distinct_active_users: 1,
                    avg_events_per_user: 3.0
                },
            ]
        );
    }

    #[test]
    fn test_usage_frequency() {
        let indexer = WeekIndexer::new(baseline());
        let mut events = burst("a", 0, 4);
        events.extend(burst("b", 0, 2));
        events.extend(burst("a", 1, 3));
        let table = EventTable::from_events(events).unwrap();
        let usage = usage_frequency(&table, &indexer);

        assert_eq!(usage.weeks.len(), 2);
        assert_eq!(usage.weeks[0].active_users, 2);
        assert_eq!(usage.weeks[0].avg_events_per_user, 3.0);
        assert_eq!(usage.weeks[1].avg_events_per_user, 3.0);
        assert_eq!(usage.overall_avg_events_per_user_week, Some(3.0));
    }

    #[test]
    fn test_empty_table() {
        let config = MetricsConfig::default();
        let indexer = config.week_indexer();
        let table = EventTable::default();
        assert!(DepthClassifier::new(&config.depth_bands)
            .classify(&table, &indexer)
            .is_empty());
        assert!(cohort_age_engagement(&[]).is_empty());
        let usage = usage_frequency(&table, &indexer);
        assert!(usage.weeks.is_empty());
        assert_eq!(usage.overall_avg_events_per_user_week, None);
    }
}
